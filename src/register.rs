//! Packed bit-field registers.
//!
//! A [`Register`] is a 32 bit word split into named [`FieldSpec`]s. Fields are
//! addressed either by name (`set("INT", 120)`) or through the typed view
//! generated by the [`BitField`] macros in [`crate::fields`]; both touch the
//! same bits.

use core::fmt;

use crate::errors::Error;

/// Number of control registers on the chip.
pub const REGISTER_COUNT: usize = 6;

/// Register word width, bits.
pub const REGISTER_BITS: u32 = 32;

/// Layout of one field inside a register word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Offset of the lowest bit
    pub offset: u8,
    /// Number of bits
    pub width: u8,
    /// Reserved bits and address tags, writes are ignored
    pub read_only: bool,
    /// The chip latches this field only after register 0 is written again
    pub double_buffered: bool,
}

impl FieldSpec {
    /// Writable field
    pub const fn rw(name: &'static str, offset: u8, width: u8) -> Self {
        FieldSpec { name, offset, width, read_only: false, double_buffered: false }
    }

    /// Reserved field, keeps the register default forever
    pub const fn ro(name: &'static str, offset: u8, width: u8) -> Self {
        FieldSpec { name, offset, width, read_only: true, double_buffered: false }
    }

    /// Layout of a typed field
    pub const fn of<F, R>() -> Self
    where
        F: BitField<R>,
        R: RegisterIndex,
    {
        FieldSpec {
            name: F::NAME,
            offset: F::OFFSET,
            width: F::BITS,
            read_only: false,
            double_buffered: F::DOUBLE_BUFFERED,
        }
    }

    /// Unshifted mask, `2^width - 1`
    #[inline]
    pub const fn mask(&self) -> u32 {
        bit_mask(self.width)
    }

    /// Mask in register position
    #[inline]
    pub const fn shifted_mask(&self) -> u32 {
        self.mask() << self.offset
    }

    #[inline]
    pub const fn extract(&self, word: u32) -> u32 {
        (word >> self.offset) & self.mask()
    }

    /// Replaces this field's bits in `word`, nothing else changes
    #[inline]
    pub const fn insert(&self, word: u32, value: u32) -> u32 {
        (word & !self.shifted_mask()) | ((value & self.mask()) << self.offset)
    }
}

#[inline]
const fn bit_mask(width: u8) -> u32 {
    if width as u32 >= REGISTER_BITS {
        u32::MAX
    } else {
        !(u32::MAX << width)
    }
}

/// One control register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Register {
    name: &'static str,
    address: u8,
    fields: &'static [FieldSpec],
    default_value: u32,
    word: u32,
}

impl Register {
    /// New register holding its default value
    pub const fn new(
        name: &'static str,
        address: u8,
        fields: &'static [FieldSpec],
        default_value: u32,
    ) -> Self {
        Register { name, address, fields, default_value, word: default_value }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[inline]
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    #[inline]
    pub fn default_value(&self) -> u32 {
        self.default_value
    }

    /// Sum of all field widths
    pub fn n_bits(&self) -> u32 {
        self.fields.iter().map(|f| f.width as u32).sum()
    }

    /// Serialized size, `ceil(n_bits / 8)`
    pub fn n_bytes(&self) -> usize {
        ((self.n_bits() + 7) / 8) as usize
    }

    /// Packed word, `Σ value << offset`
    #[inline]
    pub fn value(&self) -> u32 {
        self.word
    }

    /// Device format, most significant byte first
    #[inline]
    pub fn bytes(&self) -> [u8; 4] {
        self.word.to_be_bytes()
    }

    pub fn field_spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Value of a named field
    pub fn get(&self, name: &str) -> Result<u32, Error> {
        let spec = self.field_spec(name).ok_or(Error::UnknownField)?;
        Ok(spec.extract(self.word))
    }

    /// Stores `value` masked to the field width and returns the bytes to transmit.
    /// Read-only fields are left untouched.
    pub fn set(&mut self, name: &str, value: u32) -> Result<[u8; 4], Error> {
        let spec = self.field_spec(name).ok_or(Error::UnknownField)?;
        self.write(spec, value);
        Ok(self.bytes())
    }

    /// Returns true if the word changed.
    pub(crate) fn write(&mut self, spec: &FieldSpec, value: u32) -> bool {
        if spec.read_only {
            return false;
        }
        let word = spec.insert(self.word, value);
        let changed = word != self.word;
        self.word = word;
        changed
    }

    /// Decomposes an externally supplied word into the writable fields.
    pub fn load(&mut self, raw: u32) {
        for f in self.fields {
            self.write(f, f.extract(raw));
        }
    }

    /// Restores the default value and returns the bytes to transmit.
    pub fn reset(&mut self) -> [u8; 4] {
        self.word = self.default_value;
        self.bytes()
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<< {} >> {:#010x} {:#034b}", self.name, self.word, self.word)?;
        for spec in self.fields {
            writeln!(f, "  [ {} ] {}", spec.name, spec.extract(self.word))?;
        }
        Ok(())
    }
}

/// All control registers of one device.
///
/// Registers are kept sorted by address, so `registers()[i].address() == i`.
/// Writes are tracked: every register whose word changed is marked pending,
/// and a change to a double buffered field additionally requests a
/// confirmation write of register 0 (see [`crate::commit`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    name: &'static str,
    registers: [Register; REGISTER_COUNT],
    pending: u8,
    confirm: bool,
}

impl RegisterMap {
    /// Checks that names are unique and addresses are `0..REGISTER_COUNT`.
    pub fn new(name: &'static str, mut registers: [Register; REGISTER_COUNT]) -> Result<Self, Error> {
        registers.sort_unstable_by_key(|r| r.address);
        for (i, r) in registers.iter().enumerate() {
            if registers[..i].iter().any(|o| o.name == r.name || o.address == r.address) {
                return Err(Error::DuplicateRegister(r.name));
            }
            if r.address as usize != i {
                return Err(Error::UnknownRegister);
            }
        }
        Ok(RegisterMap { name, registers, pending: 0, confirm: false })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn registers(&self) -> &[Register; REGISTER_COUNT] {
        &self.registers
    }

    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Mutable access by name. Change tracking cannot see through the
    /// reference, so the register is marked pending along with a confirmation.
    pub fn register_mut(&mut self, name: &str) -> Option<&mut Register> {
        let i = self.registers.iter().position(|r| r.name == name)?;
        self.pending |= 1 << i;
        self.confirm = true;
        Some(&mut self.registers[i])
    }

    /// Register by hardware address
    pub fn at(&self, address: u8) -> Option<&Register> {
        self.registers.get(address as usize)
    }

    /// Packed words, by address
    pub fn values(&self) -> [u32; REGISTER_COUNT] {
        let mut words = [0; REGISTER_COUNT];
        for (w, r) in words.iter_mut().zip(self.registers.iter()) {
            *w = r.value();
        }
        words
    }

    fn locate(&self, name: &str) -> Option<(usize, &'static FieldSpec)> {
        self.registers
            .iter()
            .enumerate()
            .find_map(|(i, r)| r.field_spec(name).map(|s| (i, s)))
    }

    /// Value of a named field anywhere in the map
    pub fn field(&self, name: &str) -> Result<u32, Error> {
        let (i, spec) = self.locate(name).ok_or(Error::UnknownField)?;
        Ok(spec.extract(self.registers[i].word))
    }

    /// Writes a named field, returns the owning register's bytes.
    pub fn set_field(&mut self, name: &str, value: u32) -> Result<[u8; 4], Error> {
        let (i, spec) = self.locate(name).ok_or(Error::UnknownField)?;
        self.write(i, spec, value);
        Ok(self.registers[i].bytes())
    }

    fn write(&mut self, i: usize, spec: &FieldSpec, value: u32) {
        if self.registers[i].write(spec, value) {
            self.pending |= 1 << i;
            self.confirm |= spec.double_buffered;
        }
    }

    /// Typed field read.
    ///
    /// Fails only for encodings the chip reserves, which can show up after
    /// [`RegisterMap::load`].
    #[inline]
    pub fn get<F, R>(&self) -> Result<F, Error>
    where
        F: BitField<R>,
        R: RegisterIndex,
    {
        let bits = FieldSpec::of::<F, R>().extract(self.registers[R::ADDRESS as usize].word);
        F::from_bits(bits).ok_or(Error::InvalidFieldValue { field: F::NAME, value: bits as u64 })
    }

    /// Typed field write
    #[inline]
    pub fn set<F, R>(&mut self, f: F) -> &mut Self
    where
        F: BitField<R>,
        R: RegisterIndex,
    {
        let spec = FieldSpec::of::<F, R>();
        self.write(R::ADDRESS as usize, &spec, f.bits());
        self
    }

    /// Restores every register to its default.
    pub fn reset(&mut self) {
        for (i, r) in self.registers.iter_mut().enumerate() {
            if r.word != r.default_value {
                self.pending |= 1 << i;
            }
            r.reset();
        }
        self.confirm = true;
    }

    /// Loads read-back words, by address.
    pub fn load(&mut self, words: &[u32; REGISTER_COUNT]) {
        for (i, (r, w)) in self.registers.iter_mut().zip(words.iter()).enumerate() {
            let before = r.word;
            r.load(*w);
            if r.word != before {
                self.pending |= 1 << i;
            }
        }
    }

    /// Registers changed since the last commit, bit `i` for address `i`.
    #[inline]
    pub fn pending(&self) -> u8 {
        self.pending
    }

    /// A double buffered field changed since the last commit.
    #[inline]
    pub fn confirmation_pending(&self) -> bool {
        self.confirm
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = 0;
        self.confirm = false;
    }
}

impl fmt::Display for RegisterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for r in self.registers.iter() {
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

/// Register number marker
pub trait RegisterIndex {
    const ADDRESS: u8;
}

/// Typed view of one field of register `R`.
pub trait BitField<R>: Sized + Copy
where
    R: RegisterIndex,
{
    /// Field name in the register layout
    const NAME: &'static str;

    /// Offset from 0
    const OFFSET: u8;

    /// Number of bits in the bit field
    const BITS: u8;

    const DOUBLE_BUFFERED: bool = false;

    /// `None` for encodings the chip reserves
    fn from_bits(bits: u32) -> Option<Self>;

    fn bits(self) -> u32;

    #[inline]
    fn mask() -> u32 {
        bit_mask(Self::BITS)
    }
}

/// Register number marker types
macro_rules! gen_register_marker {
    ($r:ident, $n:tt) => {
        #[doc = concat!("Register ", stringify!($n), " marker")]
        #[derive(Debug, Copy, Clone)]
        pub struct $r;

        impl $crate::register::RegisterIndex for $r {
            const ADDRESS: u8 = $n;
        }
    };
}

macro_rules! gen_double_buffered {
    () => { false };
    (double_buffered) => { true };
}

/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
    ($r:ty, $name:literal, $n:ident, $nb:tt, $off:tt, $($db:ident)?) => {
        impl $crate::register::BitField<$r> for $n {
            const NAME: &'static str = $name;
            const OFFSET: u8 = $off;
            const BITS: u8 = $nb;
            const DOUBLE_BUFFERED: bool = gen_double_buffered!($($db)?);

            #[inline]
            fn from_bits(bits: u32) -> Option<Self> {
                $n::decode(bits)
            }

            #[inline]
            fn bits(self) -> u32 {
                self.encode()
            }
        }
    };
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
    ($(#[$meta:meta])* $r:ty, $name:literal, $n:ident, $v:ty, $nb:tt, $off:tt $(, $db:ident)?) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub struct $n(pub $v);

        impl $n {
            #[inline]
            fn decode(bits: u32) -> Option<Self> {
                Some($n(bits as $v))
            }

            #[inline]
            fn encode(self) -> u32 {
                self.0 as u32
            }
        }

        gen_bitfield_impl!($r, $name, $n, $nb, $off, $($db)?);
    };
}

/// Enumerated bitfield boilerplate, codes the chip reserves decode to `None`
macro_rules! gen_bitfield_enum {
    ($(#[$meta:meta])* $r:ty, $name:literal, $n:ident, $nb:tt, $off:tt $(, $db:ident)?
        { $($(#[$vmeta:meta])* $var:ident = $code:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub enum $n {
            $($(#[$vmeta])* $var = $code),+
        }

        impl $n {
            #[inline]
            fn decode(bits: u32) -> Option<Self> {
                $(if bits == $code { return Some($n::$var); })+
                None
            }

            #[inline]
            fn encode(self) -> u32 {
                self as u32
            }
        }

        gen_bitfield_impl!($r, $name, $n, $nb, $off, $($db)?);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: [FieldSpec; 4] = [
        FieldSpec::ro("RESERVED", 24, 8),
        FieldSpec::rw("HIGH", 12, 12),
        FieldSpec::rw("LOW", 3, 9),
        FieldSpec::ro("CONTROL", 0, 3),
    ];

    fn reg() -> Register {
        Register::new("TEST", 2, &FIELDS, 0x5A00_0002)
    }

    #[test]
    fn widths_fill_the_word() {
        let r = reg();
        assert_eq!(r.n_bits(), 32);
        assert_eq!(r.n_bytes(), 4);
    }

    #[test]
    fn set_masks_and_keeps_neighbours() {
        let mut r = reg();
        r.set("LOW", 0x1FF).unwrap();
        let bytes = r.set("HIGH", 0xFFFF).unwrap();
        assert_eq!(r.get("HIGH").unwrap(), 0xFFF);
        assert_eq!(r.get("LOW").unwrap(), 0x1FF);
        assert_eq!(r.get("RESERVED").unwrap(), 0x5A);
        assert_eq!(r.get("CONTROL").unwrap(), 2);
        assert_eq!(bytes, r.value().to_be_bytes());
        assert_eq!(r.value(), 0x5AFF_FFFA);
    }

    #[test]
    fn read_only_writes_are_ignored() {
        let mut r = reg();
        r.set("RESERVED", 0).unwrap();
        r.set("CONTROL", 7).unwrap();
        assert_eq!(r.value(), 0x5A00_0002);
    }

    #[test]
    fn unknown_field() {
        let mut r = reg();
        assert_eq!(r.set("NOPE", 1), Err(Error::UnknownField));
        assert_eq!(r.get("NOPE"), Err(Error::UnknownField));
    }

    #[test]
    fn load_skips_reserved_bits_and_reset_restores() {
        let mut r = reg();
        r.load(0xFFFF_FFFF);
        assert_eq!(r.value(), 0x5AFF_FFFA);
        assert_eq!(r.reset(), [0x5A, 0x00, 0x00, 0x02]);
        assert_eq!(r.value(), r.default_value());
    }

    #[test]
    fn full_width_mask() {
        let f = FieldSpec::rw("ALL", 0, 32);
        assert_eq!(f.mask(), u32::MAX);
        assert_eq!(f.insert(0, 0xDEAD_BEEF), 0xDEAD_BEEF);
    }

    #[test]
    fn map_rejects_duplicates_and_gaps() {
        let regs = |names: [&'static str; 6], addrs: [u8; 6]| {
            [0, 1, 2, 3, 4, 5].map(|i| Register::new(names[i], addrs[i], &FIELDS, addrs[i] as u32))
        };
        let names = ["A", "B", "C", "D", "E", "F"];

        let map = RegisterMap::new("OK", regs(names, [5, 4, 3, 2, 1, 0])).unwrap();
        assert_eq!(map.at(0).unwrap().name(), "F");

        assert_eq!(
            RegisterMap::new("NAMES", regs(["A", "B", "C", "A", "E", "F"], [0, 1, 2, 3, 4, 5])),
            Err(Error::DuplicateRegister("A"))
        );
        assert!(matches!(
            RegisterMap::new("ADDRESSES", regs(names, [0, 1, 2, 2, 4, 5])),
            Err(Error::DuplicateRegister("C" | "D"))
        ));
        assert_eq!(RegisterMap::new("GAP", regs(names, [0, 1, 2, 3, 4, 6])), Err(Error::UnknownRegister));
    }
}
