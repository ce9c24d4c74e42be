//! Divider chain topology.
//!
//! ```text
//! REFin -> x2 doubler -> R counter -> /2 -> PFD -> VCO -> RF divider -> RFout
//!                                            |      |         |
//!                                            |      +--(feedback select)--> N divider
//!                                            |      +----(aux select)-----> AUXout
//!                                            +-> band select clock divider
//!                                            +-> clock divider
//! ```
//!
//! Nodes name their upstream by [`Stage`], never by reference. The VCO has no
//! programmable ratio of its own: it is derived from the N divider, which
//! closes the loop.

use core::fmt;

use crate::constants::BAND_SELECT_DIV_HIGH_MAX;
use crate::errors::Error;

/// One stage of the synthesizer
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    ReferenceInput,
    RefDoubler,
    RCounter,
    RefDivider,
    PhaseFrequencyDetector,
    Vco,
    RfDivider,
    RfOutput,
    AuxOutput,
    BandSelectClock,
    ClockDivider,
    NDivider,
}

impl Stage {
    /// Every stage, upstream before downstream except for the N divider
    pub const ALL: [Stage; 12] = [
        Stage::ReferenceInput,
        Stage::RefDoubler,
        Stage::RCounter,
        Stage::RefDivider,
        Stage::PhaseFrequencyDetector,
        Stage::Vco,
        Stage::RfDivider,
        Stage::RfOutput,
        Stage::AuxOutput,
        Stage::BandSelectClock,
        Stage::ClockDivider,
        Stage::NDivider,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ReferenceInput => "ref_in",
            Stage::RefDoubler => "ref_doubler",
            Stage::RCounter => "r_counter",
            Stage::RefDivider => "ref_div2",
            Stage::PhaseFrequencyDetector => "pfd",
            Stage::Vco => "vco",
            Stage::RfDivider => "rf_divider",
            Stage::RfOutput => "rf_out",
            Stage::AuxOutput => "aux_out",
            Stage::BandSelectClock => "band_select_clock",
            Stage::ClockDivider => "clock_divider",
            Stage::NDivider => "n_divider",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Division (or multiplication) factor of a stage
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ratio {
    Integer(u32),
    /// `int + frac / modulus`
    Fractional { int: u32, frac: u32, modulus: u32 },
}

impl Ratio {
    pub fn value(&self) -> f64 {
        match *self {
            Ratio::Integer(n) => n as f64,
            Ratio::Fractional { int, frac, modulus } => int as f64 + frac as f64 / modulus as f64,
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        match *self {
            Ratio::Integer(_) => true,
            Ratio::Fractional { frac, .. } => frac == 0,
        }
    }

    /// Exact product with an integer factor, used for `N * d_out`
    pub fn scale(self, k: u32) -> Ratio {
        match self {
            Ratio::Integer(n) => Ratio::Integer(n.saturating_mul(k)),
            Ratio::Fractional { int, frac, modulus } => {
                let num = frac as u64 * k as u64;
                let m = modulus.max(1) as u64;
                let int = (int as u64 * k as u64 + num / m).min(u32::MAX as u64) as u32;
                Ratio::Fractional { int, frac: (num % m) as u32, modulus }
            }
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Ratio::Integer(n) => write!(f, "{}", n),
            Ratio::Fractional { int, frac, modulus } => write!(f, "{} + {}/{}", int, frac, modulus),
        }
    }
}

/// Values a stage accepts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RatioRange {
    Contiguous { min: u32, max: u32 },
    Discrete(&'static [u32]),
    /// INT/FRAC/MOD triple, checked by the chain
    Fractional,
}

impl RatioRange {
    pub fn contains(&self, r: u32) -> bool {
        match self {
            RatioRange::Contiguous { min, max } => (*min..=*max).contains(&r),
            RatioRange::Discrete(set) => set.contains(&r),
            RatioRange::Fractional => false,
        }
    }
}

/// How a ratio is stored in its register field
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    /// `code = ratio - 1`, one bit enables
    Offset,
    /// `code = log2(ratio)`
    Log2,
}

impl Encoding {
    #[inline]
    pub fn encode(self, ratio: u32) -> u32 {
        match self {
            Encoding::Identity => ratio,
            Encoding::Offset => ratio.saturating_sub(1),
            Encoding::Log2 => ratio.trailing_zeros(),
        }
    }

    #[inline]
    pub fn decode(self, code: u32) -> u32 {
        match self {
            Encoding::Identity => code,
            Encoding::Offset => code + 1,
            Encoding::Log2 => 1u32.checked_shl(code).unwrap_or(0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Multiplier,
    Divider,
    PassThrough,
    /// Ratio follows from another node
    Derived,
}

/// Where a stage takes its input from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upstream {
    None,
    Fixed(Stage),
    /// VCO or RF divider, per `FEEDBACK_SELECT`
    FeedbackSelect,
    /// VCO or RF divider, per `AUX_OUTPUT_SELECT`
    AuxSelect,
}

/// Static description of one stage
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DividerNode {
    pub stage: Stage,
    pub kind: NodeKind,
    pub upstream: Upstream,
    pub range: RatioRange,
    pub encoding: Encoding,
    /// Register field holding the ratio code
    pub field: Option<&'static str>,
    /// Writes only take effect after register 0 is written again
    pub needs_confirmation: bool,
}

pub const RF_DIVIDERS: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];
static ONE_OR_TWO: [u32; 2] = [1, 2];

const fn fixed(
    stage: Stage,
    kind: NodeKind,
    upstream: Upstream,
    range: RatioRange,
    encoding: Encoding,
    field: Option<&'static str>,
    needs_confirmation: bool,
) -> DividerNode {
    DividerNode { stage, kind, upstream, range, encoding, field, needs_confirmation }
}

const UNITY: RatioRange = RatioRange::Contiguous { min: 1, max: 1 };

/// Indexed like [`Stage::ALL`]
pub static NODES: [DividerNode; 12] = [
    fixed(Stage::ReferenceInput, NodeKind::Source, Upstream::None, UNITY, Encoding::Identity, None, false),
    fixed(
        Stage::RefDoubler,
        NodeKind::Multiplier,
        Upstream::Fixed(Stage::ReferenceInput),
        RatioRange::Discrete(&ONE_OR_TWO),
        Encoding::Offset,
        Some("REF_DOUBLER"),
        true,
    ),
    fixed(
        Stage::RCounter,
        NodeKind::Divider,
        Upstream::Fixed(Stage::RefDoubler),
        RatioRange::Contiguous { min: 1, max: 1023 },
        Encoding::Identity,
        Some("R_COUNTER"),
        true,
    ),
    fixed(
        Stage::RefDivider,
        NodeKind::Divider,
        Upstream::Fixed(Stage::RCounter),
        RatioRange::Discrete(&ONE_OR_TWO),
        Encoding::Offset,
        Some("RDIV2"),
        true,
    ),
    fixed(
        Stage::PhaseFrequencyDetector,
        NodeKind::PassThrough,
        Upstream::Fixed(Stage::RefDivider),
        UNITY,
        Encoding::Identity,
        None,
        false,
    ),
    fixed(
        Stage::Vco,
        NodeKind::Derived,
        Upstream::Fixed(Stage::PhaseFrequencyDetector),
        RatioRange::Fractional,
        Encoding::Identity,
        None,
        false,
    ),
    fixed(
        Stage::RfDivider,
        NodeKind::Divider,
        Upstream::Fixed(Stage::Vco),
        RatioRange::Discrete(&RF_DIVIDERS),
        Encoding::Log2,
        Some("RF_DIVIDER_SELECT"),
        true,
    ),
    fixed(
        Stage::RfOutput,
        NodeKind::PassThrough,
        Upstream::Fixed(Stage::RfDivider),
        UNITY,
        Encoding::Identity,
        None,
        false,
    ),
    fixed(Stage::AuxOutput, NodeKind::PassThrough, Upstream::AuxSelect, UNITY, Encoding::Identity, None, false),
    fixed(
        Stage::BandSelectClock,
        NodeKind::Divider,
        Upstream::Fixed(Stage::PhaseFrequencyDetector),
        RatioRange::Contiguous { min: 1, max: BAND_SELECT_DIV_HIGH_MAX },
        Encoding::Identity,
        Some("BAND_SELECT_CLOCK_DIV"),
        false,
    ),
    fixed(
        Stage::ClockDivider,
        NodeKind::Divider,
        Upstream::Fixed(Stage::PhaseFrequencyDetector),
        RatioRange::Contiguous { min: 1, max: 4095 },
        Encoding::Identity,
        Some("CLK_DIV"),
        false,
    ),
    fixed(
        Stage::NDivider,
        NodeKind::Divider,
        Upstream::FeedbackSelect,
        RatioRange::Fractional,
        Encoding::Identity,
        None,
        true,
    ),
];

/// Node describing `stage`
pub fn node(stage: Stage) -> &'static DividerNode {
    &NODES[stage as usize]
}

impl DividerNode {
    /// Checks a ratio against this node's range and returns its field code.
    pub fn encode(&self, ratio: u32) -> Result<u32, Error> {
        if self.range.contains(ratio) && self.field.is_some() {
            Ok(self.encoding.encode(ratio))
        } else {
            Err(Error::InvalidFieldValue { field: self.stage.name(), value: ratio as u64 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_stage_discriminants() {
        for s in Stage::ALL {
            assert_eq!(node(s).stage, s);
        }
    }

    #[test]
    fn rf_divider_is_log2_coded() {
        let n = node(Stage::RfDivider);
        assert_eq!(n.encode(1).unwrap(), 0);
        assert_eq!(n.encode(64).unwrap(), 6);
        assert_eq!(n.encoding.decode(3), 8);
        assert!(n.encode(3).is_err());
    }

    #[test]
    fn one_bit_enables() {
        let n = node(Stage::RefDoubler);
        assert_eq!(n.encode(2).unwrap(), 1);
        assert_eq!(n.encode(1).unwrap(), 0);
        assert_eq!(
            n.encode(4),
            Err(Error::InvalidFieldValue { field: "ref_doubler", value: 4 })
        );
    }

    #[test]
    fn derived_stages_cannot_be_set() {
        assert!(node(Stage::Vco).encode(1).is_err());
        assert!(node(Stage::RCounter).encode(0).is_err());
        assert!(node(Stage::RCounter).encode(1023).is_ok());
    }

    #[test]
    fn ratio_values() {
        let r = Ratio::Fractional { int: 100, frac: 1, modulus: 4 };
        assert_eq!(r.value(), 100.25);
        assert!(!r.is_integer());
        assert!(Ratio::Fractional { int: 100, frac: 0, modulus: 2 }.is_integer());
        assert_eq!(r.scale(8), Ratio::Fractional { int: 802, frac: 0, modulus: 4 });
        assert_eq!(r.scale(2), Ratio::Fractional { int: 200, frac: 2, modulus: 4 });
    }
}
