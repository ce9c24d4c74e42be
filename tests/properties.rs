use adf435x_synth::{
    chain::DividerChain,
    config::Config,
    constants::{VCO_FREQ_MAX, VCO_FREQ_MIN},
    errors::Error,
    fields::DEFAULT_WORDS,
    planner::{FrequencyPlanner, Request},
    register::RegisterMap,
};
use proptest::prelude::*;

fn writable_fields(map: &RegisterMap) -> Vec<(&'static str, u32)> {
    map.registers()
        .iter()
        .flat_map(|r| r.fields().iter())
        .filter(|f| !f.read_only)
        .map(|f| (f.name, f.mask()))
        .collect()
}

proptest! {
    #[test]
    fn field_write_masks_value(pick in any::<prop::sample::Index>(), value in any::<u32>()) {
        let mut map = RegisterMap::adf4351().unwrap();
        let fields = writable_fields(&map);
        let (name, mask) = fields[pick.index(fields.len())];
        let before = map.values();

        map.set_field(name, value).unwrap();
        prop_assert_eq!(map.field(name).unwrap(), value & mask);

        // nothing outside the field moved
        for other in writable_fields(&map) {
            if other.0 != name {
                let r = map.registers().iter().find(|r| r.field_spec(other.0).is_some()).unwrap();
                let spec = r.field_spec(other.0).unwrap();
                let idx = r.address() as usize;
                prop_assert_eq!(spec.extract(map.values()[idx]), spec.extract(before[idx]));
            }
        }
    }

    #[test]
    fn read_only_fields_keep_defaults(words in any::<[u32; 6]>()) {
        let mut map = RegisterMap::adf4351().unwrap();
        map.load(&words);
        for r in map.registers() {
            for f in r.fields().iter().filter(|f| f.read_only) {
                prop_assert_eq!(f.extract(r.value()), f.extract(r.default_value()));
                prop_assert_eq!(map.clone().register_mut(r.name()).unwrap().set(f.name, !0).unwrap(), r.bytes());
            }
        }
    }

    #[test]
    fn reset_then_load_defaults_is_idempotent(words in any::<[u32; 6]>()) {
        let mut map = RegisterMap::adf4351().unwrap();
        map.load(&words);
        map.reset();
        prop_assert_eq!(map.values(), DEFAULT_WORDS);
        let packed = map.values();
        map.load(&packed);
        prop_assert_eq!(map.values(), packed);
        map.reset();
        prop_assert_eq!(map.values(), packed);
    }

    #[test]
    fn plans_hit_channel_grid(channel in 344u64..=44_000) {
        let target = channel as f64 * 100e3;
        let chain = DividerChain::new(&Config::default()).unwrap();
        let (planned, plan) = FrequencyPlanner::new(&mut ())
            .plan(&chain, &Request::new(target, 100e3))
            .unwrap();

        prop_assert!((plan.achieved_hz - target).abs() <= chain.tolerance_hz());
        let f_pfd = planned.f_pfd().unwrap();
        let rebuilt = f_pfd * (plan.int as f64 + plan.frac as f64 / plan.modulus as f64) / plan.output_divider as f64;
        prop_assert!((rebuilt - plan.achieved_hz).abs() <= 1e-6 * target);

        // MOD follows the channel step, 25 MHz / 100 kHz, unless N is whole
        prop_assert!(plan.frac < plan.modulus);
        prop_assert_eq!(plan.modulus, if plan.frac == 0 { 2 } else { 250 });
        prop_assert!(plan.vco_hz >= VCO_FREQ_MIN && plan.vco_hz <= VCO_FREQ_MAX);
        prop_assert_eq!(plan.integer_mode, plan.frac == 0);
        prop_assert_eq!(planned.map().field("LDF").unwrap(), plan.integer_mode as u32);
        prop_assert_eq!(planned.map().field("ABP").unwrap(), plan.integer_mode as u32);

        // smallest divider that puts the VCO in range
        let smallest = [1u32, 2, 4, 8, 16, 32, 64]
            .into_iter()
            .find(|d| target * *d as f64 >= VCO_FREQ_MIN)
            .unwrap();
        prop_assert_eq!(plan.output_divider, smallest);
    }

    #[test]
    fn out_of_range_targets_are_exhausted(target in 4.5e9f64..1e11) {
        let chain = DividerChain::new(&Config::default()).unwrap();
        let r = FrequencyPlanner::new(&mut ()).plan(&chain, &Request::new(target, 100e3));
        let is_exhausted = matches!(r, Err(Error::PlanningExhausted { .. }));
        prop_assert!(is_exhausted);
    }
}
