mod common;

use adf435x_synth::{
    config::Config,
    device::Adf4351,
    divider::{Ratio, Stage},
    errors::{Error, Violation},
    fields::{ChargePumpCurrent, FeedbackSelect, Muxout},
    planner::{IntegerNMatch, SearchSpace},
};
use common::{Events, RecordingBus};

fn device() -> Adf4351<RecordingBus, Events> {
    Adf4351::with_observer(RecordingBus::default(), Config::default(), Events::default()).unwrap()
}

#[test]
fn construction_writes_defaults_then_tunes() {
    let mut dev = device();
    assert_eq!(dev.bus().addresses(), [5, 4, 3, 2, 1, 0, 5, 4, 3, 2, 1, 0]);
    assert_eq!(dev.current_frequency().unwrap(), 1e9);
    assert!(dev.is_write_enabled());
    assert_eq!(dev.observer().written, 12);
    assert_eq!(dev.observer().plans.len(), 1);
}

#[test]
fn tune_to_1500mhz_in_integer_mode() {
    let mut dev = device();
    dev.bus().clear();

    let plan = dev.set_output_frequency(1.5e9, 100e3, None).unwrap();
    assert_eq!(plan.output_divider, 2);
    assert_eq!(plan.vco_hz, 3e9);
    assert_eq!((plan.int, plan.frac, plan.modulus), (120, 0, 2));
    assert!(plan.integer_mode);

    assert_eq!(dev.bus().addresses(), [5, 4, 3, 2, 1, 0]);
    assert_eq!(dev.bus().words[5], 120 << 15);

    let map = dev.chain().map();
    assert_eq!(map.field("LDF").unwrap(), 1);
    assert_eq!(map.field("LDP").unwrap(), 1);
    assert_eq!(map.field("ABP").unwrap(), 1);
    assert_eq!(map.field("CHARGE_CANCEL").unwrap(), 1);
    assert_eq!(map.field("RF_DIVIDER_SELECT").unwrap(), 1);
    assert_eq!(map.field("PRESCALER").unwrap(), 0);
    assert_eq!(map.pending(), 0);
    assert_eq!(dev.current_frequency().unwrap(), 1.5e9);
}

#[test]
fn unreachable_target_leaves_everything_alone() {
    let mut dev = device();
    let before = dev.chain().clone();
    let written = dev.bus().words.len();

    let err = dev.set_output_frequency(5e9, 100e3, None).unwrap_err();
    assert_eq!(
        err,
        Error::PlanningExhausted {
            target_hz: 5e9,
            last_output_divider: 64,
            last_violation: Violation::VcoOutOfRange { freq_hz: 320e9 },
        }
    );
    assert_eq!(err.violation(), Some(Violation::VcoOutOfRange { freq_hz: 320e9 }));
    assert_eq!(dev.chain(), &before);
    assert_eq!(dev.bus().words.len(), written);
    assert!(dev.is_write_enabled());
}

#[test]
fn divided_feedback() {
    let config = Config::default()
        .with_feedback_select(FeedbackSelect::Divided)
        .with_output_hz(1.5e9);
    let mut dev = Adf4351::with_observer(RecordingBus::default(), config, Events::default()).unwrap();
    assert_eq!(dev.chain().int(), 60);
    assert_eq!(dev.chain().vco_frequency().unwrap(), 3e9);

    // 1 GHz needs the 8/9 prescaler at /4, and N = 40 is too small for it
    let err = dev.set_frequency(1e9).unwrap_err();
    assert!(matches!(err, Error::PlanningExhausted { .. }));
    assert!(dev
        .observer()
        .rejected
        .contains(&(4, Violation::IntBelowMinimum { int: 40, min: 75 })));
}

#[test]
fn phase_word_at_or_above_mod_is_rejected() {
    let mut dev = device();
    let modulus = dev.chain().modulus();
    let written = dev.bus().words.len();
    assert_eq!(
        dev.set_phase_word(modulus as u16),
        Err(Error::InvalidFieldValue { field: "PHASE", value: modulus as u64 })
    );
    assert_eq!(dev.bus().words.len(), written);
}

#[test]
fn phase_change_is_confirmed_through_r0() {
    let mut dev = device();
    let plan = dev.set_frequency(1_000_100_000.0).unwrap();
    assert_eq!(plan.modulus, 250);
    dev.bus().clear();
    let confirmed = dev.observer().confirmed;

    let word = dev.set_phase(90.0).unwrap();
    assert_eq!(word, 62);
    assert_eq!(dev.bus().addresses(), [1, 0]);
    assert_eq!(dev.observer().confirmed, confirmed + 1);
    assert!((dev.current_phase() - 90.0).abs() < dev.phase_resolution());

    assert_eq!(dev.set_phase(-270.0).unwrap(), 62);
}

#[test]
fn output_enable_and_disable() {
    let mut dev = device();
    dev.bus().clear();

    dev.enable_output(false).unwrap();
    assert_eq!(dev.bus().addresses(), [2, 0]);
    assert_eq!(dev.chain().map().field("POWER_DOWN").unwrap(), 1);
    assert_eq!(dev.chain().map().field("COUNTER_RESET").unwrap(), 1);
    dev.bus().clear();

    dev.enable_output(true).unwrap();
    assert_eq!(dev.bus().addresses(), [2, 0]);
    let map = dev.chain().map();
    assert_eq!(map.field("POWER_DOWN").unwrap(), 0);
    assert_eq!(map.field("COUNTER_RESET").unwrap(), 0);
    assert_eq!(map.field("CP_THREE_STATE").unwrap(), 0);
    assert_eq!(map.field("VCO_POWER_DOWN").unwrap(), 0);
    assert_eq!(map.field("RF_OUTPUT_ENABLE").unwrap(), 1);
}

#[test]
fn reset_restores_configuration() {
    let mut dev = device();
    dev.set_frequency(2.5e9).unwrap();
    dev.set_muxout(Muxout::DigitalLockDetect).unwrap();
    dev.bus().clear();

    dev.reset().unwrap();
    assert_eq!(dev.bus().addresses(), [5, 4, 3, 2, 1, 0, 5, 4, 3, 2, 1, 0]);
    assert_eq!(dev.chain().map().field("MUXOUT").unwrap(), 0);
    assert_eq!(dev.current_frequency().unwrap(), 1e9);
    assert_eq!(dev.chain(), device().chain());
}

#[test]
fn muxout_n_divider_blocks_band_select() {
    let mut dev = device();
    let before = dev.chain().clone();
    assert_eq!(
        dev.set_muxout(Muxout::NDividerOutput),
        Err(Error::ConstraintViolation(Violation::MuxoutBlocksBandSelect))
    );
    assert_eq!(dev.chain(), &before);

    dev.set_band_select_enabled(false).unwrap();
    dev.set_muxout(Muxout::NDividerOutput).unwrap();
}

#[test]
fn fractional_step() {
    let mut dev = device();
    dev.set_frequency(1_000_100_000.0).unwrap();
    // MOD 250 gives 100 kHz VCO steps, 25 kHz after the /4 RF divider
    assert_eq!(dev.frequency_resolution().unwrap(), 25e3);
    let f = dev.step(1).unwrap();
    assert!((f - 1_000_125_000.0).abs() < 1e-3);
    assert_eq!((dev.chain().int(), dev.chain().frac()), (160, 5));
}

#[test]
fn modulus_keeps_requested_channel_step() {
    let mut dev = device();
    let plan = dev.set_output_frequency(1_000_500_000.0, 100e3, None).unwrap();
    assert_eq!(plan.output_divider, 4);
    assert_eq!((plan.int, plan.frac, plan.modulus), (160, 20, 250));
    assert_eq!(dev.chain().modulus(), 250);
    assert_eq!(dev.frequency_resolution().unwrap(), 25e3);

    let f = dev.step(4).unwrap();
    assert!((f - 1_000_600_000.0).abs() < 1e-3);
}

#[test]
fn bad_channel_resolution_is_rejected() {
    let mut dev = device();
    let before = dev.chain().clone();
    dev.bus().clear();

    for res in [0.0, -100e3, f64::NAN] {
        assert!(matches!(
            dev.set_output_frequency(1.5e9, res, None),
            Err(Error::InvalidFieldValue { field: "channel_resolution", .. })
        ));
        assert!(matches!(
            dev.set_channel_resolution(res),
            Err(Error::InvalidFieldValue { field: "channel_resolution", .. })
        ));
    }
    assert_eq!(dev.chain(), &before);
    assert!(dev.bus().words.is_empty());
    assert!(dev.is_write_enabled());
    assert_eq!(dev.config().channel_resolution_hz, 100e3);
}

#[test]
fn double_buffered_edits_end_with_r0() {
    let mut dev = device();
    dev.set_cycle_slip_reduction(false).unwrap();
    dev.bus().clear();
    let confirmed = dev.observer().confirmed;
    let r0 = dev.chain().map().values()[0];

    // CP current only lives in R2; R0 goes out again unchanged to latch it
    dev.set_charge_pump_current(ChargePumpCurrent(7)).unwrap();
    assert_eq!(dev.bus().addresses(), [2, 0]);
    assert_eq!(dev.bus().words[1], r0);
    assert_eq!(dev.observer().confirmed, confirmed + 1);
    assert_eq!(dev.chain().map().field("CP_CURRENT").unwrap(), 7);

    // R counter and doubler change together with the N divider
    let space = SearchSpace { doubler: Some(false), ref_divider: Some(true), ..Default::default() };
    let hit = dev
        .find_integer_n_dividers(1e9, &space)
        .unwrap()
        .find(|m| m.r_counter == 2)
        .unwrap();
    assert_eq!((hit.output_divider, hit.n), (4, 640));
    dev.bus().clear();

    dev.set_dividers(&hit).unwrap();
    let words = dev.bus().words.clone();
    assert_eq!(dev.bus().addresses().last(), Some(&0));
    let map = dev.chain().map();
    assert_eq!(map.field("R_COUNTER").unwrap(), 2);
    assert_eq!(map.field("REF_DOUBLER").unwrap(), 0);
    assert_eq!(words[3], map.values()[2]);
    assert_eq!(words[5], map.values()[0]);
}

#[test]
fn integer_n_search_is_repeatable() {
    let mut dev = device();
    let before = dev.chain().clone();
    let written = dev.bus().words.len();
    let key = |m: &IntegerNMatch| (m.doubler, m.ref_divider, m.r_counter, m.output_divider);

    let space = SearchSpace::default();
    let first: Vec<IntegerNMatch> = dev.find_integer_n_dividers(1.5e9, &space).unwrap().collect();
    let second: Vec<IntegerNMatch> = dev.find_integer_n_dividers(1.5e9, &space).unwrap().collect();

    assert!(first.len() > 1);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| key(&w[0]) < key(&w[1])));
    assert_eq!(dev.chain(), &before);
    assert_eq!(dev.bus().words.len(), written);
}

#[test]
fn integer_n_search_then_program() {
    let mut dev = device();
    let space = SearchSpace { doubler: Some(false), ref_divider: Some(true), ..Default::default() };
    let hit = dev.find_integer_n_dividers(1.5e9, &space).unwrap().next().unwrap();
    assert_eq!((hit.r_counter, hit.output_divider, hit.n), (1, 2, 240));
    assert_eq!(hit.f_pfd, 12.5e6);

    dev.bus().clear();
    assert_eq!(dev.set_dividers(&hit).unwrap(), 1.5e9);
    assert_eq!(dev.bus().addresses(), [5, 4, 3, 2, 1, 0]);
    assert_eq!(dev.chain().f_pfd().unwrap(), 12.5e6);
}

#[test]
fn reports() {
    let dev = device();
    let dividers = dev.current_dividers().unwrap();
    assert_eq!(dividers.get("rf_divider"), Some(&Ratio::Integer(4)));
    assert_eq!(
        dividers.get("n_divider"),
        Some(&Ratio::Fractional { int: 160, frac: 0, modulus: 2 })
    );

    let (stages, controls) = dev.current_configuration().unwrap();
    assert_eq!(stages.len(), 12);
    let vco = stages.iter().find(|s| s.stage == Stage::Vco).unwrap();
    assert_eq!(vco.frequency_hz, 4e9);
    assert!(vco.is_integer);
    assert!(controls.integer_mode);
}

#[test]
fn channel_resolution_change_retunes() {
    let mut dev = device();
    let plan = dev.set_channel_resolution(1e6).unwrap();
    assert_eq!(plan.achieved_hz, 1e9);
    assert_eq!(dev.config().channel_resolution_hz, 1e6);
    assert!(dev.set_channel_resolution(0.0).is_err());
}

#[test]
fn bus_errors_propagate() {
    let bus = RecordingBus { fail_after: Some(6), ..Default::default() };
    assert!(matches!(Adf4351::new(bus, Config::default()), Err(Error::Spi)));
}
