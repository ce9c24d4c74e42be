//! Frequency planning.
//!
//! The planner tries RF divider candidates from /1 upwards. Each candidate is
//! worked out on its own copy of the chain, so a rejected candidate leaves
//! nothing behind:
//!
//! 1. `f_vco = target * d_out` must be inside the VCO range;
//! 2. prescaler from `f_vco`, `N` from the feedback path;
//! 3. `MOD` from the channel step, `INT`/`FRAC` from `N`, `MOD` = 2 when `FRAC` is 0;
//! 4. band select clock divider refreshed;
//! 5. whole chain validated and the output compared with the target.

use core::slice;

use libm::{fabs, floor, round};

use crate::chain::{modulus_for, saturate_u32, BandSelect, DividerChain};
use crate::constants::{MOD_MIN, R_COUNTER_MAX, VCO_FREQ_MAX, VCO_FREQ_MIN};
use crate::divider::{Stage, RF_DIVIDERS};
use crate::errors::{Error, Violation};
use crate::fields::{FeedbackSelect, Prescaler, R4};
use crate::observer::Observer;

/// RF divider candidates, in the order they are tried
pub const OUTPUT_DIVIDERS: [u32; 7] = RF_DIVIDERS;

/// What to tune to
///
/// `channel_resolution_hz` is f RES, the VCO channel spacing; it must be positive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Request {
    pub target_hz: f64,
    pub channel_resolution_hz: f64,
    /// Only try this RF divider
    pub fixed_output_divider: Option<u32>,
}

impl Request {
    pub fn new(target_hz: f64, channel_resolution_hz: f64) -> Self {
        Request { target_hz, channel_resolution_hz, fixed_output_divider: None }
    }

    pub fn with_output_divider(mut self, d: u32) -> Self {
        self.fixed_output_divider = Some(d);
        self
    }
}

/// Accepted divider assignment
///
/// `MOD` is 2 whenever `FRAC` is 0, otherwise the value the channel step asked for.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plan {
    pub output_divider: u32,
    pub vco_hz: f64,
    /// `INT + FRAC / MOD`
    pub n: f64,
    pub int: u32,
    pub frac: u32,
    pub modulus: u32,
    pub prescaler: Prescaler,
    pub integer_mode: bool,
    pub band_select: BandSelect,
    pub achieved_hz: f64,
}

/// Searches divider assignments for a target frequency.
pub struct FrequencyPlanner<'o, O: Observer> {
    observer: &'o mut O,
}

impl<'o, O: Observer> FrequencyPlanner<'o, O> {
    pub fn new(observer: &'o mut O) -> Self {
        FrequencyPlanner { observer }
    }

    /// First candidate that meets every constraint and the tolerance.
    ///
    /// Returns the updated copy of `chain`; `chain` itself is not touched.
    /// MOD = REF IN / f RES as in the datasheet's worked example, with f PFD
    /// in place of REF IN once the reference path divides. f RES is the VCO
    /// channel spacing, the output steps by f RES / RF Divider.
    pub fn plan(&mut self, chain: &DividerChain, req: &Request) -> Result<(DividerChain, Plan), Error> {
        if !(req.channel_resolution_hz > 0.0 && req.channel_resolution_hz.is_finite()) {
            return Err(Error::InvalidFieldValue {
                field: "channel_resolution",
                value: saturate_u64(req.channel_resolution_hz),
            });
        }
        let candidates: &[u32] = match &req.fixed_output_divider {
            Some(d) if OUTPUT_DIVIDERS.contains(d) => slice::from_ref(d),
            Some(d) => {
                return Err(Error::InvalidFieldValue { field: Stage::RfDivider.name(), value: *d as u64 })
            }
            None => &OUTPUT_DIVIDERS,
        };

        let mut last = None;
        for &d in candidates {
            match try_candidate(chain, req, d) {
                Ok((scratch, plan)) => {
                    if plan.band_select.degraded {
                        self.observer.band_select_degraded(plan.band_select.required, plan.band_select.divider);
                    }
                    self.observer.planned(&plan);
                    return Ok((scratch, plan));
                }
                Err(Error::ConstraintViolation(v)) => {
                    self.observer.candidate_rejected(d, &v);
                    last = Some((d, v));
                }
                Err(e) => return Err(e),
            }
        }

        match last {
            Some((last_output_divider, last_violation)) => Err(Error::PlanningExhausted {
                target_hz: req.target_hz,
                last_output_divider,
                last_violation,
            }),
            None => Err(Error::InvalidFieldValue { field: Stage::RfDivider.name(), value: 0 }),
        }
    }
}

fn try_candidate(chain: &DividerChain, req: &Request, d: u32) -> Result<(DividerChain, Plan), Error> {
    let f_vco = req.target_hz * d as f64;
    if !(VCO_FREQ_MIN..=VCO_FREQ_MAX).contains(&f_vco) {
        return Err(Violation::VcoOutOfRange { freq_hz: f_vco }.into());
    }

    let mut c = chain.clone();
    c.set_ratio(Stage::RfDivider, d)?;
    let prescaler = Prescaler::for_vco(f_vco);
    c.set_prescaler(prescaler);

    let f_pfd = c.f_pfd()?;
    let n = match c.map().get::<FeedbackSelect, R4>()? {
        FeedbackSelect::Fundamental => f_vco / f_pfd,
        FeedbackSelect::Divided => req.target_hz / f_pfd,
    };

    let mut modulus = modulus_for(f_pfd, req.channel_resolution_hz, round)?;
    let mut int = saturate_u32(floor(n));
    let mut frac = saturate_u32(round(modulus as f64 * (n - floor(n))));
    if frac >= modulus {
        int = int.saturating_add(1);
        frac = 0;
    }
    if frac == 0 {
        modulus = MOD_MIN;
    }

    c.set_n_divider(int, frac, modulus)?;
    let band_select = c.refresh_band_select()?;
    c.validate()?;

    let achieved_hz = c.current_frequency()?;
    if fabs(achieved_hz - req.target_hz) > c.tolerance_hz() {
        return Err(Violation::OutsideTolerance {
            target_hz: req.target_hz,
            achieved_hz,
            tolerance_hz: c.tolerance_hz(),
        }
        .into());
    }

    let plan = Plan {
        output_divider: d,
        vco_hz: c.vco_frequency()?,
        n: c.ratio(Stage::NDivider)?.value(),
        int,
        frac,
        modulus,
        prescaler,
        integer_mode: c.integer_mode(),
        band_select,
        achieved_hz,
    };
    Ok((c, plan))
}

fn saturate_u64(x: f64) -> u64 {
    if x >= u64::MAX as f64 {
        u64::MAX
    } else if x > 0.0 {
        x as u64
    } else {
        0
    }
}

/// Limits for [`IntegerNSearch`]. `None` searches both settings or every divider.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SearchSpace {
    /// REFin to search with, defaults to the chain's
    pub reference_hz: Option<f64>,
    pub doubler: Option<bool>,
    pub ref_divider: Option<bool>,
    pub output_divider: Option<u32>,
}

/// Integer-N configuration landing on the desired frequency
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IntegerNMatch {
    pub doubler: bool,
    pub ref_divider: bool,
    pub r_counter: u32,
    pub n: u32,
    pub output_divider: u32,
    pub f_ref: f64,
    pub f_pfd: f64,
    pub f_vco: f64,
    pub f_out: f64,
}

/// Every integer-N setting of the reference path and RF divider that hits a
/// frequency, in doubler, divide-by-2, R counter, RF divider order.
///
/// Candidates are programmed into a private copy of the chain and fully
/// validated; configurations the chip cannot run are skipped.
#[derive(Debug, Clone)]
pub struct IntegerNSearch {
    base: DividerChain,
    desired_hz: f64,
    doublers: ([bool; 2], usize),
    ref_dividers: ([bool; 2], usize),
    output_dividers: ([u32; 7], usize),
    cursor: [usize; 4],
    done: bool,
}

const R_COUNTERS: usize = R_COUNTER_MAX as usize;

impl IntegerNSearch {
    pub fn new(chain: &DividerChain, desired_hz: f64, space: &SearchSpace) -> Result<Self, Error> {
        let mut base = chain.clone();
        if let Some(hz) = space.reference_hz {
            base.set_reference_hz(hz);
        }
        let output_dividers = match space.output_divider {
            Some(d) if OUTPUT_DIVIDERS.contains(&d) => ([d; 7], 1),
            Some(d) => return Err(Error::InvalidFieldValue { field: Stage::RfDivider.name(), value: d as u64 }),
            None => (OUTPUT_DIVIDERS, OUTPUT_DIVIDERS.len()),
        };
        Ok(IntegerNSearch {
            base,
            desired_hz,
            doublers: options(space.doubler),
            ref_dividers: options(space.ref_divider),
            output_dividers,
            cursor: [0; 4],
            done: false,
        })
    }

    fn advance(&mut self) {
        let lens = [self.doublers.1, self.ref_dividers.1, R_COUNTERS, self.output_dividers.1];
        for axis in (0..4).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < lens[axis] {
                return;
            }
            self.cursor[axis] = 0;
        }
        self.done = true;
    }

    fn evaluate(&self, doubler: bool, ref_divider: bool, r_counter: u32, d: u32) -> Option<IntegerNMatch> {
        let f_ref = self.base.reference_hz();
        let f_pfd = f_ref * if doubler { 2.0 } else { 1.0 } / r_counter as f64 / if ref_divider { 2.0 } else { 1.0 };
        let divided = self.base.map().get::<FeedbackSelect, R4>().ok()? == FeedbackSelect::Divided;
        let feedback = if divided { d } else { 1 };

        let n = round(self.desired_hz * d as f64 / feedback as f64 / f_pfd);
        let estimate = f_pfd * n * feedback as f64 / d as f64;
        if !(n >= 1.0) || fabs(estimate - self.desired_hz) > self.base.tolerance_hz() {
            return None;
        }

        let mut c = self.base.clone();
        c.set_dividers(doubler, ref_divider, r_counter, saturate_u32(n), d).ok()?;
        c.validate().ok()?;
        let f_out = c.current_frequency().ok()?;
        if fabs(f_out - self.desired_hz) > c.tolerance_hz() {
            return None;
        }
        Some(IntegerNMatch {
            doubler,
            ref_divider,
            r_counter,
            n: saturate_u32(n),
            output_divider: d,
            f_ref,
            f_pfd: c.f_pfd().ok()?,
            f_vco: c.vco_frequency().ok()?,
            f_out,
        })
    }
}

fn options(pinned: Option<bool>) -> ([bool; 2], usize) {
    match pinned {
        Some(b) => ([b, b], 1),
        None => ([false, true], 2),
    }
}

impl Iterator for IntegerNSearch {
    type Item = IntegerNMatch;

    fn next(&mut self) -> Option<IntegerNMatch> {
        while !self.done {
            let [di, ti, ri, oi] = self.cursor;
            let doubler = self.doublers.0[di];
            let ref_divider = self.ref_dividers.0[ti];
            let d = self.output_dividers.0[oi];
            self.advance();
            if let Some(m) = self.evaluate(doubler, ref_divider, ri as u32 + 1, d) {
                return Some(m);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fields::{BandSelectClockMode, Ldf, R2};
    use std::vec::Vec;

    #[derive(Default)]
    struct Rejections(Vec<(u32, Violation)>);

    impl Observer for Rejections {
        fn candidate_rejected(&mut self, d: u32, v: &Violation) {
            self.0.push((d, *v));
        }
    }

    fn chain() -> DividerChain {
        DividerChain::new(&Config::default()).unwrap()
    }

    #[test]
    fn bad_channel_resolution_is_rejected() {
        let c = chain();
        for res in [0.0, -100e3, f64::NAN, f64::INFINITY] {
            let mut rejected = Rejections::default();
            let r = FrequencyPlanner::new(&mut rejected).plan(&c, &Request::new(1.5e9, res));
            assert!(matches!(r, Err(Error::InvalidFieldValue { field: "channel_resolution", .. })));
            assert!(rejected.0.is_empty());
        }
    }

    #[test]
    fn integer_plan_for_1500mhz() {
        let c = chain();
        let mut rejected = Rejections::default();
        let (planned, plan) = FrequencyPlanner::new(&mut rejected)
            .plan(&c, &Request::new(1.5e9, 100e3))
            .unwrap();

        assert_eq!(plan.output_divider, 2);
        assert_eq!(plan.vco_hz, 3e9);
        assert_eq!((plan.int, plan.frac, plan.modulus), (120, 0, 2));
        assert_eq!(plan.n, 120.0);
        assert!(plan.integer_mode);
        assert_eq!(plan.achieved_hz, 1.5e9);
        assert_eq!(plan.band_select.mode, BandSelectClockMode::High);
        assert_eq!(planned.map().get::<Ldf, R2>().unwrap(), Ldf::IntN);

        assert_eq!(rejected.0.len(), 1);
        assert_eq!(rejected.0[0], (1, Violation::VcoOutOfRange { freq_hz: 1.5e9 }));
    }

    #[test]
    fn fractional_plan() {
        let c = chain();
        let (planned, plan) = FrequencyPlanner::new(&mut ())
            .plan(&c, &Request::new(1_000_100_000.0, 100e3))
            .unwrap();
        // VCO 4000.4 MHz on the 8/9 prescaler, N = 160 + 4/250
        assert_eq!(plan.output_divider, 4);
        assert_eq!(plan.prescaler, Prescaler::P89);
        assert_eq!((plan.int, plan.frac, plan.modulus), (160, 4, 250));
        assert_eq!(planned.frequency_resolution().unwrap(), 25e3);
        assert!(!plan.integer_mode);
        assert!(fabs(plan.achieved_hz - 1_000_100_000.0) <= 1.0);
        assert_eq!(planned.current_frequency().unwrap(), plan.achieved_hz);
    }

    #[test]
    fn fixed_divider() {
        let c = chain();
        let (_, plan) = FrequencyPlanner::new(&mut ())
            .plan(&c, &Request::new(750e6, 100e3).with_output_divider(4))
            .unwrap();
        assert_eq!(plan.output_divider, 4);

        assert_eq!(
            FrequencyPlanner::new(&mut ()).plan(&c, &Request::new(750e6, 100e3).with_output_divider(3)),
            Err(Error::InvalidFieldValue { field: "rf_divider", value: 3 })
        );
    }

    #[test]
    fn above_vco_range_is_exhausted() {
        let c = chain();
        let r = FrequencyPlanner::new(&mut ()).plan(&c, &Request::new(5e9, 100e3));
        assert_eq!(
            r.unwrap_err(),
            Error::PlanningExhausted {
                target_hz: 5e9,
                last_output_divider: 64,
                last_violation: Violation::VcoOutOfRange { freq_hz: 320e9 },
            }
        );
    }

    #[test]
    fn coarse_resolution_misses_tolerance() {
        let c = chain();
        let mut rejected = Rejections::default();
        let r = FrequencyPlanner::new(&mut rejected).plan(&c, &Request::new(1_000_000_123.0, 1e6));
        assert_eq!(
            r.unwrap_err(),
            Error::PlanningExhausted {
                target_hz: 1_000_000_123.0,
                last_output_divider: 64,
                last_violation: Violation::VcoOutOfRange { freq_hz: 64_000_007_872.0 },
            }
        );
        assert!(matches!(rejected.0[2], (4, Violation::OutsideTolerance { .. })));
        assert_eq!(rejected.0.len(), 7);
    }

    #[test]
    fn integer_n_search_is_ordered_and_exact() {
        let c = chain();
        let space = SearchSpace { doubler: Some(true), ref_divider: Some(true), ..Default::default() };
        let hits: Vec<IntegerNMatch> = IntegerNSearch::new(&c, 1.5e9, &space).unwrap().take(3).collect();

        assert_eq!(hits[0].r_counter, 1);
        assert_eq!(hits[0].output_divider, 2);
        assert_eq!(hits[0].n, 120);
        assert_eq!(hits[0].f_pfd, 25e6);
        assert_eq!(hits[0].f_vco, 3e9);
        for pair in hits.windows(2) {
            assert!((pair[0].r_counter, pair[0].output_divider) < (pair[1].r_counter, pair[1].output_divider));
        }
        for h in &hits {
            assert!(fabs(h.f_out - 1.5e9) <= 1.0);
        }
    }

    #[test]
    fn integer_n_search_does_not_touch_chain() {
        let c = chain();
        let before = c.clone();
        let space = SearchSpace { output_divider: Some(4), ..Default::default() };
        let n = IntegerNSearch::new(&c, 800e6, &space).unwrap().count();
        assert!(n > 0);
        assert_eq!(c, before);

        let space = SearchSpace { output_divider: Some(5), ..Default::default() };
        assert!(IntegerNSearch::new(&c, 800e6, &space).is_err());
    }
}
