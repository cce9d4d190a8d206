use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::unit::{BadStripRange, UnitId};

/// Zero suppression thresholds of a strip, in units of its noise
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StripThreshold {
    pub low: f32,
    pub high: f32,
}

/// Calibration lookups needed by the digitizer.
///
/// A missing entry is never an error; the digitizer substitutes a value which
/// contributes nothing (zero noise, unit gain, zero pedestal, zero thresholds,
/// zero Lorentz angle).
pub trait Conditions {
    /// Noise RMS of a strip in ADC counts
    fn noise(&self, unit: UnitId, strip: usize) -> Option<f32>;
    fn gain(&self, unit: UnitId, strip: usize) -> Option<f32>;
    /// Pedestal of a strip in ADC counts
    fn pedestal(&self, unit: UnitId, strip: usize) -> Option<f32>;
    fn threshold(&self, unit: UnitId, strip: usize) -> Option<StripThreshold>;
    fn bad_strips(&self, unit: UnitId) -> Vec<BadStripRange>;
    fn lorentz_angle(&self, unit: UnitId) -> Option<f32>;

    /// Baseline shift, in electrons, for an APV of `unit` given the estimate of
    /// the charge it collected. The default is no shift.
    #[allow(unused_variables)]
    fn baseline_shift(&self, unit: UnitId, apv: usize, apv_charge: f32) -> f32 {
        0.0
    }
}

/// Uniform calibration for every strip of every unit, with per-unit bad strips.
///
/// Useful for studies and for the command line driver. Serializable as part of
/// the YAML configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatConditions {
    pub noise: f32,
    pub gain: f32,
    pub pedestal: f32,
    pub threshold: StripThreshold,
    pub lorentz_angle: f32,
    /// Fraction of the APV charge estimate subtracted as baseline shift
    pub baseline_shift_fraction: f32,
    #[serde(default)]
    pub bad_strips: FxHashMap<UnitId, Vec<BadStripRange>>,
}

impl Default for FlatConditions {
    fn default() -> Self {
        Self {
            noise: 4.0,
            gain: 1.0,
            pedestal: 0.0,
            threshold: StripThreshold {
                low: 2.0,
                high: 5.0,
            },
            lorentz_angle: 0.0,
            baseline_shift_fraction: 0.0,
            bad_strips: FxHashMap::default(),
        }
    }
}

impl Conditions for FlatConditions {
    fn noise(&self, _unit: UnitId, _strip: usize) -> Option<f32> {
        Some(self.noise)
    }

    fn gain(&self, _unit: UnitId, _strip: usize) -> Option<f32> {
        Some(self.gain)
    }

    fn pedestal(&self, _unit: UnitId, _strip: usize) -> Option<f32> {
        Some(self.pedestal)
    }

    fn threshold(&self, _unit: UnitId, _strip: usize) -> Option<StripThreshold> {
        Some(self.threshold)
    }

    fn bad_strips(&self, unit: UnitId) -> Vec<BadStripRange> {
        self.bad_strips.get(&unit).cloned().unwrap_or_default()
    }

    fn lorentz_angle(&self, _unit: UnitId) -> Option<f32> {
        Some(self.lorentz_angle)
    }

    fn baseline_shift(&self, _unit: UnitId, _apv: usize, apv_charge: f32) -> f32 {
        self.baseline_shift_fraction * apv_charge
    }
}
