//! Electronic noise, pedestals and detector damage applied to a unit's charge
//! vector before ADC conversion.
//!
//! All amplitudes are in electrons; conditions give noise and pedestals in ADC
//! counts, converted with the electron-per-ADC constant. Dead strips never
//! receive anything.
//!
//! The zero suppressed and the raw paths use different noise RMS conventions
//! (see [`zero_suppressed_noise_rms`] and [`raw_noise_rms`]). They are not
//! interchangeable.
use bitvec::slice::BitSlice;
use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Poisson, StandardNormal};

use super::conditions::Conditions;
use super::config::{CommonModeRms, DigitizerConfig};
use super::constants::*;
use super::pileup::ActiveRange;
use super::unit::DetectorUnit;

/// Strip noise RMS in electrons for the zero suppressed readout. The converter
/// multiplies by the gain, so the noise is divided by it here.
pub fn zero_suppressed_noise_rms(noise_adc: f32, electron_per_adc: f32, gain: f32) -> f32 {
    noise_adc * electron_per_adc / gain
}

/// Strip noise RMS in electrons for the raw readout. Not divided by the gain.
pub fn raw_noise_rms(noise_adc: f32, electron_per_adc: f32) -> f32 {
    noise_adc * electron_per_adc
}

/// Zero the dead strips and scale the saturated ones by a random factor in
/// [-3/7, 1), negative factors giving 0.
pub fn kill_dead_and_saturated<R: Rng + ?Sized>(
    amplitudes: &mut [f32],
    dead: &BitSlice,
    saturated: &BitSlice,
    rng: &mut R,
) {
    for (strip, amplitude) in amplitudes.iter_mut().enumerate() {
        if dead[strip] {
            *amplitude = 0.0;
        }
        if saturated[strip] {
            let scale = rng.random::<f32>() * SATURATION_SCALE_SPAN + SATURATION_SCALE_MIN;
            *amplitude *= scale.max(0.0);
        }
    }
}

/// Add independent gaussian noise of RMS `rms[strip]` to every strip
pub fn add_strip_noise<R: Rng + ?Sized>(amplitudes: &mut [f32], rms: &[f32], rng: &mut R) {
    for (amplitude, &sigma) in amplitudes.iter_mut().zip(rms.iter()) {
        if sigma > 0.0 {
            let z: f32 = rng.sample(StandardNormal);
            *amplitude += sigma * z;
        }
    }
}

/// Probability for a standard gaussian to be above `x`.
///
/// Uses the Abramowitz & Stegun 7.1.26 rational approximation of erfc (absolute
/// error below 1.5e-7).
pub fn gaussian_upper_tail(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];
    let z = x.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + P * z);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;
    let erfc = poly * (-z * z).exp();
    if x >= 0.0 {
        0.5 * erfc
    } else {
        1.0 - 0.5 * erfc
    }
}

/// Draw a standard gaussian value conditioned to be above `threshold`
pub fn sample_gaussian_tail<R: Rng + ?Sized>(threshold: f64, rng: &mut R) -> f64 {
    if threshold <= 0.0 {
        loop {
            let z: f64 = rng.sample(StandardNormal);
            if z >= threshold {
                return z;
            }
        }
    }
    // Marsaglia's tail method
    loop {
        let u1 = 1.0 - rng.random::<f64>();
        let u2 = rng.random::<f64>();
        let x = (threshold * threshold - 2.0 * u1.ln()).sqrt();
        if u2 * x < threshold {
            return x;
        }
    }
}

/// Noise for the zero suppressed readout when only one RMS is known for the unit.
///
/// Strips inside the active range get gaussian noise. Outside of it only the
/// strips which would pass `threshold` sigmas are generated: their number is
/// drawn from a Poisson with the gaussian tail probability, their position
/// uniformly and their amplitude from the gaussian tail.
pub fn add_noise_with_tail<R: Rng + ?Sized>(
    amplitudes: &mut [f32],
    active: ActiveRange,
    dead: &BitSlice,
    rms: f32,
    threshold: f32,
    rng: &mut R,
) {
    if rms <= 0.0 {
        return;
    }
    let mut outside = Vec::new();
    for (strip, amplitude) in amplitudes.iter_mut().enumerate() {
        if dead[strip] {
            continue;
        }
        if active.contains(strip) {
            let z: f32 = rng.sample(StandardNormal);
            *amplitude += rms * z;
        } else {
            outside.push(strip);
        }
    }

    let mean = outside.len() as f64 * gaussian_upper_tail(threshold as f64);
    let Ok(poisson) = Poisson::new(mean) else {
        return;
    };
    let n_noisy = (poisson.sample(rng) as usize).min(outside.len());
    for idx in index::sample(rng, outside.len(), n_noisy).into_iter() {
        let value = sample_gaussian_tail(threshold as f64, rng) as f32;
        amplitudes[outside[idx]] += rms * value;
    }
}

/// Scale factor to ADC-like electrons and each stage's on/off switch.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseInjectionPipeline {
    noise: bool,
    single_strip_noise: bool,
    common_mode_noise: bool,
    real_pedestals: bool,
    baseline_shift: bool,
    electron_per_adc: f32,
    noise_sigma_threshold: f32,
    cmn_rms: CommonModeRms,
    pedestal_offset: u32,
}

impl NoiseInjectionPipeline {
    pub fn new(config: &DigitizerConfig) -> Self {
        Self {
            noise: config.noise,
            single_strip_noise: config.single_strip_noise,
            common_mode_noise: config.common_mode_noise,
            real_pedestals: config.real_pedestals,
            baseline_shift: config.baseline_shift,
            electron_per_adc: config.electron_per_adc(),
            noise_sigma_threshold: config.noise_sigma_threshold,
            cmn_rms: config.cmn_rms,
            pedestal_offset: config.pedestal_offset,
        }
    }

    /// First live strip at or after `start`
    fn reference_strip(dead: &BitSlice, start: usize) -> Option<usize> {
        (start..dead.len()).find(|&strip| !dead[strip])
    }

    /// Noise for the zero suppressed readout. No pedestals, no common mode.
    pub fn apply_zero_suppressed<C, R>(
        &self,
        unit: &DetectorUnit,
        amplitudes: &mut [f32],
        conditions: &C,
        gains: &[f32],
        rng: &mut R,
    ) where
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        if !self.noise {
            return;
        }
        let id = unit.id();
        let dead = unit.dead();
        let noise_of = |strip: usize| conditions.noise(id, strip).unwrap_or(0.0);

        if self.single_strip_noise {
            let rms: Vec<f32> = (0..amplitudes.len())
                .map(|strip| {
                    if dead[strip] {
                        0.0
                    } else {
                        zero_suppressed_noise_rms(noise_of(strip), self.electron_per_adc, gains[strip])
                    }
                })
                .collect();
            add_strip_noise(amplitudes, &rms, rng);
        } else {
            // Search starts in the middle of the unit
            let Some(reference) = Self::reference_strip(dead, amplitudes.len() / 2) else {
                log::warn!("Unit {id} has no live reference strip; no noise added");
                return;
            };
            let rms =
                zero_suppressed_noise_rms(noise_of(reference), self.electron_per_adc, gains[reference]);
            add_noise_with_tail(
                amplitudes,
                unit.signal().active(),
                dead,
                rms,
                self.noise_sigma_threshold,
                rng,
            );
        }
    }

    /// Baseline shift, strip noise, common mode noise and pedestals for the raw readout
    pub fn apply_raw<C, R>(&self, unit: &DetectorUnit, amplitudes: &mut [f32], conditions: &C, rng: &mut R)
    where
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        if self.baseline_shift {
            self.add_baseline_shift(unit, amplitudes, conditions);
        }
        if self.noise {
            self.add_raw_strip_noise(unit, amplitudes, conditions, rng);
        }
        if self.common_mode_noise {
            self.add_common_mode_noise(unit, amplitudes, rng);
        }
        self.add_pedestals(unit, amplitudes, conditions);
    }

    fn add_raw_strip_noise<C, R>(
        &self,
        unit: &DetectorUnit,
        amplitudes: &mut [f32],
        conditions: &C,
        rng: &mut R,
    ) where
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        let id = unit.id();
        let dead = unit.dead();
        let mut rms = vec![0.0; amplitudes.len()];

        if self.single_strip_noise {
            for (strip, sigma) in rms.iter_mut().enumerate() {
                if !dead[strip] {
                    *sigma = raw_noise_rms(
                        conditions.noise(id, strip).unwrap_or(0.0),
                        self.electron_per_adc,
                    );
                }
            }
        } else {
            // Search starts at the first strip
            let Some(reference) = Self::reference_strip(dead, 0) else {
                log::warn!("Unit {id} has no live reference strip; no noise added");
                return;
            };
            let sigma = raw_noise_rms(
                conditions.noise(id, reference).unwrap_or(0.0),
                self.electron_per_adc,
            );
            for (strip, value) in rms.iter_mut().enumerate() {
                if !dead[strip] {
                    *value = sigma;
                }
            }
        }
        add_strip_noise(amplitudes, &rms, rng);
    }

    /// One gaussian offset per APV, shared by its live strips
    fn add_common_mode_noise<R: Rng + ?Sized>(
        &self,
        unit: &DetectorUnit,
        amplitudes: &mut [f32],
        rng: &mut R,
    ) {
        let rms = self.cmn_rms.for_subdetector(unit.geometry().subdetector) * self.electron_per_adc;
        if rms <= 0.0 {
            return;
        }
        let dead = unit.dead();
        let n_apvs = amplitudes.len().div_ceil(APV_CHANNELS);
        let offsets: Vec<f32> = (0..n_apvs)
            .map(|_| {
                let z: f32 = rng.sample(StandardNormal);
                rms * z
            })
            .collect();
        for (strip, amplitude) in amplitudes.iter_mut().enumerate() {
            if !dead[strip] {
                *amplitude += offsets[strip / APV_CHANNELS];
            }
        }
    }

    /// The pedestal offset keeps every strip positive once the downstream
    /// pedestal and common mode subtraction is done; it stays in the output.
    fn add_pedestals<C: Conditions + ?Sized>(&self, unit: &DetectorUnit, amplitudes: &mut [f32], conditions: &C) {
        let id = unit.id();
        let dead = unit.dead();
        let offset = self.pedestal_offset as f32;
        for (strip, amplitude) in amplitudes.iter_mut().enumerate() {
            if dead[strip] {
                continue;
            }
            let pedestal = if self.real_pedestals {
                conditions.pedestal(id, strip).unwrap_or(0.0) + offset
            } else {
                offset
            };
            *amplitude += pedestal * self.electron_per_adc;
        }
    }

    /// Subtract from each APV the shift the conditions give for the mean charge of
    /// its live strips with signal.
    fn add_baseline_shift<C: Conditions + ?Sized>(
        &self,
        unit: &DetectorUnit,
        amplitudes: &mut [f32],
        conditions: &C,
    ) {
        let id = unit.id();
        let dead = unit.dead();
        let n_strips = amplitudes.len();
        for (apv, start) in (0..n_strips).step_by(APV_CHANNELS).enumerate() {
            let end = (start + APV_CHANNELS).min(n_strips);
            let (charge, multiplicity) = (start..end)
                .filter(|&strip| !dead[strip] && amplitudes[strip] > 0.0)
                .fold((0.0_f32, 0_usize), |(c, m), strip| (c + amplitudes[strip], m + 1));
            let estimate = if multiplicity == 0 {
                0.0
            } else {
                charge / multiplicity as f32
            };
            let shift = conditions.baseline_shift(id, apv, estimate);
            if shift == 0.0 {
                continue;
            }
            for strip in start..end {
                if !dead[strip] {
                    amplitudes[strip] -= shift;
                }
            }
        }
    }
}
