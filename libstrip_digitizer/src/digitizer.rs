use rand::Rng;

use super::conditions::{Conditions, StripThreshold};
use super::config::DigitizerConfig;
use super::converter::DigitalConverter;
use super::digi::{DigitizedUnit, RawDigi, Readout};
use super::error::DigitizerError;
use super::hit::SimHit;
use super::noise::{kill_dead_and_saturated, NoiseInjectionPipeline};
use super::pileup::{AccumulationPass, PassSummary, PileupSignalAccumulator, TofWindow};
use super::saturation::{ApvProbabilityTable, ApvSaturationEmulator};
use super::sharing::ChargeSharing;
use super::unit::{SaturationReset, UnitGeometry, UnitId, UnitRegistry};
use super::zero_suppression::ZeroSuppression;

/// StripDigitizer turns the charge of simulated hits into strip digis.
///
/// The lifecycle is:
/// - `initialize_unit` once per unit (reads the dead strips)
/// - `initialize_event` at the start of every event
/// - `accumulate` for every unit and time window of the event
/// - `digitize` once per unit, which drains the event state of the unit
///
/// All of the accumulation of an event must be done before any unit is
/// digitized. Randomness comes from the caller, so a seeded generator and a
/// fixed call order give identical output.
#[derive(Debug, Clone)]
pub struct StripDigitizer {
    config: DigitizerConfig,
    units: UnitRegistry,
    accumulator: PileupSignalAccumulator,
    noise: NoiseInjectionPipeline,
    converter: DigitalConverter,
    suppression: ZeroSuppression,
}

impl StripDigitizer {
    /// Create a new StripDigitizer.
    ///
    /// If APV saturation emulation is enabled the probability file is read here; a
    /// missing file fails the construction.
    pub fn new(config: DigitizerConfig) -> Result<Self, DigitizerError> {
        let table = if config.apv_saturation_from_hip {
            let path = config
                .apv_probability_file
                .as_ref()
                .ok_or(DigitizerError::MissingProbabilityFile)?;
            Some(ApvProbabilityTable::from_file(path)?)
        } else {
            None
        };
        Self::with_probability_table(config, table)
    }

    /// Create a new StripDigitizer with an already loaded APV probability table.
    /// The table is ignored if saturation emulation is disabled.
    pub fn with_probability_table(
        config: DigitizerConfig,
        table: Option<ApvProbabilityTable>,
    ) -> Result<Self, DigitizerError> {
        config.validate()?;

        if config.peak_mode {
            log::debug!("APVs running in peak mode (poor time resolution)");
        } else {
            log::debug!("APVs running in deconvolution mode (good time resolution)");
        }
        log::debug!("Zero suppression: {}", on_off(config.zero_suppression));
        log::debug!("Noise: {}", on_off(config.noise));
        log::debug!("SingleStripNoise: {}", on_off(config.single_strip_noise));
        log::debug!("CommonModeNoise: {}", on_off(config.common_mode_noise));
        log::debug!("BaselineShift: {}", on_off(config.baseline_shift));
        log::debug!("Truth links: {}", on_off(config.make_digi_sim_links));

        let saturation = match (config.apv_saturation_from_hip, table) {
            (true, Some(table)) => {
                log::debug!(
                    "APV saturation from HIP: ON ({} units, scaling {})",
                    table.len(),
                    config.apv_saturation_prob_scaling
                );
                Some(ApvSaturationEmulator::new(
                    table,
                    config.apv_saturation_prob_scaling,
                ))
            }
            (true, None) => return Err(DigitizerError::MissingProbabilityFile),
            (false, _) => None,
        };

        let accumulator = PileupSignalAccumulator::new(
            config.efficiency,
            TofWindow {
                cut: config.tof_cut(),
                shift: config.cosmic_delay_shift,
            },
            saturation,
            config.make_digi_sim_links,
        );

        Ok(Self {
            noise: NoiseInjectionPipeline::new(&config),
            converter: DigitalConverter::new(config.electron_per_adc(), config.premixing),
            suppression: ZeroSuppression::new(config.fed_algorithm),
            accumulator,
            units: UnitRegistry::default(),
            config,
        })
    }

    pub fn config(&self) -> &DigitizerConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// (Re)initialize a unit from its geometry and dead strips. Clears its
    /// saturation mask.
    pub fn initialize_unit<C: Conditions + ?Sized>(&mut self, geometry: UnitGeometry, conditions: &C) {
        let bad_strips = conditions.bad_strips(geometry.id);
        self.units.initialize(geometry, &bad_strips);
    }

    /// Forget the transient state of every unit (and the saturation, if reset per event)
    pub fn initialize_event(&mut self) {
        let per_event = self.config.saturation_reset == SaturationReset::PerEvent;
        for unit in self.units.units_mut() {
            unit.clear_transient();
            if per_event {
                unit.clear_saturation();
            }
        }
    }

    /// Accumulate the hits `hits` (starting at `first_global_index` in the full
    /// hit collection) of time window `tof_bin` on `unit`.
    #[allow(clippy::too_many_arguments)]
    pub fn accumulate<H, S, C, R>(
        &mut self,
        unit: UnitId,
        hits: &[H],
        first_global_index: usize,
        tof_bin: u32,
        field: [f32; 3],
        sharing: &S,
        conditions: &C,
        rng: &mut R,
    ) -> Result<PassSummary, DigitizerError>
    where
        H: AsRef<SimHit>,
        S: ChargeSharing<H>,
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        let detector_unit = self.units.get_mut(unit)?;
        let pass = AccumulationPass {
            first_global_index,
            tof_bin,
            field,
            lorentz_angle: conditions.lorentz_angle(unit).unwrap_or(0.0),
        };
        self.accumulator
            .accumulate(detector_unit, hits, &pass, sharing, rng)
    }

    /// Digitize one unit: damage, noise, ADC conversion, zero suppression and truth
    /// links. The unit's event state is drained afterwards, so a second call
    /// without accumulation gives no links.
    pub fn digitize<C, R>(
        &mut self,
        unit: UnitId,
        conditions: &C,
        rng: &mut R,
    ) -> Result<DigitizedUnit, DigitizerError>
    where
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        let detector_unit = self.units.get_mut(unit)?;
        let n_strips = detector_unit.n_strips();

        let mut amplitudes = detector_unit.signal().to_vec();
        kill_dead_and_saturated(
            &mut amplitudes,
            detector_unit.dead(),
            detector_unit.saturated(),
            rng,
        );

        let gains: Vec<f32> = (0..n_strips)
            .map(|strip| conditions.gain(unit, strip).unwrap_or(1.0))
            .collect();

        let (readout, links) = if self.config.zero_suppression {
            self.noise
                .apply_zero_suppressed(detector_unit, &mut amplitudes, conditions, &gains, rng);
            let adcs = self.converter.convert(&amplitudes, &gains);

            let noise: Vec<f32> = (0..n_strips)
                .map(|strip| conditions.noise(unit, strip).unwrap_or(0.0))
                .collect();
            let thresholds: Vec<StripThreshold> = (0..n_strips)
                .map(|strip| conditions.threshold(unit, strip).unwrap_or_default())
                .collect();
            let digis = self.suppression.suppress(&adcs, &noise, &thresholds);

            let links = detector_unit
                .truth_mut()
                .drain_links(digis.iter().map(|d| d.channel));
            (Readout::Suppressed(digis), links)
        } else {
            self.noise
                .apply_raw(detector_unit, &mut amplitudes, conditions, rng);
            let raw_digis: Vec<RawDigi> = self
                .converter
                .convert_raw(&amplitudes, &gains)
                .into_iter()
                .map(|adc| RawDigi { adc })
                .collect();

            // The channel of a raw digi is its position
            let channels: Vec<usize> = detector_unit
                .truth()
                .channels()
                .filter(|&channel| channel < raw_digis.len())
                .collect();
            let links = detector_unit.truth_mut().drain_links(channels);
            (Readout::Raw(raw_digis), links)
        };

        detector_unit.clear_transient();

        Ok(DigitizedUnit {
            unit,
            readout,
            links,
        })
    }

    /// Digitize every initialized unit, in ascending unit id order
    pub fn digitize_all<C, R>(
        &mut self,
        conditions: &C,
        rng: &mut R,
    ) -> Result<Vec<DigitizedUnit>, DigitizerError>
    where
        C: Conditions + ?Sized,
        R: Rng + ?Sized,
    {
        self.units
            .ids()
            .into_iter()
            .map(|id| self.digitize(id, conditions, rng))
            .collect()
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}
