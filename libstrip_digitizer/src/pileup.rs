use rand::Rng;

use super::charge::FixedCharge;
use super::constants::SPEED_OF_LIGHT_CM_PER_NS;
use super::error::DigitizerError;
use super::hit::SimHit;
use super::saturation::ApvSaturationEmulator;
use super::sharing::{ChargeSharing, SharedCharge};
use super::truth::Contribution;
use super::unit::{DetectorUnit, UnitGeometry};

/// Channels `[first, last)` of a unit which received signal. Starts out empty
/// as `[n_strips, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveRange {
    pub first: usize,
    pub last: usize,
}

impl ActiveRange {
    pub fn empty(n_strips: usize) -> Self {
        Self {
            first: n_strips,
            last: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first >= self.last
    }

    pub fn expand(&mut self, first: usize, last: usize) {
        if first >= last {
            return;
        }
        self.first = self.first.min(first);
        self.last = self.last.max(last);
    }

    pub fn contains(&self, channel: usize) -> bool {
        channel >= self.first && channel < self.last
    }
}

/// Dense per-channel charge buffer of a unit. Charge is summed in fixed point so
/// the result does not depend on the order of the accumulation calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeVector {
    charges: Vec<FixedCharge>,
    active: ActiveRange,
}

impl ChargeVector {
    pub fn new(n_strips: usize) -> Self {
        Self {
            charges: vec![FixedCharge::ZERO; n_strips],
            active: ActiveRange::empty(n_strips),
        }
    }

    pub fn charges(&self) -> &[FixedCharge] {
        &self.charges
    }

    /// Charge of one channel in electrons
    pub fn amplitude(&self, channel: usize) -> f32 {
        self.charges[channel].electrons()
    }

    pub fn active(&self) -> ActiveRange {
        self.active
    }

    pub fn len(&self) -> usize {
        self.charges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charges.is_empty()
    }

    /// Add the charge of one hit. Fails without touching the buffer if a deposit
    /// falls outside the unit.
    pub fn add(&mut self, geometry: &UnitGeometry, shared: &SharedCharge) -> Result<(), DigitizerError> {
        let n_strips = self.charges.len();
        if let Some(bad) = shared.deposits.iter().find(|d| d.channel >= n_strips) {
            return Err(DigitizerError::ChannelOutOfRange {
                unit: geometry.id,
                channel: bad.channel,
                n_strips,
            });
        }
        for deposit in shared.deposits.iter() {
            self.charges[deposit.channel] += FixedCharge::from_electrons(deposit.charge);
        }
        self.active
            .expand(shared.first.min(n_strips), shared.last.min(n_strips));
        Ok(())
    }

    /// Amplitudes in electrons, the working vector of the digitization stages
    pub fn to_vec(&self) -> Vec<f32> {
        self.charges.iter().map(|c| c.electrons()).collect()
    }

    pub fn reset(&mut self) {
        self.charges.fill(FixedCharge::ZERO);
        self.active = ActiveRange::empty(self.charges.len());
    }
}

/// The time-of-flight acceptance window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TofWindow {
    /// Half width of the window in ns (peak or deconvolution mode cut)
    pub cut: f32,
    /// Global delay shift in ns, e.g. for cosmics
    pub shift: f32,
}

impl TofWindow {
    /// A hit is accepted if its time of flight, corrected for the shift and for the
    /// light propagation delay to its position, is within the cut and it lost energy.
    pub fn accepts(&self, hit: &SimHit, geometry: &UnitGeometry) -> bool {
        let delay = geometry.global_distance(&hit.local_position) / SPEED_OF_LIGHT_CM_PER_NS;
        (hit.tof - self.shift - delay).abs() < self.cut && hit.energy_loss > 0.0
    }
}

/// Everything that identifies one accumulation call besides the hits themselves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationPass {
    /// Index of the first hit of the subrange in the full hit collection
    pub first_global_index: usize,
    pub tof_bin: u32,
    pub field: [f32; 3],
    pub lorentz_angle: f32,
}

/// Counters of one accumulation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// False if the whole pass was dropped by the readout inefficiency draw
    pub efficient: bool,
    pub accepted_hits: usize,
    pub saturating_hits: usize,
}

/// Sums the charge of every accepted hit of every pass into the unit's charge vector.
#[derive(Debug, Clone)]
pub struct PileupSignalAccumulator {
    efficiency: f32,
    window: TofWindow,
    saturation: Option<ApvSaturationEmulator>,
    track_truth: bool,
}

impl PileupSignalAccumulator {
    pub fn new(
        efficiency: f32,
        window: TofWindow,
        saturation: Option<ApvSaturationEmulator>,
        track_truth: bool,
    ) -> Self {
        Self {
            efficiency,
            window,
            saturation,
            track_truth,
        }
    }

    /// Ingest a subrange of hits for one unit and one time window.
    ///
    /// One uniform number decides whether the readout was efficient for the whole
    /// pass. Hits belonging to another unit are skipped.
    pub fn accumulate<H, S, R>(
        &self,
        unit: &mut DetectorUnit,
        hits: &[H],
        pass: &AccumulationPass,
        sharing: &S,
        rng: &mut R,
    ) -> Result<PassSummary, DigitizerError>
    where
        H: AsRef<SimHit>,
        S: ChargeSharing<H>,
        R: Rng + ?Sized,
    {
        let mut summary = PassSummary::default();
        if rng.random::<f32>() > self.efficiency {
            return Ok(summary);
        }
        summary.efficient = true;

        let unit_id = unit.id();
        let (geometry, signal, saturated, truth) = unit.accumulation_parts();
        for (offset, hit) in hits.iter().enumerate() {
            let sim = hit.as_ref();
            if sim.unit != unit_id || !self.window.accepts(sim, geometry) {
                continue;
            }

            let shared = sharing.charge_for(hit, geometry, &pass.field, pass.lorentz_angle, rng);
            signal.add(geometry, &shared)?;
            summary.accepted_hits += 1;

            if let Some(emulator) = &self.saturation {
                if emulator.emulate(unit_id, shared.first, shared.last, saturated, rng) {
                    summary.saturating_hits += 1;
                }
            }

            if self.track_truth {
                for deposit in shared.deposits.iter() {
                    truth.record(
                        deposit.channel,
                        Contribution {
                            particle_id: sim.particle_id,
                            origin_id: sim.origin_id,
                            charge: FixedCharge::from_electrons(deposit.charge),
                            global_index: pass.first_global_index.saturating_add(offset),
                            tof_bin: pass.tof_bin,
                        },
                    );
                }
            }
        }
        Ok(summary)
    }
}
