use serde::{Deserialize, Serialize};

use super::unit::UnitId;

/// A simulated energy deposit left by a particle crossing a detector unit.
///
/// `particle_id` and `origin_id` together identify the particle. The origin id
/// disambiguates particles coming from different overlapping simulated
/// collections (signal vs. pileup interactions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimHit {
    pub unit: UnitId,
    pub particle_id: u32,
    pub origin_id: u32,
    /// Time of flight in ns
    pub tof: f32,
    /// Energy loss in GeV
    pub energy_loss: f32,
    /// Hit position in the local frame of the unit, in cm
    pub local_position: [f32; 3],
}

impl AsRef<SimHit> for SimHit {
    fn as_ref(&self) -> &SimHit {
        self
    }
}

/// Charge deposited on a single channel, in electrons
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelDeposit {
    pub channel: usize,
    pub charge: f32,
}

/// A SimHit which already went through an upstream charge sharing model.
///
/// This is the format used in hit files; see [`crate::sharing::PrecomputedSharing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedHit {
    #[serde(flatten)]
    pub hit: SimHit,
    #[serde(default)]
    pub deposits: Vec<ChannelDeposit>,
}

impl AsRef<SimHit> for RecordedHit {
    fn as_ref(&self) -> &SimHit {
        &self.hit
    }
}
