use rand::Rng;

use super::hit::{ChannelDeposit, RecordedHit, SimHit};
use super::unit::UnitGeometry;

/// The per-channel charge produced by one hit.
///
/// `deposits` are the explicit contributions of the hit, channel by channel, in
/// electrons. `[first, last)` is the footprint of the hit on the unit; it may be
/// wider than the set of deposit channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedCharge {
    pub first: usize,
    pub last: usize,
    pub deposits: Vec<ChannelDeposit>,
}

impl SharedCharge {
    /// Build from deposits alone; the footprint is the span of the deposit channels
    pub fn from_deposits(deposits: Vec<ChannelDeposit>) -> Self {
        let first = deposits.iter().map(|d| d.channel).min().unwrap_or(0);
        let last = deposits.iter().map(|d| d.channel.saturating_add(1)).max().unwrap_or(0);
        Self {
            first,
            last,
            deposits,
        }
    }
}

/// The charge sharing model: turns one particle crossing into charge on strips.
///
/// Drift, diffusion and induction are the business of the implementor.
pub trait ChargeSharing<H: AsRef<SimHit>> {
    fn charge_for<R: Rng + ?Sized>(
        &self,
        hit: &H,
        geometry: &UnitGeometry,
        field: &[f32; 3],
        lorentz_angle: f32,
        rng: &mut R,
    ) -> SharedCharge;
}

/// Charge sharing for hits whose deposits were computed upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedSharing;

impl ChargeSharing<RecordedHit> for PrecomputedSharing {
    fn charge_for<R: Rng + ?Sized>(
        &self,
        hit: &RecordedHit,
        _geometry: &UnitGeometry,
        _field: &[f32; 3],
        _lorentz_angle: f32,
        _rng: &mut R,
    ) -> SharedCharge {
        SharedCharge::from_deposits(
            hit.deposits
                .iter()
                .filter(|d| d.charge != 0.0)
                .copied()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_from_deposits() {
        let shared = SharedCharge::from_deposits(vec![
            ChannelDeposit {
                channel: 7,
                charge: 1.0,
            },
            ChannelDeposit {
                channel: 4,
                charge: 2.0,
            },
        ]);
        assert_eq!((shared.first, shared.last), (4, 8));

        let shared = SharedCharge::from_deposits(vec![ChannelDeposit {
            channel: usize::MAX,
            charge: 1.0,
        }]);
        assert_eq!((shared.first, shared.last), (usize::MAX, usize::MAX));

        let shared = SharedCharge::from_deposits(Vec::new());
        assert_eq!((shared.first, shared.last), (0, 0));
    }
}
