use bitvec::prelude::*;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::DigitizerError;
use super::pileup::ChargeVector;
use super::truth::TruthTracker;

/// Raw id of a detector unit (module)
pub type UnitId = u32;

/// Region of the tracker a unit belongs to. Selects the common mode noise RMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdetector {
    Tib,
    Tid,
    Tob,
    Tec,
    #[default]
    Other,
}

/// The geometry/topology information the digitizer needs about a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGeometry {
    pub id: UnitId,
    pub n_strips: usize,
    #[serde(default)]
    pub subdetector: Subdetector,
    /// Global position of the unit origin, in cm
    #[serde(default)]
    pub position: [f32; 3],
}

impl UnitGeometry {
    /// Distance from the global origin of a point given in the local frame, in cm
    pub fn global_distance(&self, local: &[f32; 3]) -> f32 {
        self.position
            .iter()
            .zip(local.iter())
            .map(|(p, l)| (p + l) * (p + l))
            .sum::<f32>()
            .sqrt()
    }
}

/// A contiguous block of dead strips, as stored in the bad strip conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadStripRange {
    pub first_strip: usize,
    pub range: usize,
}

/// When the saturated (APV killed) mask of a unit is forgotten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationReset {
    /// Only when the unit is (re)initialized; saturation carries over events
    #[default]
    PerRun,
    /// At the start of every event
    PerEvent,
}

/// Per-unit context.
///
/// The dead and saturated masks live as long as the unit is initialized. The
/// charge vector and the truth tracker only live for one accumulate -> digitize
/// cycle.
#[derive(Debug, Clone)]
pub struct DetectorUnit {
    geometry: UnitGeometry,
    dead: BitVec,
    saturated: BitVec,
    signal: ChargeVector,
    truth: TruthTracker,
}

impl DetectorUnit {
    pub fn new(geometry: UnitGeometry, bad_strips: &[BadStripRange]) -> Self {
        let n_strips = geometry.n_strips;
        let mut unit = Self {
            geometry,
            dead: bitvec![0; n_strips],
            saturated: bitvec![0; n_strips],
            signal: ChargeVector::new(n_strips),
            truth: TruthTracker::default(),
        };
        unit.mark_dead(bad_strips);
        unit
    }

    /// Reset the unit to a freshly initialized state with a new set of dead strips
    pub fn reinitialize(&mut self, geometry: UnitGeometry, bad_strips: &[BadStripRange]) {
        *self = Self::new(geometry, bad_strips);
    }

    fn mark_dead(&mut self, bad_strips: &[BadStripRange]) {
        let n_strips = self.geometry.n_strips;
        for bad in bad_strips {
            let first = bad.first_strip.min(n_strips);
            let last = bad.first_strip.saturating_add(bad.range).min(n_strips);
            self.dead[first..last].fill(true);
        }
    }

    pub fn id(&self) -> UnitId {
        self.geometry.id
    }

    pub fn n_strips(&self) -> usize {
        self.geometry.n_strips
    }

    pub fn geometry(&self) -> &UnitGeometry {
        &self.geometry
    }

    pub fn dead(&self) -> &BitSlice {
        self.dead.as_bitslice()
    }

    pub fn saturated(&self) -> &BitSlice {
        self.saturated.as_bitslice()
    }

    pub fn saturated_mut(&mut self) -> &mut BitSlice {
        self.saturated.as_mut_bitslice()
    }

    pub fn signal(&self) -> &ChargeVector {
        &self.signal
    }

    pub fn truth(&self) -> &TruthTracker {
        &self.truth
    }

    pub fn truth_mut(&mut self) -> &mut TruthTracker {
        &mut self.truth
    }

    /// Split borrow used during accumulation, where the charge vector, the
    /// saturation mask and the truth tracker are all updated by the same hit.
    pub fn accumulation_parts(
        &mut self,
    ) -> (&UnitGeometry, &mut ChargeVector, &mut BitSlice, &mut TruthTracker) {
        (
            &self.geometry,
            &mut self.signal,
            self.saturated.as_mut_bitslice(),
            &mut self.truth,
        )
    }

    /// Forget everything from the current event
    pub fn clear_transient(&mut self) {
        self.signal.reset();
        self.truth.clear();
    }

    pub fn clear_saturation(&mut self) {
        self.saturated.fill(false);
    }
}

/// Indexed registry of every initialized unit
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: FxHashMap<UnitId, DetectorUnit>,
}

impl UnitRegistry {
    /// Initialize a unit, or reinitialize it if it is already known
    pub fn initialize(&mut self, geometry: UnitGeometry, bad_strips: &[BadStripRange]) {
        match self.units.get_mut(&geometry.id) {
            Some(unit) => unit.reinitialize(geometry, bad_strips),
            None => {
                self.units
                    .insert(geometry.id, DetectorUnit::new(geometry, bad_strips));
            }
        }
    }

    pub fn get(&self, id: UnitId) -> Result<&DetectorUnit, DigitizerError> {
        self.units
            .get(&id)
            .ok_or(DigitizerError::UnitNotInitialized(id))
    }

    pub fn get_mut(&mut self, id: UnitId) -> Result<&mut DetectorUnit, DigitizerError> {
        self.units
            .get_mut(&id)
            .ok_or(DigitizerError::UnitNotInitialized(id))
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// All unit ids in ascending order
    pub fn ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut DetectorUnit> {
        self.units.values_mut()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(id: UnitId, n_strips: usize) -> UnitGeometry {
        UnitGeometry {
            id,
            n_strips,
            subdetector: Subdetector::Tib,
            position: [0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_dead_strips_are_marked() {
        let unit = DetectorUnit::new(
            geometry(1, 256),
            &[
                BadStripRange {
                    first_strip: 10,
                    range: 3,
                },
                BadStripRange {
                    first_strip: 250,
                    range: 20,
                },
            ],
        );
        assert_eq!(unit.dead().count_ones(), 3 + 6);
        assert!(unit.dead()[10] && unit.dead()[12] && !unit.dead()[13]);
        assert!(unit.dead()[255]);
        assert!(unit.saturated().not_any());
    }

    #[test]
    fn test_bad_strips_near_usize_max() {
        let unit = DetectorUnit::new(
            geometry(1, 256),
            &[
                BadStripRange {
                    first_strip: usize::MAX,
                    range: 1,
                },
                BadStripRange {
                    first_strip: 254,
                    range: usize::MAX,
                },
            ],
        );
        assert_eq!(unit.dead().count_ones(), 2);
        assert!(unit.dead()[254] && unit.dead()[255]);
    }

    #[test]
    fn test_reinitialize_clears_saturation() {
        let mut registry = UnitRegistry::default();
        registry.initialize(geometry(7, 128), &[]);
        registry.get_mut(7).unwrap().saturated_mut().set(5, true);
        assert!(registry.get(7).unwrap().saturated()[5]);

        registry.initialize(geometry(7, 128), &[]);
        assert!(registry.get(7).unwrap().saturated().not_any());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_unit() {
        let registry = UnitRegistry::default();
        assert!(matches!(
            registry.get(3),
            Err(DigitizerError::UnitNotInitialized(3))
        ));
    }

    #[test]
    fn test_global_distance() {
        let mut geo = geometry(1, 128);
        geo.position = [3.0, 0.0, 0.0];
        assert!((geo.global_distance(&[0.0, 4.0, 0.0]) - 5.0).abs() < 1e-6);
    }
}
