use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::HitFileError;
use super::hit::RecordedHit;
use super::unit::{BadStripRange, UnitGeometry, UnitId};

/// A detector unit as declared in a hit file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDescription {
    #[serde(flatten)]
    pub geometry: UnitGeometry,
    #[serde(default)]
    pub bad_strips: Vec<BadStripRange>,
}

/// The hits of one time window (bunch crossing) of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowHits {
    pub tof_bin: u32,
    #[serde(default)]
    pub hits: Vec<RecordedHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub id: u64,
    #[serde(default)]
    pub windows: Vec<TimeWindowHits>,
}

impl SimEvent {
    /// Number of hits over all windows
    pub fn n_hits(&self) -> usize {
        self.windows.iter().map(|w| w.hits.len()).sum()
    }
}

/// Input of the command line driver: the detector units and the simulated events.
///
/// In the YAML format a hit carries its unit, particle, time of flight, energy
/// loss, local position and the per-channel deposits of the charge sharing:
///
/// ```yml
/// units:
/// - id: 436228134
///   n_strips: 768
///   subdetector: tib
///   position: [25.0, 0.0, 10.0]
///   bad_strips:
///   - first_strip: 12
///     range: 2
/// events:
/// - id: 0
///   windows:
///   - tof_bin: 0
///     hits:
///     - unit: 436228134
///       particle_id: 3
///       origin_id: 0
///       tof: 1.2
///       energy_loss: 0.0001
///       local_position: [0.1, 0.3, 0.0]
///       deposits:
///       - channel: 100
///         charge: 12000.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitFile {
    pub units: Vec<UnitDescription>,
    #[serde(default)]
    pub events: Vec<SimEvent>,
}

impl HitFile {
    /// Read a hit file. Units must be declared only once.
    pub fn read(path: &Path) -> Result<Self, HitFileError> {
        if !path.exists() {
            return Err(HitFileError::BadFilePath(path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(path)?;
        let hit_file = Self::parse(&yaml_str)?;
        log::info!(
            "Read {} units and {} events from {}",
            hit_file.units.len(),
            hit_file.events.len(),
            path.to_string_lossy()
        );
        Ok(hit_file)
    }

    pub fn parse(yaml_str: &str) -> Result<Self, HitFileError> {
        let hit_file: Self = serde_yaml::from_str(yaml_str)?;
        let mut seen: FxHashSet<UnitId> = FxHashSet::default();
        for unit in hit_file.units.iter() {
            if !seen.insert(unit.geometry.id) {
                return Err(HitFileError::DuplicateUnit(unit.geometry.id));
            }
        }
        Ok(hit_file)
    }

    pub fn n_events(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Subdetector;

    const HITS: &str = r#"
units:
- id: 7
  n_strips: 512
  subdetector: tob
  position: [60.0, 0.0, 0.0]
  bad_strips:
  - first_strip: 12
    range: 2
- id: 8
  n_strips: 768
events:
- id: 0
  windows:
  - tof_bin: 0
    hits:
    - unit: 7
      particle_id: 3
      origin_id: 0
      tof: 2.1
      energy_loss: 0.0001
      local_position: [0.1, 0.3, 0.0]
      deposits:
      - channel: 100
        charge: 12000.0
      - channel: 101
        charge: 3000.0
  - tof_bin: 1
- id: 1
"#;

    #[test]
    fn test_parse() {
        let hit_file = HitFile::parse(HITS).unwrap();
        assert_eq!(hit_file.units.len(), 2);
        assert_eq!(hit_file.units[0].geometry.subdetector, Subdetector::Tob);
        assert_eq!(hit_file.units[0].bad_strips.len(), 1);
        assert_eq!(hit_file.units[1].geometry.subdetector, Subdetector::Other);
        assert!(hit_file.units[1].bad_strips.is_empty());

        assert_eq!(hit_file.n_events(), 2);
        let event = &hit_file.events[0];
        assert_eq!(event.windows.len(), 2);
        assert_eq!(event.n_hits(), 1);
        let hit = &event.windows[0].hits[0];
        assert_eq!(hit.hit.unit, 7);
        assert_eq!(hit.deposits[1].charge, 3000.0);
        assert!(hit_file.events[1].windows.is_empty());
    }

    #[test]
    fn test_duplicate_unit() {
        let yaml = "units:\n- id: 4\n  n_strips: 10\n- id: 4\n  n_strips: 20\n";
        assert!(matches!(
            HitFile::parse(yaml),
            Err(HitFileError::DuplicateUnit(4))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HitFile::read(Path::new("/not/a/hit_file.yml")),
            Err(HitFileError::BadFilePath(_))
        ));
    }
}
