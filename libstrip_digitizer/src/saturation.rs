//! Emulation of APV saturation caused by highly ionizing particles (HIP).
//!
//! The probability for a unit to have a HIP in an event is computed offline
//! (crossing probability, module thickness, path length and the APV recovery
//! time all go into it) and stored per unit in a two column text file:
//!
//! ```text
//! <unit id> <probability>
//! ```
//!
//! Here we only draw against that probability, hit by hit.
use bitvec::slice::BitSlice;
use fxhash::FxHashMap;
use rand::Rng;
use std::path::Path;

use super::constants::APV_CHANNELS;
use super::error::SaturationTableError;
use super::unit::UnitId;

/// Unit id -> base saturation probability
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApvProbabilityTable {
    map: FxHashMap<UnitId, f64>,
}

impl ApvProbabilityTable {
    /// Load the table from a file. A missing file is an error.
    pub fn from_file(path: &Path) -> Result<Self, SaturationTableError> {
        if !path.exists() {
            return Err(SaturationTableError::BadFilePath(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let table = Self::parse(&contents)?;
        log::info!(
            "Loaded {} APV saturation probabilities from {}",
            table.len(),
            path.to_string_lossy()
        );
        Ok(table)
    }

    /// Parse the text format. Only lines with exactly two space separated entries are
    /// read; everything else (headers, blank lines) is skipped.
    pub fn parse(contents: &str) -> Result<Self, SaturationTableError> {
        let mut table = Self::default();
        for (idx, line) in contents.lines().enumerate() {
            let entries: Vec<&str> = line.split(' ').collect();
            if entries.len() != 2 {
                continue;
            }
            let unit: UnitId = entries[0]
                .trim()
                .parse()
                .map_err(|e| SaturationTableError::BadUnitId(idx + 1, e))?;
            let probability: f64 = entries[1]
                .trim()
                .parse()
                .map_err(|e| SaturationTableError::BadProbability(idx + 1, e))?;
            table.map.insert(unit, probability);
        }
        Ok(table)
    }

    pub fn insert(&mut self, unit: UnitId, probability: f64) {
        self.map.insert(unit, probability);
    }

    pub fn probability(&self, unit: UnitId) -> Option<f64> {
        self.map.get(&unit).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Range of channels `[first, last)` covered by the APVs spanned by `[first, last)`,
/// clamped to the unit size. Empty footprints give an empty range.
pub fn apv_span(first: usize, last: usize, n_strips: usize) -> std::ops::Range<usize> {
    let first = first.min(n_strips);
    let last = last.min(n_strips);
    if first >= last {
        return 0..0;
    }
    let first_apv = first / APV_CHANNELS;
    let last_apv = (last - 1) / APV_CHANNELS;
    let start = (first_apv * APV_CHANNELS).min(n_strips);
    let end = ((last_apv + 1) * APV_CHANNELS).min(n_strips);
    start..end
}

#[derive(Debug, Clone)]
pub struct ApvSaturationEmulator {
    table: ApvProbabilityTable,
    scaling: f64,
}

impl ApvSaturationEmulator {
    pub fn new(table: ApvProbabilityTable, scaling: f64) -> Self {
        Self { table, scaling }
    }

    /// Draw for one accepted hit with footprint `[first, last)`. On success every
    /// channel of the spanned APVs is flagged in `saturated`.
    ///
    /// Units without a table entry and empty footprints consume no random number.
    /// Returns whether the hit saturated its APVs.
    pub fn emulate<R: Rng + ?Sized>(
        &self,
        unit: UnitId,
        first: usize,
        last: usize,
        saturated: &mut BitSlice,
        rng: &mut R,
    ) -> bool {
        let Some(probability) = self.table.probability(unit) else {
            return false;
        };
        let span = apv_span(first, last, saturated.len());
        if span.is_empty() || rng.random::<f64>() >= probability * self.scaling {
            return false;
        }
        saturated[span].fill(true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_table() {
        let table = ApvProbabilityTable::parse("369120277 0.25\n# comment line here\n\n470065830 1e-3\n")
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.probability(369120277), Some(0.25));
        assert_eq!(table.probability(470065830), Some(1e-3));
        assert_eq!(table.probability(1), None);
    }

    #[test]
    fn test_parse_bad_probability() {
        let result = ApvProbabilityTable::parse("12 abc\n");
        assert!(matches!(
            result,
            Err(SaturationTableError::BadProbability(1, _))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ApvProbabilityTable::from_file(Path::new("/definitely/not/here.txt"));
        assert!(matches!(result, Err(SaturationTableError::BadFilePath(_))));
    }

    #[test]
    fn test_apv_span() {
        assert_eq!(apv_span(100, 106, 768), 0..128);
        assert_eq!(apv_span(120, 140, 768), 0..256);
        assert_eq!(apv_span(128, 129, 768), 128..256);
        assert_eq!(apv_span(700, 768, 768), 640..768);
        assert_eq!(apv_span(10, 10, 768), 0..0);
        assert_eq!(apv_span(usize::MAX - 1, usize::MAX, 768), 0..0);
        assert_eq!(apv_span(700, usize::MAX, 768), 640..768);
    }

    #[test]
    fn test_empty_footprint_does_not_saturate() {
        let mut table = ApvProbabilityTable::default();
        table.insert(5, 1.0);
        let emulator = ApvSaturationEmulator::new(table, 1.0);
        let mut saturated = bitvec![0; 256];
        let mut rng = StdRng::seed_from_u64(3);
        let mut reference = rng.clone();

        assert!(!emulator.emulate(5, 40, 40, &mut saturated, &mut rng));
        assert!(!emulator.emulate(5, 300, 310, &mut saturated, &mut rng));
        assert!(saturated.not_any());
        assert_eq!(rng.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn test_certain_saturation() {
        let mut table = ApvProbabilityTable::default();
        table.insert(5, 1.0);
        let emulator = ApvSaturationEmulator::new(table, 1.0);
        let mut saturated = bitvec![0; 512];
        let mut rng = StdRng::seed_from_u64(3);

        assert!(emulator.emulate(5, 130, 140, &mut saturated, &mut rng));
        assert_eq!(saturated.count_ones(), 128);
        assert!(saturated[128] && saturated[255] && !saturated[127] && !saturated[256]);
    }

    #[test]
    fn test_no_entry_or_zero_scaling() {
        let mut table = ApvProbabilityTable::default();
        table.insert(5, 1.0);
        let emulator = ApvSaturationEmulator::new(table.clone(), 0.0);
        let mut saturated = bitvec![0; 256];
        let mut rng = StdRng::seed_from_u64(3);

        assert!(!emulator.emulate(5, 0, 10, &mut saturated, &mut rng));
        let emulator = ApvSaturationEmulator::new(table, 1.0);
        assert!(!emulator.emulate(6, 0, 10, &mut saturated, &mut rng));
        assert!(saturated.not_any());
    }
}
