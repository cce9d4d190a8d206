use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc::Sender;

use super::conditions::FlatConditions;
use super::config::Config;
use super::digi_writer::{DigiEvent, DigiWriter};
use super::digitizer::StripDigitizer;
use super::error::ProcessorError;
use super::hit_file::{HitFile, SimEvent};
use super::sharing::PrecomputedSharing;
use super::unit::UnitId;
use super::worker_status::{Stage, WorkerStatus};

/// Fraction of the events between two progress messages
const FLUSH_FRAC: f32 = 0.01;

/// Calibration of the driver: the flat calibration of the config plus the bad
/// strips declared by the hit file.
fn build_conditions(config: &Config, hit_file: &HitFile) -> FlatConditions {
    let mut conditions = config.calibration.clone();
    for unit in hit_file.units.iter() {
        if unit.bad_strips.is_empty() {
            continue;
        }
        conditions
            .bad_strips
            .entry(unit.geometry.id)
            .or_default()
            .extend(unit.bad_strips.iter().copied());
    }
    conditions
}

/// Run one event through the digitizer.
///
/// Every window is accumulated for each unit it touches, in ascending unit order;
/// the global hit index counts the hits of all previous windows.
pub fn digitize_event(
    digitizer: &mut StripDigitizer,
    event: &SimEvent,
    field: [f32; 3],
    conditions: &FlatConditions,
    rng: &mut StdRng,
) -> Result<DigiEvent, ProcessorError> {
    digitizer.initialize_event();

    let mut first_global_index = 0;
    for window in event.windows.iter() {
        let mut unit_ids: Vec<UnitId> = window.hits.iter().map(|h| h.hit.unit).collect();
        unit_ids.sort_unstable();
        unit_ids.dedup();
        for unit in unit_ids {
            if !digitizer.units().contains(unit) {
                log::warn!(
                    "Event {} has hits on undeclared unit {}, skipping them",
                    event.id,
                    unit
                );
                continue;
            }
            let summary = digitizer.accumulate(
                unit,
                &window.hits,
                first_global_index,
                window.tof_bin,
                field,
                &PrecomputedSharing,
                conditions,
                rng,
            )?;
            if summary.saturating_hits > 0 {
                log::debug!(
                    "Event {} unit {}: {} hits saturated their APVs",
                    event.id,
                    unit,
                    summary.saturating_hits
                );
            }
        }
        first_global_index += window.hits.len();
    }

    let units = digitizer.digitize_all(conditions, rng)?;
    Ok(DigiEvent {
        id: event.id,
        units,
    })
}

/// The main loop of strip_digitizer.
///
/// This takes in a config (and progress monitor), reads the hit file, digitizes
/// every event and writes the digis.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<(), ProcessorError> {
    tx.send(WorkerStatus::new(0.0, 0, Stage::Loading))?;
    log::info!("Reading hits from {}...", config.hit_path.to_string_lossy());
    let hit_file = HitFile::read(&config.hit_path)?;
    let conditions = build_conditions(&config, &hit_file);

    let mut digitizer = StripDigitizer::new(config.digitizer.clone())?;
    for unit in hit_file.units.iter() {
        digitizer.initialize_unit(unit.geometry.clone(), &conditions);
    }
    log::info!("Initialized {} units.", digitizer.units().len());

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut writer = DigiWriter::new(&config.output_path)?;

    let n_events = hit_file.n_events();
    let flush_val = ((n_events as f32 * FLUSH_FRAC) as usize).max(1);
    let mut count = 0;
    let mut progress: f32 = 0.0;

    log::info!("Digitizing {} events...", n_events);
    tx.send(WorkerStatus::new(0.0, 0, Stage::Digitizing))?;
    for (idx, event) in hit_file.events.iter().enumerate() {
        let digi_event = digitize_event(
            &mut digitizer,
            event,
            config.magnetic_field,
            &conditions,
            &mut rng,
        )?;
        writer.write_event(&digi_event)?;

        count += 1;
        if count >= flush_val {
            count = 0;
            progress = (idx + 1) as f32 / n_events as f32;
            tx.send(WorkerStatus::new(progress, idx + 1, Stage::Digitizing))?;
        }
    }
    log::debug!("Last progress update at {progress}");

    tx.send(WorkerStatus::new(1.0, n_events, Stage::Writing))?;
    writer.close()?;
    log::info!(
        "Done digitizing. Output written to {}",
        config.output_path.to_string_lossy()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::StripThreshold;
    use crate::config::DigitizerConfig;
    use crate::digi::Readout;
    use crate::digi_writer::read_digi_events;
    use std::sync::mpsc::channel;

    const HITS: &str = r#"
units:
- id: 20
  n_strips: 256
  subdetector: tec
  bad_strips:
  - first_strip: 30
    range: 1
- id: 10
  n_strips: 512
events:
- id: 0
  windows:
  - tof_bin: 0
    hits:
    - unit: 20
      particle_id: 1
      origin_id: 0
      tof: 1.0
      energy_loss: 0.0002
      local_position: [0.0, 0.0, 0.0]
      deposits:
      - channel: 30
        charge: 40000.0
      - channel: 31
        charge: 20000.0
    - unit: 10
      particle_id: 2
      origin_id: 0
      tof: 1.0
      energy_loss: 0.0002
      local_position: [0.0, 0.0, 0.0]
      deposits:
      - channel: 5
        charge: 24700.0
  - tof_bin: 1
    hits:
    - unit: 10
      particle_id: 2
      origin_id: 0
      tof: 1.0
      energy_loss: 0.0002
      local_position: [0.0, 0.0, 0.0]
      deposits:
      - channel: 5
        charge: 2470.0
    - unit: 99
      particle_id: 4
      origin_id: 0
      tof: 1.0
      energy_loss: 0.0002
      local_position: [0.0, 0.0, 0.0]
- id: 1
"#;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.digitizer = DigitizerConfig {
            noise: false,
            common_mode_noise: false,
            baseline_shift: false,
            ..Default::default()
        };
        config.calibration = FlatConditions {
            noise: 0.0,
            threshold: StripThreshold {
                low: 0.0,
                high: 0.0,
            },
            ..Default::default()
        };
        config
    }

    #[test]
    fn test_digitize_event() {
        let config = quiet_config();
        let hit_file = HitFile::parse(HITS).unwrap();
        let conditions = build_conditions(&config, &hit_file);
        let mut digitizer = StripDigitizer::new(config.digitizer.clone()).unwrap();
        for unit in hit_file.units.iter() {
            digitizer.initialize_unit(unit.geometry.clone(), &conditions);
        }
        let mut rng = StdRng::seed_from_u64(config.seed);

        let event = digitize_event(
            &mut digitizer,
            &hit_file.events[0],
            config.magnetic_field,
            &conditions,
            &mut rng,
        )
        .unwrap();

        // Units come out in id order
        assert_eq!(event.units.len(), 2);
        assert_eq!(event.units[0].unit, 10);
        assert_eq!(event.units[1].unit, 20);

        // Both windows pile up on channel 5: (24700 + 2470) / 247 = 110
        let Readout::Suppressed(digis) = &event.units[0].readout else {
            panic!("expected zero suppressed readout");
        };
        assert_eq!(digis.len(), 1);
        assert_eq!(digis[0].channel, 5);
        assert_eq!(digis[0].adc, 110);
        let links = &event.units[0].links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].global_index, 1);
        assert_eq!(links[0].tof_bin, 0);

        // Strip 30 of unit 20 is dead
        let Readout::Suppressed(digis) = &event.units[1].readout else {
            panic!("expected zero suppressed readout");
        };
        assert_eq!(digis.len(), 1);
        assert_eq!(digis[0].channel, 31);
        assert_eq!(event.units[1].links.len(), 1);
        assert_eq!(event.units[1].links[0].channel, 31);

        // Nothing left over for the next (empty) event
        let event = digitize_event(
            &mut digitizer,
            &hit_file.events[1],
            config.magnetic_field,
            &conditions,
            &mut rng,
        )
        .unwrap();
        assert!(event.units.iter().all(|u| u.readout.is_empty()));
        assert!(event.units.iter().all(|u| u.links.is_empty()));
    }

    #[test]
    fn test_process() {
        let dir = std::env::temp_dir().join(format!("strip_digitizer_process_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let hit_path = dir.join("hits.yml");
        std::fs::write(&hit_path, HITS).unwrap();

        let mut config = quiet_config();
        config.hit_path = hit_path;
        config.output_path = dir.join("digis.yml");
        let (tx, rx) = channel();
        process(config.clone(), tx).unwrap();

        let statuses: Vec<WorkerStatus> = rx.try_iter().collect();
        assert_eq!(statuses.first().unwrap().stage, Stage::Loading);
        let last = statuses.last().unwrap();
        assert_eq!(last.progress, 1.0);
        assert_eq!(last.events_done, 2);

        let events = read_digi_events(&config.output_path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, 0);
        assert_eq!(events[1].id, 1);
    }

    #[test]
    fn test_missing_hit_file() {
        let mut config = quiet_config();
        config.hit_path = "/not/a/hit_file.yml".into();
        let (tx, _rx) = channel();
        assert!(matches!(
            process(config, tx),
            Err(ProcessorError::HitFileError(_))
        ));
    }
}
