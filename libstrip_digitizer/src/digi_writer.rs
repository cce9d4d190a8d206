use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::digi::DigitizedUnit;
use super::error::DigiWriterError;

/// Digitizer output of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigiEvent {
    pub id: u64,
    pub units: Vec<DigitizedUnit>,
}

/// Writes digitized events to a YAML file, one document per event.
///
/// Events are written as they come, so the file can be read back with any
/// multi-document YAML reader (see [`read_digi_events`]).
#[derive(Debug)]
pub struct DigiWriter {
    writer: BufWriter<File>,
    events_written: u64,
    digis_written: u64,
}

impl DigiWriter {
    /// Create the writer, truncating any file at path
    pub fn new(path: &Path) -> Result<Self, DigiWriterError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            events_written: 0,
            digis_written: 0,
        })
    }

    pub fn write_event(&mut self, event: &DigiEvent) -> Result<(), DigiWriterError> {
        let yaml_str = serde_yaml::to_string(event)?;
        self.writer.write_all(b"---\n")?;
        self.writer.write_all(yaml_str.as_bytes())?;
        self.events_written += 1;
        self.digis_written += event
            .units
            .iter()
            .map(|unit| unit.readout.len() as u64)
            .sum::<u64>();
        Ok(())
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    /// Flush and close the file
    pub fn close(mut self) -> Result<(), DigiWriterError> {
        self.writer.flush()?;
        log::info!(
            "Wrote {} events ({} digis)",
            self.events_written,
            self.digis_written
        );
        Ok(())
    }
}

/// Read back every event of a file produced by [`DigiWriter`]
pub fn read_digi_events(path: &Path) -> Result<Vec<DigiEvent>, DigiWriterError> {
    let yaml_str = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&yaml_str) {
        events.push(DigiEvent::deserialize(document)?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digi::{Digi, RawDigi, Readout};
    use crate::truth::TruthLink;

    #[test]
    fn test_write_and_read_back() {
        let path = std::env::temp_dir().join(format!(
            "strip_digitizer_writer_test_{}.yml",
            std::process::id()
        ));
        let events = vec![
            DigiEvent {
                id: 0,
                units: vec![DigitizedUnit {
                    unit: 12,
                    readout: Readout::Suppressed(vec![Digi {
                        channel: 4,
                        adc: 31,
                    }]),
                    links: vec![TruthLink {
                        channel: 4,
                        particle_id: 2,
                        global_index: 0,
                        tof_bin: 0,
                        origin_id: 0,
                        weight: 1.0,
                    }],
                }],
            },
            DigiEvent {
                id: 1,
                units: vec![DigitizedUnit {
                    unit: 12,
                    readout: Readout::Raw(vec![RawDigi { adc: 128 }; 3]),
                    links: Vec::new(),
                }],
            },
        ];

        let mut writer = DigiWriter::new(&path).unwrap();
        for event in events.iter() {
            writer.write_event(event).unwrap();
        }
        assert_eq!(writer.events_written(), 2);
        writer.close().unwrap();

        let read_back = read_digi_events(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read_back, events);
    }
}
