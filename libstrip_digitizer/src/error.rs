use std::path::PathBuf;
use thiserror::Error;

use super::unit::UnitId;
use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has efficiency {0} which is outside of [0, 1]")]
    InvalidEfficiency(f32),
    #[error("Config has electron per ADC {0}; must be greater than zero")]
    InvalidElectronPerAdc(f32),
    #[error("Config requested unknown FED zero suppression algorithm {0}; expected 1 through 5")]
    UnknownFedAlgorithm(u8),
}

#[derive(Debug, Error)]
pub enum SaturationTableError {
    #[error("Could not open APV probability file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("APV probability file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("APV probability file has an invalid unit id on line {0}: {1}")]
    BadUnitId(usize, std::num::ParseIntError),
    #[error("APV probability file has an invalid probability on line {0}: {1}")]
    BadProbability(usize, std::num::ParseFloatError),
}

#[derive(Debug, Error)]
pub enum DigitizerError {
    #[error("Digitizer failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Digitizer failed to load the APV saturation table: {0}")]
    SaturationTableError(#[from] SaturationTableError),
    #[error("APV saturation from HIP is enabled but no APV probability file was given")]
    MissingProbabilityFile,
    #[error("Digitizer was asked to process unit {0} which was never initialized")]
    UnitNotInitialized(UnitId),
    #[error("Charge sharing produced channel {channel} on unit {unit} which only has {n_strips} strips")]
    ChannelOutOfRange {
        unit: UnitId,
        channel: usize,
        n_strips: usize,
    },
}

#[derive(Debug, Error)]
pub enum HitFileError {
    #[error("Could not open hit file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Hit file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Hit file failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Hit file declares unit {0} more than once")]
    DuplicateUnit(UnitId),
}

#[derive(Debug, Error)]
pub enum DigiWriterError {
    #[error("DigiWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("DigiWriter failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Digitizer error: {0}")]
    DigitizerError(#[from] DigitizerError),
    #[error("Processor failed due to HitFile error: {0}")]
    HitFileError(#[from] HitFileError),
    #[error("Processor failed due to DigiWriter error: {0}")]
    DigiWriterError(#[from] DigiWriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
