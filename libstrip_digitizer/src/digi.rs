use serde::{Deserialize, Serialize};

use super::truth::TruthLink;
use super::unit::UnitId;

/// A zero suppressed strip reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digi {
    pub channel: usize,
    pub adc: u16,
}

/// A raw strip reading; the channel is its position in the readout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDigi {
    pub adc: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readout {
    Suppressed(Vec<Digi>),
    Raw(Vec<RawDigi>),
}

impl Readout {
    pub fn len(&self) -> usize {
        match self {
            Readout::Suppressed(digis) => digis.len(),
            Readout::Raw(digis) => digis.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything produced for one unit by one digitization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizedUnit {
    pub unit: UnitId,
    pub readout: Readout,
    pub links: Vec<TruthLink>,
}
