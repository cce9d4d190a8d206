//! Zero suppression as done by the front-end driver (FED) firmware.
//!
//! Thresholds are given per strip in units of the strip noise, the ADC counts
//! are compared against `threshold * noise`.
use serde::{Deserialize, Serialize};

use super::conditions::StripThreshold;
use super::digi::Digi;
use super::error::ConfigError;

/// Identifier of the zero suppression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FedAlgorithm {
    /// Keep strips above the high threshold
    HighThreshold = 1,
    /// Keep strips above the low threshold
    LowThreshold = 2,
    /// Keep strips above the high threshold, or above the low threshold next to
    /// a strip above its high threshold
    HighNeighbour = 3,
    /// Keep strips above the high threshold, or pairs of adjacent strips above
    /// the low threshold
    #[default]
    Cluster = 4,
    /// Keep every strip with a positive reading
    Positive = 5,
}

impl TryFrom<u8> for FedAlgorithm {
    type Error = ConfigError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::HighThreshold),
            2 => Ok(Self::LowThreshold),
            3 => Ok(Self::HighNeighbour),
            4 => Ok(Self::Cluster),
            5 => Ok(Self::Positive),
            _ => Err(ConfigError::UnknownFedAlgorithm(value)),
        }
    }
}

impl From<FedAlgorithm> for u8 {
    fn from(value: FedAlgorithm) -> Self {
        value as u8
    }
}

/// ADC thresholds of a single strip
#[derive(Debug, Clone, Copy, Default)]
struct Levels {
    adc: f32,
    low: f32,
    high: f32,
}

impl Levels {
    fn above_low(&self) -> bool {
        self.adc > 0.0 && self.adc >= self.low
    }

    fn above_high(&self) -> bool {
        self.adc > 0.0 && self.adc >= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroSuppression {
    algorithm: FedAlgorithm,
}

impl ZeroSuppression {
    pub fn new(algorithm: FedAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Keep the strips which pass the algorithm. `adcs`, `noise` and `thresholds`
    /// are indexed by strip.
    pub fn suppress(
        &self,
        adcs: &[u16],
        noise: &[f32],
        thresholds: &[StripThreshold],
    ) -> Vec<Digi> {
        let levels: Vec<Levels> = adcs
            .iter()
            .zip(noise.iter())
            .zip(thresholds.iter())
            .map(|((&adc, &noise), threshold)| Levels {
                adc: adc as f32,
                low: threshold.low * noise,
                high: threshold.high * noise,
            })
            .collect();

        levels
            .iter()
            .enumerate()
            .filter(|(strip, _)| self.is_valid(&levels, *strip))
            .map(|(strip, _)| Digi {
                channel: strip,
                adc: adcs[strip],
            })
            .collect()
    }

    fn is_valid(&self, levels: &[Levels], strip: usize) -> bool {
        let this = levels[strip];
        if this.adc <= 0.0 {
            return false;
        }
        // Outside the unit counts as an empty strip
        let at = |offset: isize| -> Levels {
            strip
                .checked_add_signed(offset)
                .and_then(|s| levels.get(s))
                .copied()
                .unwrap_or_default()
        };
        match self.algorithm {
            FedAlgorithm::HighThreshold => this.above_high(),
            FedAlgorithm::LowThreshold => this.above_low(),
            FedAlgorithm::HighNeighbour => {
                this.above_high()
                    || (this.above_low() && (at(-1).above_high() || at(1).above_high()))
            }
            FedAlgorithm::Cluster => {
                this.above_high()
                    || (this.above_low() && (at(-1).above_low() || at(1).above_low()))
            }
            FedAlgorithm::Positive => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TH: StripThreshold = StripThreshold {
        low: 2.0,
        high: 5.0,
    };

    // noise 1 => low 2, high 5
    fn run(algorithm: FedAlgorithm, adcs: &[u16]) -> Vec<usize> {
        let noise = vec![1.0; adcs.len()];
        let thresholds = vec![TH; adcs.len()];
        ZeroSuppression::new(algorithm)
            .suppress(adcs, &noise, &thresholds)
            .into_iter()
            .map(|d| d.channel)
            .collect()
    }

    #[test]
    fn test_algorithm_ids() {
        assert_eq!(FedAlgorithm::try_from(4).unwrap(), FedAlgorithm::Cluster);
        assert_eq!(u8::from(FedAlgorithm::HighNeighbour), 3);
        assert!(matches!(
            FedAlgorithm::try_from(9),
            Err(ConfigError::UnknownFedAlgorithm(9))
        ));
    }

    #[test]
    fn test_high_and_low() {
        let adcs = [0, 3, 6, 1, 2, 0];
        assert_eq!(run(FedAlgorithm::HighThreshold, &adcs), vec![2]);
        assert_eq!(run(FedAlgorithm::LowThreshold, &adcs), vec![1, 2, 4]);
        assert_eq!(run(FedAlgorithm::Positive, &adcs), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_high_neighbour() {
        let adcs = [3, 6, 1, 0, 3, 0];
        assert_eq!(run(FedAlgorithm::HighNeighbour, &adcs), vec![0, 1]);
    }

    #[test]
    fn test_cluster_rule() {
        // lone low strips dropped, low pairs and triplets kept
        let adcs = [0, 3, 0, 0, 3, 3, 0, 0, 3, 1, 0, 3, 3, 3, 0, 7];
        assert_eq!(
            run(FedAlgorithm::Cluster, &adcs),
            vec![4, 5, 11, 12, 13, 15]
        );
    }

    #[test]
    fn test_zero_noise_threshold() {
        // Without noise every positive strip passes
        let adcs = [0, 1, 2];
        let kept = ZeroSuppression::new(FedAlgorithm::Cluster).suppress(
            &adcs,
            &[0.0; 3],
            &[TH; 3],
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], Digi { channel: 1, adc: 1 });
    }
}
