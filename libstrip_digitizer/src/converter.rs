use super::constants::*;

/// Converts analog amplitudes (electrons) to ADC counts.
///
/// The amplitude is multiplied by the strip gain before conversion, and rounded
/// to the nearest count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitalConverter {
    electron_per_adc: f32,
    premixing: bool,
}

impl DigitalConverter {
    pub fn new(electron_per_adc: f32, premixing: bool) -> Self {
        Self {
            electron_per_adc,
            premixing,
        }
    }

    fn to_counts(&self, amplitude: f32, gain: f32) -> i32 {
        (gain * amplitude / self.electron_per_adc + 0.5).floor() as i32
    }

    /// 8-bit compressed value used by the zero suppressed readout, or the plain
    /// 10-bit value when producing premixing input.
    fn truncate(&self, adc: i32) -> u16 {
        if self.premixing {
            return adc.clamp(0, ADC_MAX_RAW as i32) as u16;
        }
        if adc > ADC_ZS_OVERFLOW_LIMIT {
            return ADC_ZS_OVERFLOW;
        }
        if adc > ADC_ZS_SATURATION_LIMIT {
            return ADC_ZS_SATURATED;
        }
        adc.max(0) as u16
    }

    /// Conversion for the zero suppressed path. Channels with a non positive
    /// amplitude read 0. `gains` is indexed by strip.
    pub fn convert(&self, amplitudes: &[f32], gains: &[f32]) -> Vec<u16> {
        amplitudes
            .iter()
            .zip(gains.iter())
            .map(|(&amplitude, &gain)| {
                if amplitude <= 0.0 {
                    0
                } else {
                    self.truncate(self.to_counts(amplitude, gain))
                }
            })
            .collect()
    }

    /// Conversion for the raw path: every channel, clamped to [0, 1023]
    pub fn convert_raw(&self, amplitudes: &[f32], gains: &[f32]) -> Vec<u16> {
        amplitudes
            .iter()
            .zip(gains.iter())
            .map(|(&amplitude, &gain)| {
                self.to_counts(amplitude, gain)
                    .clamp(0, ADC_MAX_RAW as i32) as u16
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_suppressed_compression() {
        let converter = DigitalConverter::new(250.0, false);
        let amplitudes = [-100.0, 0.0, 374.0, 376.0, 253.0 * 250.0, 254.0 * 250.0, 2000.0 * 250.0];
        let gains = [1.0; 7];
        assert_eq!(
            converter.convert(&amplitudes, &gains),
            vec![0, 0, 1, 2, 253, 254, 255]
        );
    }

    #[test]
    fn test_premixing_keeps_ten_bits() {
        let converter = DigitalConverter::new(250.0, true);
        let amplitudes = [600.0 * 250.0, 5000.0 * 250.0];
        assert_eq!(converter.convert(&amplitudes, &[1.0, 1.0]), vec![600, 1023]);
    }

    #[test]
    fn test_gain_is_applied() {
        let converter = DigitalConverter::new(100.0, false);
        assert_eq!(converter.convert(&[1000.0], &[0.5]), vec![5]);
        assert_eq!(converter.convert_raw(&[1000.0], &[2.0]), vec![20]);
    }

    #[test]
    fn test_raw_clamps() {
        let converter = DigitalConverter::new(100.0, false);
        assert_eq!(
            converter.convert_raw(&[-500.0, 49.0, 51.0, 1.0e7], &[1.0; 4]),
            vec![0, 0, 1, 1023]
        );
    }
}
