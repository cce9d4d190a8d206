use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::conditions::FlatConditions;
use super::error::ConfigError;
use super::unit::{SaturationReset, Subdetector};
use super::zero_suppression::FedAlgorithm;

/// Common mode noise RMS per tracker region, in ADC counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommonModeRms {
    pub tib: f32,
    pub tid: f32,
    pub tob: f32,
    pub tec: f32,
}

impl Default for CommonModeRms {
    fn default() -> Self {
        Self {
            tib: 5.92,
            tid: 3.08,
            tob: 1.08,
            tec: 2.44,
        }
    }
}

impl CommonModeRms {
    pub fn for_subdetector(&self, subdetector: Subdetector) -> f32 {
        match subdetector {
            Subdetector::Tib => self.tib,
            Subdetector::Tid => self.tid,
            Subdetector::Tob => self.tob,
            Subdetector::Tec => self.tec,
            Subdetector::Other => 0.0,
        }
    }
}

/// The digitizer settings. Fixed once the digitizer is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizerConfig {
    /// APV readout mode; peak if true, deconvolution otherwise
    pub peak_mode: bool,
    pub zero_suppression: bool,
    pub fed_algorithm: FedAlgorithm,
    /// Master switch for the strip noise
    pub noise: bool,
    /// Per-strip noise from the conditions, otherwise the noise of a reference strip
    pub single_strip_noise: bool,
    pub common_mode_noise: bool,
    pub real_pedestals: bool,
    pub baseline_shift: bool,
    pub apv_saturation_from_hip: bool,
    pub apv_probability_file: Option<PathBuf>,
    pub apv_saturation_prob_scaling: f64,
    pub saturation_reset: SaturationReset,
    pub make_digi_sim_links: bool,
    /// Probability that the readout of one accumulation pass is efficient
    pub efficiency: f32,
    pub electron_per_adc_peak: f32,
    pub electron_per_adc_dec: f32,
    pub tof_cut_for_peak: f32,
    pub tof_cut_for_deconvolution: f32,
    pub cosmic_delay_shift: f32,
    /// Threshold, in units of noise, used to generate noise outside of the signal region
    pub noise_sigma_threshold: f32,
    pub cmn_rms: CommonModeRms,
    /// Constant added to the pedestals, in ADC counts
    pub pedestal_offset: u32,
    pub premixing: bool,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            peak_mode: false,
            zero_suppression: true,
            fed_algorithm: FedAlgorithm::Cluster,
            noise: true,
            single_strip_noise: true,
            common_mode_noise: true,
            real_pedestals: true,
            baseline_shift: true,
            apv_saturation_from_hip: false,
            apv_probability_file: None,
            apv_saturation_prob_scaling: 1.0,
            saturation_reset: SaturationReset::PerRun,
            make_digi_sim_links: true,
            efficiency: 1.0,
            electron_per_adc_peak: 262.0,
            electron_per_adc_dec: 247.0,
            tof_cut_for_peak: 100.0,
            tof_cut_for_deconvolution: 50.0,
            cosmic_delay_shift: 0.0,
            noise_sigma_threshold: 2.0,
            cmn_rms: CommonModeRms::default(),
            pedestal_offset: 128,
            premixing: false,
        }
    }
}

impl DigitizerConfig {
    pub fn electron_per_adc(&self) -> f32 {
        if self.peak_mode {
            self.electron_per_adc_peak
        } else {
            self.electron_per_adc_dec
        }
    }

    pub fn tof_cut(&self) -> f32 {
        if self.peak_mode {
            self.tof_cut_for_peak
        } else {
            self.tof_cut_for_deconvolution
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.efficiency) {
            return Err(ConfigError::InvalidEfficiency(self.efficiency));
        }
        let electron_per_adc = self.electron_per_adc();
        if electron_per_adc.is_nan() || electron_per_adc <= 0.0 {
            return Err(ConfigError::InvalidElectronPerAdc(electron_per_adc));
        }
        Ok(())
    }
}

/// Structure representing the application configuration. Contains pathing, the
/// random seed, the field, the calibration used by the driver and the digitizer settings.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub hit_path: PathBuf,
    pub output_path: PathBuf,
    pub seed: u64,
    /// Magnetic field at the detector units, in T
    pub magnetic_field: [f32; 3],
    pub calibration: FlatConditions,
    pub digitizer: DigitizerConfig,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            hit_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            seed: 0,
            magnetic_field: [0.0, 0.0, 3.8],
            calibration: FlatConditions::default(),
            digitizer: DigitizerConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.digitizer.validate()?;
        Ok(config)
    }

    pub fn does_hit_file_exist(&self) -> bool {
        self.hit_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_dependent_values() {
        let mut config = DigitizerConfig::default();
        assert_eq!(config.electron_per_adc(), 247.0);
        assert_eq!(config.tof_cut(), 50.0);
        config.peak_mode = true;
        assert_eq!(config.electron_per_adc(), 262.0);
        assert_eq!(config.tof_cut(), 100.0);
    }

    #[test]
    fn test_validate() {
        let mut config = DigitizerConfig::default();
        assert!(config.validate().is_ok());
        config.efficiency = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEfficiency(_))
        ));
        config.efficiency = 0.5;
        config.electron_per_adc_dec = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidElectronPerAdc(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip_of_template() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.digitizer, DigitizerConfig::default());
        assert_eq!(config.calibration, FlatConditions::default());
    }

    #[test]
    fn test_partial_digitizer_section() {
        let yaml = "zero_suppression: false\nfed_algorithm: 3\nsaturation_reset: per_event\n";
        let config: DigitizerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.zero_suppression);
        assert_eq!(config.fed_algorithm, FedAlgorithm::HighNeighbour);
        assert_eq!(config.saturation_reset, SaturationReset::PerEvent);
        assert_eq!(config.pedestal_offset, 128);
    }

    #[test]
    fn test_bad_fed_algorithm() {
        let result = serde_yaml::from_str::<DigitizerConfig>("fed_algorithm: 8\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::read_config_file(Path::new("/not/a/config.yml"));
        assert!(matches!(result, Err(ConfigError::BadFilePath(_))));
    }
}
