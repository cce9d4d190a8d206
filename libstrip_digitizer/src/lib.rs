//! # strip_digitizer
//!
//! strip_digitizer is a silicon strip tracker digitizer, written in Rust. It takes
//! simulated energy deposits (hits) on strip detector units and produces what the
//! readout electronics would report for them: zero suppressed or raw ADC readings
//! per channel, and links from each reading back to the simulated particles which
//! made it.
//!
//! ## Overview
//!
//! For every event, hits are accumulated per detector unit and per time window
//! (pileup). Each accepted hit is spread over the strips by a charge sharing model
//! supplied by the caller, and may saturate the APV readout chips it touches.
//! Once all windows are accumulated, each unit is digitized:
//!
//! - dead strips are zeroed and saturated strips lose a random fraction of their charge
//! - noise is added; strip noise, common mode noise per APV, baseline shift and
//!   pedestals for the raw readout, strip noise only for the zero suppressed readout
//! - amplitudes are converted to ADC counts with the gain of each strip
//! - the zero suppressed readout keeps the strips passing the FED algorithm
//! - truth links are emitted for the strips kept, one per particle, weighted by its
//!   share of the strip charge
//!
//! The library is generic over the calibration ([`conditions::Conditions`]) and the
//! charge sharing ([`sharing::ChargeSharing`]). All randomness comes from a generator
//! passed in by the caller, so a seeded generator reproduces the output exactly.
//!
//! ## Using the library
//!
//! ```no_run
//! use libstrip_digitizer::conditions::FlatConditions;
//! use libstrip_digitizer::config::DigitizerConfig;
//! use libstrip_digitizer::digitizer::StripDigitizer;
//! use libstrip_digitizer::hit::RecordedHit;
//! use libstrip_digitizer::sharing::PrecomputedSharing;
//! use libstrip_digitizer::unit::UnitGeometry;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn run(geometry: UnitGeometry, hits: Vec<RecordedHit>) -> Result<(), Box<dyn std::error::Error>> {
//! let conditions = FlatConditions::default();
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut digitizer = StripDigitizer::new(DigitizerConfig::default())?;
//! let unit = geometry.id;
//! digitizer.initialize_unit(geometry, &conditions);
//!
//! digitizer.initialize_event();
//! digitizer.accumulate(unit, &hits, 0, 0, [0.0, 0.0, 3.8], &PrecomputedSharing, &conditions, &mut rng)?;
//! let digis = digitizer.digitize(unit, &conditions, &mut rng)?;
//! println!("{} digis, {} links", digis.readout.len(), digis.links.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Command line
//!
//! The `strip_digitizer_cli` application runs the digitizer over a YAML hit file. See
//! [`hit_file::HitFile`] for the input format and [`digi_writer::DigiWriter`] for the
//! output. A template configuration can be made with `strip_digitizer_cli -p config.yml new`.
//! The YAML format of a configuration file is as follows (digitizer section shortened):
//!
//! ```yml
//! hit_path: None
//! output_path: None
//! seed: 0
//! magnetic_field: [0.0, 0.0, 3.8]
//! calibration:
//!   noise: 4.0
//!   gain: 1.0
//!   pedestal: 0.0
//!   threshold:
//!     low: 2.0
//!     high: 5.0
//!   lorentz_angle: 0.0
//!   baseline_shift_fraction: 0.0
//!   bad_strips: {}
//! digitizer:
//!   peak_mode: false
//!   zero_suppression: true
//!   fed_algorithm: 4
//!   noise: true
//!   apv_saturation_from_hip: false
//!   apv_probability_file: null
//!   saturation_reset: per_run
//!   efficiency: 1.0
//! ```
//!
//! Fields left out of the `digitizer` section take their default value.
//!
//! ### APV probability file
//!
//! When `apv_saturation_from_hip` is enabled, `apv_probability_file` must point to a
//! text file with one `unit_id probability` pair per line. Lines which do not have
//! exactly two fields are ignored.
pub mod charge;
pub mod conditions;
pub mod config;
pub mod constants;
pub mod converter;
pub mod digi;
pub mod digi_writer;
pub mod digitizer;
pub mod error;
pub mod hit;
pub mod hit_file;
pub mod noise;
pub mod pileup;
pub mod process;
pub mod saturation;
pub mod sharing;
pub mod truth;
pub mod unit;
pub mod worker_status;
pub mod zero_suppression;
