use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use libstrip_digitizer::config::Config;
use libstrip_digitizer::process::process;
use libstrip_digitizer::worker_status::Stage;

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("strip_digitizer_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue)
                .help("Also print debug messages"),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");
    log::set_max_level(level);

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Could not write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Hit Path: {}", config.hit_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!("Seed: {}", config.seed);
    log::info!(
        "Readout: {} mode, zero suppression {}",
        if config.digitizer.peak_mode {
            "peak"
        } else {
            "deconvolution"
        },
        if config.digitizer.zero_suppression {
            "on"
        } else {
            "off"
        }
    );
    if !config.does_hit_file_exist() {
        log::error!(
            "Hit file {} does not exist!",
            config.hit_path.to_string_lossy()
        );
        return;
    }

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{prefix:>12} [{bar:40.cyan/blue}] {pos}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    let (tx, rx) = channel();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    loop {
        // No UI here, so we sleep for a bit before trying to update
        std::thread::sleep(std::time::Duration::from_millis(250));
        for status in rx.try_iter() {
            let prefix = match status.stage {
                Stage::Loading => "Loading",
                Stage::Digitizing => "Digitizing",
                Stage::Writing => "Writing",
            };
            pb.set_prefix(prefix);
            pb.set_message(format!("{} events", status.events_done));
            pb.set_position((status.progress * 100.0) as u64);
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(_) => log::info!("Successfully digitized data!"),
                    Err(e) => log::error!("Digitizing failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join digitizing task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
