use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::classifier::ModelHandle;
use phishguard::config::Config;
use phishguard::pipeline::Pipeline;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Pre-click URL phishing detection")
        .long_about(
            "Classifies a URL's phishing risk before navigation: lexical \
             heuristics, host-reputation lookups, content scraping, and a \
             multi-class model with ranked explanations.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-model")
                .long("generate-model")
                .value_name("FILE")
                .help("Generate a default model artifact")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-url")
                .long("test-url")
                .value_name("URL")
                .help("Evaluate a single URL and print the verdict as JSON")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Serve external lookups from fixed offline tables")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match Config::default().to_file(path) {
            Ok(()) => println!("Default configuration written to {path}"),
            Err(e) => {
                eprintln!("Error writing configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Some(path) = matches.get_one::<String>("generate-model") {
        match ModelHandle::write_default_artifact(path) {
            Ok(()) => println!("Default model artifact written to {path}"),
            Err(e) => {
                eprintln!("Error writing model artifact: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = if std::path::Path::new(config_path).exists() {
        match Config::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration from {config_path}: {e}");
                process::exit(1);
            }
        }
    } else {
        log::warn!("Configuration file {config_path} not found, using defaults");
        Config::default()
    };

    // No pipeline without a working model.
    let classifier = match ModelHandle::load(&config.model_path) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            eprintln!("Error loading model from {}: {e}", config.model_path);
            eprintln!("Run with --generate-model {} to bootstrap one.", config.model_path);
            process::exit(1);
        }
    };

    let pipeline = if matches.get_flag("mock") {
        Pipeline::with_mock_lookups(&config, classifier)
    } else {
        Pipeline::new(&config, classifier)
    };
    let pipeline = match pipeline {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error building pipeline: {e}");
            process::exit(1);
        }
    };

    if let Some(url) = matches.get_one::<String>("test-url") {
        match pipeline.evaluate(url).await {
            Ok(mut verdict) => {
                verdict.risk_score = (verdict.risk_score * 1000.0).round() / 1000.0;
                match serde_json::to_string_pretty(&verdict) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error serializing verdict: {e}");
                        process::exit(1);
                    }
                }
            }
            Err(e) => {
                log::error!("Evaluation failed for {url}: {e}");
                eprintln!("URL evaluation failed");
                process::exit(1);
            }
        }
        return;
    }

    eprintln!("No URL given; use --test-url <URL>. See --help for options.");
    process::exit(2);
}
