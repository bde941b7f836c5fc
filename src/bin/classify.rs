use clap::Parser;
use config_scraper::{
    classifier::{latest_json_file, Classifier, DEFAULT_NAME_FIELD},
    persistent::{backup_file, load_records, write_records},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Tags scraped records with catalogue product ids, rewriting the file in place.
#[derive(Debug, Parser)]
struct Args {
    /// Records file. Defaults to the newest `.json` in the output directory.
    file: Option<PathBuf>,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    #[arg(long, default_value = "configs/alternative_names.json")]
    catalog: PathBuf,

    #[arg(long, default_value = DEFAULT_NAME_FIELD)]
    name_field: String,

    /// Keep a timestamped copy of the file before rewriting it.
    #[arg(long)]
    backup: bool,
}

fn classify(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let path = match args.file {
        Some(path) => path,
        None => latest_json_file(&args.output_dir)?
            .ok_or_else(|| format!("no .json file in {}", args.output_dir.display()))?,
    };
    info!("Classifying {}", path.display());

    if args.backup {
        let backup = backup_file(&path, chrono::Local::now())?;
        info!("Backup written to {}", backup.display());
    }

    let classifier = Classifier::load(&args.catalog)?;
    let mut records = load_records(&path)?;
    let matched = classifier.classify(&mut records, &args.name_field);
    write_records(&path, &records)?;

    info!("Matched {}/{} records", matched, records.len());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| "info".into()),
        )
        .with(ErrorLayer::default())
        .init();

    match classify(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
