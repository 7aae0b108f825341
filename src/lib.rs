pub mod app;
pub mod audit;
pub mod cli;
pub mod correlate;
pub mod curvefit;
pub mod data;
pub mod error;
pub mod extrapolate;
pub mod frame;
pub mod history;
pub mod interpolate;
pub mod io_utils;
pub mod numeric;
pub mod oversample;
pub mod reduce;
pub mod suggest;
pub mod summary;
pub mod table;
pub mod workspace;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datascope", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => app::ingest(&args),
        Commands::Summary(args) => app::summary(&args),
        Commands::Reduce(args) => app::reduce(&args),
        Commands::Recommend(args) => app::recommend(&args),
        Commands::Fit(args) => app::fit(&args),
        Commands::Interpolate(args) => app::interpolate(&args),
        Commands::Extrapolate(args) => app::extrapolate(&args),
        Commands::Correlate(args) => app::correlate(&args),
        Commands::Suggest(args) => app::suggest(&args),
        Commands::Oversample(args) => app::oversample(&args),
        Commands::Select(args) => app::select(&args),
        Commands::AddFeature(args) => app::add_feature(&args),
        Commands::DeleteFeature(args) => app::delete_feature(&args),
        Commands::Export(args) => app::export(&args),
        Commands::Log(args) => app::log(&args),
        Commands::Revert(args) => app::revert(&args),
        Commands::Lineage(args) => app::lineage(&args),
    }
}
