use std::fs::File;

use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::LevelFilter;

use cli::command::Cli;
use cli::run::run;

mod cli;
mod timestamp;
mod workers;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = if cli.debug || cli.debug_file.is_some() {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let multi = MultiProgress::new();

    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(base_level);
    env_builder.format_timestamp_secs();
    if let Some(path) = &cli.debug_file {
        env_builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }

    if cli.progress_bar {
        let logger = env_builder.build();
        LogWrapper::new(multi.clone(), logger).try_init()?;
    } else {
        env_builder.try_init()?;
    }

    run(&cli, &multi)
}
