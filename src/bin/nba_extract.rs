use anyhow::Context;
use clap::Parser;
use log::info;
use nba_raw::cli::{ExtractCli, print_summary};
use nba_raw::config::Config;
use nba_raw::extract::run_extract;
use nba_raw::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = ExtractCli::parse();
    better_panic::install();

    let config = Config::load().context("reading NBA_RAW_* configuration")?;
    init_logging(&config.log_file, "info")?;

    let seasons = cli.seasons.seasons(&config);
    let kinds = cli.kinds();
    info!("extracting {kinds:?} for seasons {seasons:?}");

    let reports = run_extract(&config, &seasons, &kinds).context("extract run aborted")?;
    print_summary(&reports);
    Ok(())
}
