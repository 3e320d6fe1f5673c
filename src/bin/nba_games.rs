use anyhow::Context;
use clap::Parser;
use log::info;
use nba_api::client::NbaApi;
use nba_raw::cli::{GamesCli, print_summary};
use nba_raw::config::Config;
use nba_raw::games::{GameFetchOptions, run_games};
use nba_raw::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = GamesCli::parse();
    better_panic::install();

    let config = Config::load().context("reading NBA_RAW_* configuration")?;
    init_logging(&config.log_file, "info")?;

    let seasons = cli.seasons.seasons(&config);
    let options = GameFetchOptions::from_flags(cli.rescrape, cli.process);
    info!(
        "games for seasons {seasons:?} (rescrape: {}, process: {}, workers: {})",
        cli.rescrape, cli.process, config.max_concurrency
    );

    let api = NbaApi::new();
    let reports = run_games(&api, &config, &seasons, options)
        .await
        .context("game run aborted")?;
    print_summary(&reports);
    Ok(())
}
