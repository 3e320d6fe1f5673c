use anyhow::Context;
use clap::Parser;
use log::info;
use nba_api::client::NbaApi;
use nba_raw::cli::{SchedulesCli, print_summary};
use nba_raw::config::Config;
use nba_raw::logging::init_logging;
use nba_raw::schedule::run_schedules;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = SchedulesCli::parse();
    better_panic::install();

    let config = Config::load().context("reading NBA_RAW_* configuration")?;
    init_logging(&config.log_file, "info")?;

    let seasons = cli.seasons.seasons(&config);
    info!("schedules for seasons {seasons:?} into {}", config.data_dir.display());

    let api = NbaApi::new();
    let reports = run_schedules(&api, &config, &seasons)
        .await
        .context("schedule run aborted")?;
    print_summary(&reports);
    Ok(())
}
