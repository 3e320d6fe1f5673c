use crate::config::{Config, DataKind};
use crate::report::{SeasonReport, Status};
use clap::{ArgAction, Args, Parser};
use nba_api::Season;

/// The season range every binary takes.
#[derive(Args, Debug, Clone, Copy)]
pub struct SeasonArgs {
    /// Start year of the NBA schedule period (YYYY), eg. 2023 for the 2022-23 season
    #[arg(short = 's', long = "start-year")]
    pub start_year: Season,
    /// End year of the NBA schedule period (YYYY); defaults to the start year
    #[arg(short = 'e', long = "end-year")]
    pub end_year: Option<Season>,
}

impl SeasonArgs {
    pub fn seasons(&self, config: &Config) -> Vec<Season> {
        config.seasons(self.start_year, self.end_year)
    }
}

#[derive(Parser, Debug)]
#[command(name = "nba_schedules", version, about = "Download NBA season schedules from ESPN")]
pub struct SchedulesCli {
    #[command(flatten)]
    pub seasons: SeasonArgs,
}

#[derive(Parser, Debug)]
#[command(name = "nba_games", version, about = "Download and normalize NBA game summaries")]
pub struct GamesCli {
    #[command(flatten)]
    pub seasons: SeasonArgs,
    /// Re-fetch games that already have a final payload
    #[arg(short = 'r', long, action = ArgAction::Set, default_value_t = true)]
    pub rescrape: bool,
    /// Normalize raw payloads into the final cache
    #[arg(short = 'p', long, action = ArgAction::Set, default_value_t = true)]
    pub process: bool,
}

#[derive(Parser, Debug)]
#[command(name = "nba_extract", version, about = "Build season play-by-play and box score tables")]
pub struct ExtractCli {
    #[command(flatten)]
    pub seasons: SeasonArgs,
    /// Build the play-by-play table
    #[arg(short = 'p', long, action = ArgAction::Set, default_value_t = true)]
    pub plays: bool,
    /// Build the team box score table
    #[arg(short = 't', long = "team-box", action = ArgAction::Set, default_value_t = true)]
    pub team_box: bool,
    /// Build the player box score table
    #[arg(short = 'b', long = "player-box", action = ArgAction::Set, default_value_t = true)]
    pub player_box: bool,
}

impl ExtractCli {
    pub fn kinds(&self) -> Vec<DataKind> {
        [
            (DataKind::Plays, self.plays),
            (DataKind::TeamBox, self.team_box),
            (DataKind::PlayerBox, self.player_box),
        ]
        .into_iter()
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect()
    }
}

/// Log every report and print a one-line-per-season summary.
pub fn print_summary(reports: &[SeasonReport]) {
    for report in reports {
        match report.status() {
            Status::Complete | Status::Empty => log::info!("{report}"),
            Status::Partial | Status::Failed => log::warn!("{report}"),
        }
        println!("{report}");
    }
}
