pub mod client;
pub mod espn;
pub mod pbp;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Domain types, independent of the ESPN wire format
// ---------------------------------------------------------------------------

/// Season year, e.g. 2023 for the 2022-23 season.
pub type Season = u16;

/// Season type codes kept in a season schedule: regular season and postseason.
pub const REGULAR_SEASON: u8 = 2;
pub const POSTSEASON: u8 = 3;

/// ESPN event id. Doubles as the cache key and the schedule join key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(GameId)
    }
}

/// One contest in a season schedule.
///
/// The competitor list from the scoreboard is folded into the `home_*` /
/// `away_*` columns and never stored itself. The trailing optional columns are
/// filled in by later stages (game links, extraction) and are omitted until then.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub game_id: GameId,
    #[serde(default)]
    pub uid: Option<String>,
    pub season: Season,
    pub season_type: u8,
    #[serde(default)]
    pub season_slug: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub attendance: Option<u64>,
    #[serde(default)]
    pub neutral_site: Option<bool>,
    #[serde(default)]
    pub conference_competition: Option<bool>,
    #[serde(default)]
    pub venue_full_name: Option<String>,
    #[serde(default)]
    pub venue_city: Option<String>,
    #[serde(default)]
    pub venue_state: Option<String>,
    #[serde(default)]
    pub status_type_id: Option<String>,
    #[serde(default)]
    pub status_type_name: Option<String>,
    #[serde(default)]
    pub status_type_state: Option<String>,
    pub status_type_completed: bool,
    #[serde(default)]
    pub status_type_detail: Option<String>,
    #[serde(default)]
    pub status_period: Option<u8>,
    /// Always a string, even when ESPN sends "0.0".
    #[serde(default)]
    pub status_display_clock: String,
    #[serde(default)]
    pub home_id: Option<String>,
    #[serde(default)]
    pub home_abbreviation: Option<String>,
    #[serde(default)]
    pub home_display_name: Option<String>,
    #[serde(default)]
    pub home_name: Option<String>,
    #[serde(default)]
    pub home_location: Option<String>,
    #[serde(default)]
    pub home_color: Option<String>,
    #[serde(default)]
    pub home_logo: Option<String>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub home_winner: Option<bool>,
    #[serde(default)]
    pub away_id: Option<String>,
    #[serde(default)]
    pub away_abbreviation: Option<String>,
    #[serde(default)]
    pub away_display_name: Option<String>,
    #[serde(default)]
    pub away_name: Option<String>,
    #[serde(default)]
    pub away_location: Option<String>,
    #[serde(default)]
    pub away_color: Option<String>,
    #[serde(default)]
    pub away_logo: Option<String>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub away_winner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_play_by_play: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_team_box: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_player_box: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_raw_json: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_json_url: Option<String>,
}

impl ScheduleRow {
    pub fn is_kept_season_type(&self) -> bool {
        matches!(self.season_type, REGULAR_SEASON | POSTSEASON)
    }
}

/// Team identity as carried on a normalized game payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: Option<String>,
    pub abbreviation: Option<String>,
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub score: Option<u32>,
    pub winner: Option<bool>,
}

/// Normalized per-game document written to the final cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamePayload {
    pub game_id: GameId,
    pub season: Option<Season>,
    pub season_type: Option<u8>,
    pub game_date: Option<String>,
    pub home: TeamInfo,
    pub away: TeamInfo,
    pub plays: Vec<Play>,
    /// `teams` / `players` blocks copied through from the summary response.
    pub boxscore: serde_json::Value,
}

/// One normalized play. Field names are the play-by-play column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub game_id: GameId,
    pub game_play_number: u32,
    pub id: Option<String>,
    pub sequence_number: Option<String>,
    pub type_id: Option<String>,
    pub type_text: Option<String>,
    pub text: Option<String>,
    pub away_score: Option<i64>,
    pub home_score: Option<i64>,
    pub period_number: Option<u8>,
    pub period_display_value: Option<String>,
    pub clock_display_value: Option<String>,
    pub scoring_play: Option<bool>,
    pub score_value: Option<i64>,
    pub team_id: Option<String>,
    pub athlete_id_1: Option<String>,
    pub athlete_id_2: Option<String>,
    pub athlete_id_3: Option<String>,
    pub shooting_play: Option<bool>,
    pub coordinate_x: Option<f64>,
    pub coordinate_y: Option<f64>,
    pub wallclock: Option<String>,
    pub clock_minutes: Option<u32>,
    pub clock_seconds: Option<f64>,
    pub start_quarter_seconds_remaining: Option<f64>,
    pub start_half_seconds_remaining: Option<f64>,
    pub start_game_seconds_remaining: Option<f64>,
    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub season: Option<Season>,
    pub season_type: Option<u8>,
    pub game_date: Option<String>,
}
