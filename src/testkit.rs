//! In-memory [`GameSource`] and payload builders for the pipeline tests.

use crate::source::GameSource;
use chrono::NaiveDate;
use nba_api::client::{ApiError, ApiResult};
use nba_api::{GameId, ScheduleRow, Season};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FakeSource {
    pub dates: HashMap<Season, Vec<NaiveDate>>,
    pub schedules: HashMap<NaiveDate, Vec<ScheduleRow>>,
    pub failing_dates: HashSet<NaiveDate>,
    /// Games not listed here answer `NotFound`.
    pub games: HashMap<GameId, Value>,
    game_calls: Mutex<Vec<GameId>>,
}

impl FakeSource {
    pub fn with_games(ids: &[u64]) -> Self {
        let mut source = Self::default();
        for &id in ids {
            source.games.insert(GameId(id), summary(id));
        }
        source
    }

    pub fn game_calls(&self) -> Vec<GameId> {
        self.game_calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl GameSource for FakeSource {
    async fn season_dates(&self, season: Season) -> ApiResult<Vec<NaiveDate>> {
        Ok(self.dates.get(&season).cloned().unwrap_or_default())
    }

    async fn schedule_for(&self, date: NaiveDate) -> ApiResult<Vec<ScheduleRow>> {
        if self.failing_dates.contains(&date) {
            return Err(ApiError::Other(format!("scoreboard unavailable for {date}")));
        }
        Ok(self.schedules.get(&date).cloned().unwrap_or_default())
    }

    async fn raw_game(&self, game_id: GameId) -> ApiResult<Value> {
        if let Ok(mut calls) = self.game_calls.lock() {
            calls.push(game_id);
        }
        self.games
            .get(&game_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("game {game_id}")))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn schedule_row(id: u64, season: Season) -> ScheduleRow {
    ScheduleRow {
        game_id: GameId(id),
        season,
        season_type: 2,
        status_type_completed: true,
        status_display_clock: "0.0".into(),
        ..Default::default()
    }
}

fn team(id: &str, abbrev: &str) -> Value {
    json!({
        "id": id,
        "uid": format!("s:40~l:46~t:{id}"),
        "slug": abbrev.to_lowercase(),
        "location": format!("{abbrev} City"),
        "name": format!("{abbrev}s"),
        "abbreviation": abbrev,
        "displayName": format!("{abbrev} City {abbrev}s"),
        "shortDisplayName": format!("{abbrev}s"),
        "color": "000000",
        "alternateColor": "ffffff",
        "logo": format!("https://a.espncdn.com/i/teamlogos/nba/500/{abbrev}.png")
    })
}

fn athlete(id: &str, stats: &[&str]) -> Value {
    json!({
        "active": true,
        "athlete": {
            "id": id,
            "displayName": format!("Player {id}"),
            "jersey": "23",
            "links": [{"href": "https://espn.com"}],
            "position": {"abbreviation": "G"}
        },
        "starter": true,
        "didNotPlay": false,
        "ejected": false,
        "stats": stats
    })
}

/// Box-score player block for one team with the given number of athletes in
/// each stat slot.
pub fn player_team(team_id: &str, abbrev: &str, slots: &[usize]) -> Value {
    let statistics: Vec<Value> = slots
        .iter()
        .enumerate()
        .map(|(slot, &count)| {
            let athletes: Vec<Value> = (0..count)
                .map(|n| athlete(&format!("{team_id}{slot}{n}"), &["30", "7-12", "25"]))
                .collect();
            json!({
                "names": ["MIN", "FG", "PTS"],
                "keys": ["minutes", "fieldGoalsMade-fieldGoalsAttempted", "points"],
                "athletes": athletes
            })
        })
        .collect();
    json!({"team": team(team_id, abbrev), "statistics": statistics})
}

/// A raw ESPN summary good enough for every stage.
pub fn summary(id: u64) -> Value {
    json!({
        "header": {
            "id": id.to_string(),
            "season": {"year": 2024, "type": 2},
            "competitions": [{
                "date": "2024-01-10T00:00Z",
                "competitors": [
                    {"id": "1", "homeAway": "home", "score": "110", "winner": true, "team": team("1", "ATL")},
                    {"id": "2", "homeAway": "away", "score": "100", "winner": false, "team": team("2", "BOS")}
                ]
            }]
        },
        "plays": [
            {"id": format!("{id}1"), "sequenceNumber": "1", "type": {"id": "615", "text": "Jumpball"},
             "text": "Jump ball", "period": {"number": 1}, "clock": {"displayValue": "12:00"},
             "homeScore": 0, "awayScore": 0},
            {"id": format!("{id}2"), "sequenceNumber": "2", "type": {"id": "92", "text": "Jump Shot"},
             "text": "Made jumper", "period": {"number": 1}, "clock": {"displayValue": "11:40"},
             "homeScore": 2, "awayScore": 0, "scoringPlay": true, "scoreValue": 2, "team": {"id": "1"}}
        ],
        "boxscore": {
            "teams": [
                {"team": team("1", "ATL"), "homeAway": "home",
                 "statistics": [
                    {"name": "fieldGoalsMade-fieldGoalsAttempted", "displayValue": "40-85", "label": "FG"},
                    {"name": "assists", "displayValue": "25", "label": "Assists"}
                 ]},
                {"team": team("2", "BOS"), "homeAway": "away",
                 "statistics": [
                    {"name": "fieldGoalsMade-fieldGoalsAttempted", "displayValue": "38-90", "label": "FG"},
                    {"name": "assists", "displayValue": "20", "label": "Assists"}
                 ]}
            ],
            "players": [player_team("1", "ATL", &[2]), player_team("2", "BOS", &[1])]
        }
    })
}
