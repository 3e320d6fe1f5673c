//! Raw ESPN game summary → normalized [`GamePayload`].
//!
//! The transform is deterministic: the same summary always yields the same
//! payload, field for field, so the final cache can be rebuilt from the raw one.

use crate::client::split_home_away;
use crate::espn::{EspnCompetitor, EspnPlay, SummaryResponse};
use crate::{GameId, GamePayload, Play, TeamInfo};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

const QUARTER_SECONDS: f64 = 720.0;
const REGULATION_PERIODS: u8 = 4;

#[derive(Debug)]
pub enum PayloadError {
    MissingField(&'static str),
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },
    Decode(serde_json::Error),
    Shape(String),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::MissingField(field) => write!(f, "missing field `{field}`"),
            PayloadError::TypeMismatch { field, expected } => {
                write!(f, "field `{field}` is not {expected}")
            }
            PayloadError::Decode(_) => f.write_str("summary does not match the expected shape"),
            PayloadError::Shape(msg) => write!(f, "unexpected payload shape: {msg}"),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PayloadError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(e: serde_json::Error) -> Self {
        PayloadError::Decode(e)
    }
}

/// Normalize one raw summary into the document stored in the final cache.
pub fn normalize_game(game_id: GameId, raw: &Value) -> Result<GamePayload, PayloadError> {
    if !raw.is_object() {
        return Err(PayloadError::Shape(format!(
            "summary for game {game_id} is not a JSON object"
        )));
    }
    let summary = SummaryResponse::deserialize(raw)?;

    let header = summary.header.ok_or(PayloadError::MissingField("header"))?;
    let competition = header
        .competitions
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(PayloadError::MissingField("header.competitions"))?;

    let competitors = competition.competitors.unwrap_or_default();
    if competitors.is_empty() {
        return Err(PayloadError::MissingField("header.competitions.competitors"));
    }
    let (home, away) = split_home_away(&competitors);

    let season = header.season.as_ref().and_then(|s| s.year);
    let season_type = header.season.as_ref().and_then(|s| s.season_type);
    let game_date = competition.date;

    let boxscore = normalize_boxscore(summary.boxscore)?;

    let home = team_info(&home);
    let away = team_info(&away);

    let plays = summary
        .plays
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut play = map_play(game_id, i as u32 + 1, p);
            play.home_team_id = home.id.clone();
            play.away_team_id = away.id.clone();
            play.season = season;
            play.season_type = season_type;
            play.game_date = game_date.clone();
            play
        })
        .collect();

    Ok(GamePayload {
        game_id,
        season,
        season_type,
        game_date,
        home,
        away,
        plays,
        boxscore,
    })
}

/// Keep only the `teams` and `players` blocks; a missing boxscore becomes an
/// empty one rather than an error (old games often lack it).
fn normalize_boxscore(boxscore: Option<Value>) -> Result<Value, PayloadError> {
    let mut out = Map::new();
    let Some(boxscore) = boxscore else {
        out.insert("teams".into(), Value::Array(Vec::new()));
        out.insert("players".into(), Value::Array(Vec::new()));
        return Ok(Value::Object(out));
    };

    let Value::Object(mut fields) = boxscore else {
        return Err(PayloadError::TypeMismatch {
            field: "boxscore",
            expected: "an object",
        });
    };

    for key in ["teams", "players"] {
        let block = fields.remove(key).unwrap_or(Value::Array(Vec::new()));
        out.insert(key.into(), block);
    }
    Ok(Value::Object(out))
}

fn team_info(c: &EspnCompetitor) -> TeamInfo {
    let team = c.team.clone().unwrap_or_default();
    TeamInfo {
        id: team.id.or_else(|| c.id.clone()),
        abbreviation: team.abbreviation,
        display_name: team.display_name,
        name: team.name,
        location: team.location,
        score: c.score,
        winner: c.winner,
    }
}

fn map_play(game_id: GameId, number: u32, p: EspnPlay) -> Play {
    let period_number = p.period.as_ref().and_then(|x| x.number);
    let clock_display_value = p.clock.and_then(|c| c.display_value);
    let clock_total = clock_display_value.as_deref().and_then(parse_clock);

    let mut athletes = p
        .participants
        .unwrap_or_default()
        .into_iter()
        .map(|part| part.athlete.and_then(|a| a.id));
    let athlete_id_1 = athletes.next().flatten();
    let athlete_id_2 = athletes.next().flatten();
    let athlete_id_3 = athletes.next().flatten();

    let (play_type_id, play_type_text) = p
        .play_type
        .map(|t| (t.id, t.text))
        .unwrap_or_default();

    Play {
        game_id,
        game_play_number: number,
        id: p.id,
        sequence_number: p.sequence_number,
        type_id: play_type_id,
        type_text: play_type_text,
        text: p.text,
        away_score: p.away_score,
        home_score: p.home_score,
        period_number,
        period_display_value: p.period.and_then(|x| x.display_value),
        clock_display_value,
        scoring_play: p.scoring_play,
        score_value: p.score_value,
        team_id: p.team.and_then(|t| t.id),
        athlete_id_1,
        athlete_id_2,
        athlete_id_3,
        shooting_play: p.shooting_play,
        coordinate_x: p.coordinate.as_ref().and_then(|c| c.x),
        coordinate_y: p.coordinate.as_ref().and_then(|c| c.y),
        wallclock: p.wallclock,
        clock_minutes: clock_total.map(|t| (t / 60.0).floor() as u32),
        clock_seconds: clock_total.map(|t| t - (t / 60.0).floor() * 60.0),
        start_quarter_seconds_remaining: clock_total,
        start_half_seconds_remaining: clock_total
            .zip(period_number)
            .map(|(t, p)| half_seconds_remaining(p, t)),
        start_game_seconds_remaining: clock_total
            .zip(period_number)
            .map(|(t, p)| game_seconds_remaining(p, t)),
        ..Default::default()
    }
}

/// Seconds left in the period from a display clock: `"11:42"` or, inside the
/// last minute, `"45.3"`.
pub fn parse_clock(display: &str) -> Option<f64> {
    let display = display.trim();
    match display.split_once(':') {
        Some((min, sec)) => {
            let min = min.parse::<u32>().ok()?;
            let sec = sec.parse::<f64>().ok()?;
            Some(f64::from(min) * 60.0 + sec)
        }
        None => display.parse::<f64>().ok(),
    }
}

fn half_seconds_remaining(period: u8, clock: f64) -> f64 {
    match period {
        1 | 3 => clock + QUARTER_SECONDS,
        _ => clock,
    }
}

/// Overtime periods count only their own clock.
fn game_seconds_remaining(period: u8, clock: f64) -> f64 {
    if (1..=REGULATION_PERIODS).contains(&period) {
        f64::from(REGULATION_PERIODS - period) * QUARTER_SECONDS + clock
    } else {
        clock
    }
}
