//! Flattens cached final payloads into season tables (play-by-play, team box,
//! player box) and marks the schedule with what each table ended up holding.

use crate::config::{Config, DataKind};
use crate::error::{PipelineError, PipelineResult, error_chain};
use crate::report::{SeasonReport, Stage};
use crate::schedule::ScheduleStore;
use crate::store::{GameCache, Partition};
use crate::table::{Cell, Row, Table, TableWriter, flatten_into};
use log::{info, warn};
use nba_api::pbp::PayloadError;
use nba_api::{GameId, ScheduleRow, Season};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const TEAM_META: [&str; 11] = [
    "id",
    "uid",
    "slug",
    "location",
    "name",
    "abbreviation",
    "displayName",
    "shortDisplayName",
    "color",
    "alternateColor",
    "logo",
];

const ATHLETE_FLAGS: [(&str, &str); 5] = [
    ("starter", "starter"),
    ("didNotPlay", "did_not_play"),
    ("reason", "reason"),
    ("ejected", "ejected"),
    ("active", "active"),
];

fn game_id_cell(game_id: GameId) -> Cell {
    i64::try_from(game_id.0).map(Cell::Int).unwrap_or(Cell::Text(game_id.to_string()))
}

fn as_object<'a>(value: &'a Value, field: &'static str) -> Result<&'a Map<String, Value>, PayloadError> {
    value.as_object().ok_or(PayloadError::TypeMismatch {
        field,
        expected: "an object",
    })
}

/// An optional array field: missing or null is empty, anything else but an
/// array is a type mismatch.
fn array_field<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<&'a [Value], PayloadError> {
    match parent.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(PayloadError::TypeMismatch {
            field,
            expected: "an array",
        }),
    }
}

fn boxscore(payload: &Value) -> Result<Option<&Map<String, Value>>, PayloadError> {
    match payload.get("boxscore") {
        None | Some(Value::Null) => Ok(None),
        Some(b) => as_object(b, "boxscore").map(Some),
    }
}

/// Rejects payloads whose top level cannot be walked for the requested
/// kinds. Sections no requested kind reads are not looked at.
pub fn check_shape(payload: &Value, kinds: &[DataKind]) -> Result<(), PayloadError> {
    let Some(top) = payload.as_object() else {
        return Err(PayloadError::Shape("final payload is not a JSON object".into()));
    };
    for kind in kinds {
        match kind {
            DataKind::Plays => {
                array_field(top, "plays", "plays")?;
            }
            DataKind::TeamBox => {
                if let Some(b) = boxscore(payload)? {
                    array_field(b, "teams", "boxscore.teams")?;
                }
            }
            DataKind::PlayerBox => {
                if let Some(b) = boxscore(payload)? {
                    array_field(b, "players", "boxscore.players")?;
                }
            }
        }
    }
    Ok(())
}

pub fn play_rows(game_id: GameId, payload: &Value) -> Result<Vec<Row>, PayloadError> {
    let top = as_object(payload, "payload")?;
    let mut rows = Vec::new();
    for (i, play) in array_field(top, "plays", "plays")?.iter().enumerate() {
        if !play.is_object() {
            warn!("game {game_id}: play {i} is not an object, dropped");
            continue;
        }
        let mut row = Row::new();
        flatten_into(&mut row, "", play);
        row.insert("game_id".into(), game_id_cell(game_id));
        rows.push(row);
    }
    Ok(rows)
}

pub fn team_box_rows(game_id: GameId, payload: &Value) -> Result<Vec<Row>, PayloadError> {
    let Some(b) = boxscore(payload)? else {
        return Ok(Vec::new());
    };
    let mut rows = Vec::new();
    for (i, entry) in array_field(b, "teams", "boxscore.teams")?.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            warn!("game {game_id}: team box entry {i} is not an object, dropped");
            continue;
        };
        let team = entry.get("team").and_then(Value::as_object);
        let statistics = match array_field(entry, "statistics", "boxscore.teams.statistics") {
            Ok(stats) => stats,
            Err(e) => {
                warn!("game {game_id}: team box entry {i}: {e}");
                continue;
            }
        };

        for stat in statistics {
            if !stat.is_object() {
                warn!("game {game_id}: team box entry {i} has a non-object statistic, dropped");
                continue;
            }
            let mut row = Row::new();
            flatten_into(&mut row, "stat", stat);
            for field in TEAM_META {
                let cell = team
                    .and_then(|t| t.get(field))
                    .map(Cell::from)
                    .unwrap_or(Cell::Null);
                row.insert(format!("team_{field}"), cell);
            }
            if let Some(home_away) = entry.get("homeAway") {
                row.insert("home_away".into(), Cell::from(home_away));
            }
            row.insert("game_id".into(), game_id_cell(game_id));
            rows.push(row);
        }
    }
    Ok(rows)
}

fn athlete_row(
    team_info: &Row,
    keys: &[Value],
    athlete: &Value,
    game_id: GameId,
) -> Result<Row, PayloadError> {
    let athlete = as_object(athlete, "athletes[]")?;
    let mut row = team_info.clone();

    if let Some(identity) = athlete.get("athlete") {
        let mut identity = as_object(identity, "athletes[].athlete")?.clone();
        identity.remove("links");
        flatten_into(&mut row, "athlete", &Value::Object(identity));
    }
    for (source, column) in ATHLETE_FLAGS {
        let cell = athlete.get(source).map(Cell::from).unwrap_or(Cell::Null);
        row.insert(column.into(), cell);
    }

    let stats = array_field(athlete, "stats", "athletes[].stats")?;
    if !stats.is_empty() && stats.len() != keys.len() {
        return Err(PayloadError::Shape(format!(
            "{} stats for {} keys",
            stats.len(),
            keys.len()
        )));
    }
    for (i, key) in keys.iter().enumerate() {
        let name = key.as_str().ok_or(PayloadError::TypeMismatch {
            field: "statistics[].keys[]",
            expected: "a string",
        })?;
        let cell = stats.get(i).map(Cell::from).unwrap_or(Cell::Null);
        row.insert(name.to_owned(), cell);
    }

    row.insert("game_id".into(), game_id_cell(game_id));
    Ok(row)
}

pub fn player_box_rows(game_id: GameId, payload: &Value) -> Result<Vec<Row>, PayloadError> {
    let Some(b) = boxscore(payload)? else {
        return Ok(Vec::new());
    };
    let mut rows = Vec::new();
    for (t, block) in array_field(b, "players", "boxscore.players")?.iter().enumerate() {
        let Some(block) = block.as_object() else {
            warn!("game {game_id}: player box team {t} is not an object, dropped");
            continue;
        };
        let mut team_info = Row::new();
        if let Some(team) = block.get("team") {
            flatten_into(&mut team_info, "team", team);
        }
        let slots = match array_field(block, "statistics", "boxscore.players.statistics") {
            Ok(slots) => slots,
            Err(e) => {
                warn!("game {game_id}: player box team {t}: {e}");
                continue;
            }
        };

        for (s, slot) in slots.iter().enumerate() {
            let Some(slot) = slot.as_object() else {
                warn!("game {game_id}: player box team {t} slot {s} is not an object, dropped");
                continue;
            };
            let (keys, athletes) = match (
                array_field(slot, "keys", "statistics[].keys"),
                array_field(slot, "athletes", "statistics[].athletes"),
            ) {
                (Ok(keys), Ok(athletes)) => (keys, athletes),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("game {game_id}: player box team {t} slot {s}: {e}");
                    continue;
                }
            };
            for (a, athlete) in athletes.iter().enumerate() {
                match athlete_row(&team_info, keys, athlete, game_id) {
                    Ok(row) => rows.push(row),
                    Err(e) => warn!("game {game_id}: athlete {a} in team {t} slot {s} dropped: {e}"),
                }
            }
        }
    }
    Ok(rows)
}

/// Every requested kind's rows for one game, or an error that skips the game.
pub fn extract_game(
    game_id: GameId,
    payload: &Value,
    kinds: &[DataKind],
) -> Result<Vec<(DataKind, Vec<Row>)>, PayloadError> {
    check_shape(payload, kinds)?;
    kinds
        .iter()
        .map(|&kind| {
            let rows = match kind {
                DataKind::Plays => play_rows(game_id, payload)?,
                DataKind::TeamBox => team_box_rows(game_id, payload)?,
                DataKind::PlayerBox => player_box_rows(game_id, payload)?,
            };
            Ok((kind, rows))
        })
        .collect()
}

/// Season aggregate, one table per kind.
#[derive(Debug, Default)]
pub struct SeasonTables {
    pub plays: Table,
    pub team_box: Table,
    pub player_box: Table,
}

impl SeasonTables {
    pub fn table(&self, kind: DataKind) -> &Table {
        match kind {
            DataKind::Plays => &self.plays,
            DataKind::TeamBox => &self.team_box,
            DataKind::PlayerBox => &self.player_box,
        }
    }

    fn table_mut(&mut self, kind: DataKind) -> &mut Table {
        match kind {
            DataKind::Plays => &mut self.plays,
            DataKind::TeamBox => &mut self.team_box,
            DataKind::PlayerBox => &mut self.player_box,
        }
    }

    pub fn extend(&mut self, kind: DataKind, rows: Vec<Row>) {
        let table = self.table_mut(kind);
        for row in rows {
            table.push(row);
        }
    }
}

/// Final-store games that the schedule lists for `season`, ascending.
pub fn season_games(
    cache: &GameCache,
    schedule: &[ScheduleRow],
    season: Season,
) -> PipelineResult<BTreeSet<GameId>> {
    let scheduled: BTreeSet<GameId> = schedule
        .iter()
        .filter(|r| r.season == season)
        .map(|r| r.game_id)
        .collect();
    Ok(cache
        .keys(Partition::Final)?
        .intersection(&scheduled)
        .copied()
        .collect())
}

/// Set the `has_<kind>` flag on every schedule row. Row count is untouched.
pub fn mark_presence(rows: &mut [ScheduleRow], kind: DataKind, table: &Table) {
    let present = table.distinct_i64("game_id");
    for row in rows.iter_mut() {
        let flag = Some(i64::try_from(row.game_id.0).is_ok_and(|id| present.contains(&id)));
        match kind {
            DataKind::Plays => row.has_play_by_play = flag,
            DataKind::TeamBox => row.has_team_box = flag,
            DataKind::PlayerBox => row.has_player_box = flag,
        }
    }
}

/// Extractor entry point.
pub fn run_extract(
    config: &Config,
    seasons: &[Season],
    kinds: &[DataKind],
) -> PipelineResult<Vec<SeasonReport>> {
    let layout = config.layout();
    let cache = GameCache::new(&layout);
    let store = ScheduleStore::new(layout.clone());
    let writer = TableWriter;
    let mut reports = Vec::with_capacity(seasons.len());

    for &season in seasons {
        info!("processing year {season}...");
        let mut report = SeasonReport::new(season, Stage::Extract);
        let mut schedule = match store.read_season(season) {
            Ok(rows) => rows,
            Err(e) if e.is_transient() => {
                let reason = error_chain(&e);
                warn!("season {season}: no schedule to extract against: {reason}");
                report.record_skip("schedule", reason);
                reports.push(report);
                continue;
            }
            Err(e) => return Err(e),
        };

        let games = season_games(&cache, &schedule, season)?;
        info!("number of games: {}", games.len());

        let mut tables = SeasonTables::default();
        for &game_id in &games {
            let extracted = cache
                .read_json(Partition::Final, game_id)
                .and_then(|payload| extract_game(game_id, &payload, kinds).map_err(PipelineError::from));
            match extracted {
                Ok(parts) => {
                    for (kind, rows) in parts {
                        tables.extend(kind, rows);
                    }
                    report.record_success();
                }
                Err(e) if e.is_transient() => {
                    let reason = error_chain(&e);
                    warn!("game {game_id}: skipped: {reason}");
                    report.record_skip(game_id, reason);
                }
                Err(e) => return Err(e),
            }
        }

        for &kind in kinds {
            let table = tables.table(kind);
            if table.is_empty() {
                info!("season {season}: no {} rows, nothing written", kind.label());
            } else {
                writer.write_both(
                    table,
                    &layout.table_parquet(kind, season),
                    &layout.table_csv(kind, season),
                )?;
                info!("season {season}: {} {} rows", table.len(), kind.label());
            }
            mark_presence(&mut schedule, kind, table);
        }
        store.write_season(season, &schedule)?;

        info!("{report}");
        reports.push(report);
    }
    Ok(reports)
}
