//! Season schedules: calendar → per-date scoreboards → one deduplicated table.

use crate::config::{Config, Layout};
use crate::error::{PipelineError, PipelineResult, error_chain};
use crate::pool::{PoolOptions, run_bounded};
use crate::report::{SeasonReport, Stage};
use crate::source::GameSource;
use crate::table::{Cell, Row, Table, TableWriter};
use chrono::NaiveDate;
use log::{info, warn};
use nba_api::{GameId, ScheduleRow, Season};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::time::Instant;

/// Concatenate per-date fragments (already in calendar order), keep regular
/// and postseason games only, and keep the first row seen for each game.
pub fn assemble_season_schedule(fragments: Vec<Vec<ScheduleRow>>) -> Vec<ScheduleRow> {
    let mut seen = HashSet::new();
    fragments
        .into_iter()
        .flatten()
        .filter(ScheduleRow::is_kept_season_type)
        .filter(|row| seen.insert(row.game_id))
        .collect()
}

pub fn schedule_to_row(row: &ScheduleRow) -> PipelineResult<Row> {
    let value = serde_json::to_value(row)
        .map_err(|e| PipelineError::Decode(e, format!("schedule row for game {}", row.game_id)))?;
    let Value::Object(fields) = value else {
        return Err(PipelineError::Table("schedule row did not serialize to an object".into()));
    };
    Ok(fields.iter().map(|(k, v)| (k.clone(), Cell::from(v))).collect())
}

pub fn schedule_from_row(row: &Row) -> PipelineResult<ScheduleRow> {
    // Nulls are left out so serde falls back to field defaults.
    let fields: Map<String, Value> = row
        .iter()
        .filter(|(_, cell)| !cell.is_null())
        .map(|(k, cell)| (k.clone(), Value::from(cell)))
        .collect();
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| PipelineError::Decode(e, "schedule row".into()))
}

pub fn schedule_table(rows: &[ScheduleRow]) -> PipelineResult<Table> {
    let mut table = Table::new();
    for row in rows {
        table.push(schedule_to_row(row)?);
    }
    Ok(table)
}

pub fn schedule_rows(table: &Table) -> PipelineResult<Vec<ScheduleRow>> {
    table.rows().map(|row| schedule_from_row(&row)).collect()
}

/// Reads and writes season schedule files (Parquet + CSV).
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    layout: Layout,
    writer: TableWriter,
}

impl ScheduleStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout, writer: TableWriter }
    }

    pub fn write_season(&self, season: Season, rows: &[ScheduleRow]) -> PipelineResult<()> {
        let table = schedule_table(rows)?;
        self.writer.write_both(
            &table,
            &self.layout.schedule_parquet(season),
            &self.layout.schedule_csv(season),
        )
    }

    pub fn read_season(&self, season: Season) -> PipelineResult<Vec<ScheduleRow>> {
        let table = self.writer.read_parquet(&self.layout.schedule_parquet(season))?;
        schedule_rows(&table)
    }

    /// Concatenate every season file on disk into the master schedule.
    /// Returns the number of rows written.
    pub fn write_master(&self) -> PipelineResult<usize> {
        let dir = self.layout.schedules_dir().join("parquet");
        let mut files: Vec<_> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "parquet"))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(PipelineError::Io(e, dir)),
        };
        files.sort();

        let mut master = Table::new();
        for path in &files {
            master.append(self.writer.read_parquet(path)?);
        }
        if master.is_empty() {
            return Ok(0);
        }
        self.writer.write_parquet(&master, &self.layout.master_schedule())?;
        Ok(master.len())
    }
}

/// Fetch one season's schedule. A missing calendar yields an empty schedule
/// and a failed report rather than an error.
pub async fn fetch_season_schedule<S: GameSource>(
    source: &S,
    config: &Config,
    season: Season,
) -> PipelineResult<(Vec<ScheduleRow>, SeasonReport)> {
    let mut report = SeasonReport::new(season, Stage::Schedules);

    let dates = match source.season_dates(season).await {
        Ok(dates) => dates,
        Err(e) => {
            let reason = error_chain(&e);
            warn!("no calendar for season {season}: {reason}");
            report.record_skip("calendar", reason);
            return Ok((Vec::new(), report));
        }
    };
    info!("season {season}: {} game dates", dates.len());

    let outcomes = run_bounded(dates, PoolOptions::from(config), |date: NaiveDate| async move {
        source.schedule_for(date).await.map_err(PipelineError::from)
    })
    .await?;
    report = SeasonReport::from_outcomes(season, Stage::Schedules, &outcomes);

    // Back into calendar order so "first occurrence" means the earliest date.
    let mut fragments: Vec<(NaiveDate, Vec<ScheduleRow>)> = outcomes
        .into_iter()
        .filter_map(|(date, outcome)| outcome.ok().map(|rows| (date, rows)))
        .collect();
    fragments.sort_by_key(|(date, _)| *date);

    let rows = assemble_season_schedule(fragments.into_iter().map(|(_, rows)| rows).collect());
    Ok((rows, report))
}

/// Schedule Fetcher entry point: fetch, write and report each season, then
/// rebuild the master schedule.
pub async fn run_schedules<S: GameSource>(
    source: &S,
    config: &Config,
    seasons: &[Season],
) -> PipelineResult<Vec<SeasonReport>> {
    let store = ScheduleStore::new(config.layout());
    let started = Instant::now();
    let mut reports = Vec::with_capacity(seasons.len());

    for &season in seasons {
        info!("scraping NBA schedules for {season}...");
        let (rows, report) = fetch_season_schedule(source, config, season).await?;
        if rows.is_empty() {
            warn!("season {season}: no regular or postseason games, nothing written");
        } else {
            store.write_season(season, &rows)?;
            info!("season {season}: wrote {} games", rows.len());
        }
        reports.push(report);
    }

    info!(
        "{:.2} minutes to download {} seasons of schedules",
        started.elapsed().as_secs_f64() / 60.0,
        seasons.len()
    );
    let total = store.write_master()?;
    info!("master schedule: {total} rows");
    Ok(reports)
}

/// Game ids of a schedule, for tests and joins.
pub fn game_ids(rows: &[ScheduleRow]) -> Vec<GameId> {
    rows.iter().map(|r| r.game_id).collect()
}
