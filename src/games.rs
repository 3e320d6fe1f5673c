//! Game fetcher: raw summaries into the cache, normalized payloads next to
//! them, then the schedule gets linked to what landed on disk.

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult, error_chain};
use crate::pool::{PoolOptions, Settled, run_bounded};
use crate::report::{SeasonReport, Stage};
use crate::schedule::ScheduleStore;
use crate::source::GameSource;
use crate::store::{GameCache, Partition};
use log::{debug, info, warn};
use nba_api::pbp::normalize_game;
use nba_api::{GameId, ScheduleRow, Season};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFetchOptions {
    /// Also normalize into the final partition.
    pub process: bool,
    /// Leave games that already have a final payload alone.
    pub skip_if_exists: bool,
}

impl Default for GameFetchOptions {
    fn default() -> Self {
        Self {
            process: true,
            skip_if_exists: false,
        }
    }
}

impl GameFetchOptions {
    pub fn from_flags(rescrape: bool, process: bool) -> Self {
        Self {
            process,
            skip_if_exists: !rescrape,
        }
    }
}

/// How far a successful fetch got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameFetch {
    Cached,
    Raw,
    Final,
}

/// Fetch one game into the raw partition and, when processing, derive its
/// final payload from the stored raw bytes.
pub async fn fetch_game<S: GameSource>(
    source: &S,
    cache: &GameCache,
    game_id: GameId,
    options: GameFetchOptions,
) -> PipelineResult<GameFetch> {
    if options.skip_if_exists && cache.contains(Partition::Final, game_id) {
        debug!("game {game_id} already cached, skipping");
        return Ok(GameFetch::Cached);
    }

    let raw = source.raw_game(game_id).await?;
    let bytes = serde_json::to_vec(&raw)
        .map_err(|e| PipelineError::Decode(e, format!("raw payload for game {game_id}")))?;
    cache.write(Partition::Raw, game_id, &bytes)?;

    if !options.process {
        return Ok(GameFetch::Raw);
    }
    process_game(cache, game_id).map_err(|e| {
        if e.is_transient() {
            PipelineError::PostProcessing(Box::new(e))
        } else {
            e
        }
    })?;
    Ok(GameFetch::Final)
}

/// Normalize `raw/<id>` into `final/<id>`.
pub fn process_game(cache: &GameCache, game_id: GameId) -> PipelineResult<()> {
    let raw = cache.read_json(Partition::Raw, game_id)?;
    let payload = normalize_game(game_id, &raw)?;
    let bytes = serde_json::to_vec(&payload)
        .map_err(|e| PipelineError::Decode(e, format!("final payload for game {game_id}")))?;
    cache.write(Partition::Final, game_id, &bytes)
}

pub async fn fetch_games<S: GameSource>(
    source: &S,
    config: &Config,
    cache: &GameCache,
    game_ids: Vec<GameId>,
    options: GameFetchOptions,
) -> PipelineResult<Vec<(GameId, Settled<GameFetch>)>> {
    run_bounded(game_ids, PoolOptions::from(config), |game_id| {
        fetch_game(source, cache, game_id, options)
    })
    .await
}

/// Completed games of `season` (and not before `min_season`), in schedule
/// order by season then season type.
pub fn select_games(rows: &[ScheduleRow], season: Season, min_season: Season) -> Vec<GameId> {
    let mut sorted: Vec<&ScheduleRow> = rows.iter().collect();
    sorted.sort_by_key(|r| (r.season, r.season_type));
    sorted
        .into_iter()
        .filter(|r| r.status_type_completed)
        .filter(|r| r.season >= min_season && r.season == season)
        .map(|r| r.game_id)
        .collect()
}

/// Set `has_raw_json` and `game_json_url` from what is in the cache right now.
pub fn link_games_to_schedule(
    rows: &mut [ScheduleRow],
    cache: &GameCache,
    config: &Config,
) -> PipelineResult<()> {
    let raw = cache.keys(Partition::Raw)?;
    let finals = cache.keys(Partition::Final)?;
    for row in rows.iter_mut() {
        row.has_raw_json = Some(raw.contains(&row.game_id));
        row.game_json_url = finals
            .contains(&row.game_id)
            .then(|| config.game_json_url(row.game_id));
    }
    Ok(())
}

/// Game Fetcher entry point.
pub async fn run_games<S: GameSource>(
    source: &S,
    config: &Config,
    seasons: &[Season],
    options: GameFetchOptions,
) -> PipelineResult<Vec<SeasonReport>> {
    let layout = config.layout();
    let cache = GameCache::new(&layout);
    let store = ScheduleStore::new(layout);
    let mut reports = Vec::with_capacity(seasons.len());

    for &season in seasons {
        let mut schedule = match store.read_season(season) {
            Ok(rows) => rows,
            Err(e) if e.is_transient() => {
                let reason = error_chain(&e);
                warn!("season {season}: no schedule to work from: {reason}");
                let mut report = SeasonReport::new(season, Stage::Games);
                report.record_skip("schedule", reason);
                reports.push(report);
                continue;
            }
            Err(e) => return Err(e),
        };

        info!("scraping NBA play-by-play for {season}...");
        let games = select_games(&schedule, season, config.min_season);
        info!("number of games: {}", games.len());

        let started = Instant::now();
        let total = games.len();
        let outcomes = fetch_games(source, config, &cache, games, options).await?;
        info!(
            "{:.2} minutes to download {total} game play-by-plays",
            started.elapsed().as_secs_f64() / 60.0
        );
        reports.push(SeasonReport::from_outcomes(season, Stage::Games, &outcomes));

        link_games_to_schedule(&mut schedule, &cache, config)?;
        store.write_season(season, &schedule)?;
        info!("finished NBA play-by-play for {season}");
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeSource, schedule_row};
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config, GameCache) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            item_delay: Duration::ZERO,
            ..Config::default()
        };
        let cache = GameCache::new(&config.layout());
        (dir, config, cache)
    }

    fn ids(raw: &[u64]) -> Vec<GameId> {
        raw.iter().copied().map(GameId).collect()
    }

    #[tokio::test]
    async fn one_missing_game_does_not_sink_the_batch() {
        let (_dir, config, cache) = setup();
        let source = FakeSource::with_games(&[1, 2, 4]);

        let outcomes = fetch_games(&source, &config, &cache, ids(&[1, 2, 3, 4]), GameFetchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes.iter().filter(|(_, o)| o.is_ok()).count(), 3);
        let expected: std::collections::BTreeSet<_> = ids(&[1, 2, 4]).into_iter().collect();
        assert_eq!(cache.keys(Partition::Raw).unwrap(), expected);
        assert_eq!(cache.keys(Partition::Final).unwrap(), expected);
    }

    #[tokio::test]
    async fn refetching_gives_identical_final_bytes() {
        let (_dir, _config, cache) = setup();
        let source = FakeSource::with_games(&[401]);
        let options = GameFetchOptions::default();

        assert_eq!(fetch_game(&source, &cache, GameId(401), options).await.unwrap(), GameFetch::Final);
        let first = cache.read(Partition::Final, GameId(401)).unwrap();
        fetch_game(&source, &cache, GameId(401), options).await.unwrap();
        let second = cache.read(Partition::Final, GameId(401)).unwrap();

        assert_eq!(first, second);
        assert_eq!(source.game_calls().len(), 2);
    }

    #[tokio::test]
    async fn skip_if_exists_makes_no_calls_for_cached_games() {
        let (_dir, _config, cache) = setup();
        let source = FakeSource::with_games(&[401]);

        fetch_game(&source, &cache, GameId(401), GameFetchOptions::default()).await.unwrap();
        let options = GameFetchOptions::from_flags(false, true);
        let fetched = fetch_game(&source, &cache, GameId(401), options).await.unwrap();

        assert_eq!(fetched, GameFetch::Cached);
        assert_eq!(source.game_calls(), vec![GameId(401)]);
    }

    #[tokio::test]
    async fn without_processing_only_raw_is_written() {
        let (_dir, _config, cache) = setup();
        let source = FakeSource::with_games(&[5]);
        let options = GameFetchOptions::from_flags(true, false);

        assert_eq!(fetch_game(&source, &cache, GameId(5), options).await.unwrap(), GameFetch::Raw);
        assert!(cache.contains(Partition::Raw, GameId(5)));
        assert!(!cache.contains(Partition::Final, GameId(5)));
    }

    #[tokio::test]
    async fn post_processing_failure_keeps_raw() {
        let (_dir, config, cache) = setup();
        let mut source = FakeSource::default();
        source.games.insert(GameId(9), json!({"plays": []}));

        let outcomes = fetch_games(&source, &config, &cache, ids(&[9]), GameFetchOptions::default())
            .await
            .unwrap();

        match &outcomes[0].1 {
            Err(reason) => {
                assert!(reason.starts_with("post-processing failed"), "{reason}");
                assert!(reason.contains("header"), "{reason}");
            }
            Ok(fetched) => panic!("expected a skip, got {fetched:?}"),
        }
        assert!(cache.contains(Partition::Raw, GameId(9)));
        assert!(!cache.contains(Partition::Final, GameId(9)));
    }

    #[tokio::test]
    async fn unwritable_store_aborts_the_batch() {
        let (dir, config, cache) = setup();
        // A plain file where the json directory should be.
        fs::write(dir.path().join("json"), b"").unwrap();
        let source = FakeSource::with_games(&[1, 2]);

        let err = fetch_games(&source, &config, &cache, ids(&[1, 2]), GameFetchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Aborted { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn link_marks_raw_and_final_membership() {
        let (_dir, config, cache) = setup();
        cache.write(Partition::Raw, GameId(1), b"{}").unwrap();
        cache.write(Partition::Raw, GameId(2), b"{}").unwrap();
        cache.write(Partition::Final, GameId(1), b"{}").unwrap();

        let mut rows = vec![schedule_row(1, 2024), schedule_row(2, 2024), schedule_row(3, 2024)];
        link_games_to_schedule(&mut rows, &cache, &config).unwrap();

        let raw: Vec<_> = rows.iter().map(|r| r.has_raw_json).collect();
        assert_eq!(raw, vec![Some(true), Some(true), Some(false)]);
        assert_eq!(rows[0].game_json_url.as_deref(), Some(config.game_json_url(GameId(1)).as_str()));
        assert_eq!(rows[1].game_json_url, None);
        assert_eq!(rows[2].game_json_url, None);
    }

    #[test]
    fn select_games_keeps_completed_games_of_the_season() {
        let mut pending = schedule_row(3, 2024);
        pending.status_type_completed = false;
        let mut playoff = schedule_row(1, 2024);
        playoff.season_type = 3;
        let rows = vec![playoff, schedule_row(2, 2024), pending, schedule_row(4, 2023)];

        assert_eq!(select_games(&rows, 2024, 2002), ids(&[2, 1]));
        assert!(select_games(&rows, 2024, 2025).is_empty());
    }

    #[tokio::test]
    async fn run_games_fetches_and_links_the_schedule() {
        let (_dir, config, _cache) = setup();
        let mut pending = schedule_row(3, 2024);
        pending.status_type_completed = false;
        let store = ScheduleStore::new(config.layout());
        store
            .write_season(2024, &[schedule_row(1, 2024), schedule_row(2, 2024), pending])
            .unwrap();
        let source = FakeSource::with_games(&[1, 2, 3]);

        let reports = run_games(&source, &config, &[2024], GameFetchOptions::default())
            .await
            .unwrap();

        assert_eq!(reports[0].attempted, 2);
        assert_eq!(reports[0].succeeded, 2);
        let mut calls = source.game_calls();
        calls.sort();
        assert_eq!(calls, ids(&[1, 2]));

        let linked = store.read_season(2024).unwrap();
        assert_eq!(linked.len(), 3);
        let flags: Vec<_> = linked.iter().map(|r| r.has_raw_json).collect();
        assert_eq!(flags, vec![Some(true), Some(true), Some(false)]);
        assert!(linked[0].game_json_url.is_some());
    }

    #[tokio::test]
    async fn season_without_schedule_is_reported_not_fatal() {
        let (_dir, config, _cache) = setup();
        let source = FakeSource::default();
        let reports = run_games(&source, &config, &[2030], GameFetchOptions::default())
            .await
            .unwrap();
        assert_eq!(reports[0].skipped[0].0, "schedule");
    }
}
