use chrono::NaiveDate;
use nba_api::client::{ApiResult, NbaApi};
use nba_api::{GameId, ScheduleRow, Season};
use std::future::Future;

/// The remote capability the pipelines consume.
pub trait GameSource: Sync {
    fn season_dates(&self, season: Season) -> impl Future<Output = ApiResult<Vec<NaiveDate>>> + Send;

    fn schedule_for(&self, date: NaiveDate) -> impl Future<Output = ApiResult<Vec<ScheduleRow>>> + Send;

    fn raw_game(&self, game_id: GameId) -> impl Future<Output = ApiResult<serde_json::Value>> + Send;
}

impl GameSource for NbaApi {
    async fn season_dates(&self, season: Season) -> ApiResult<Vec<NaiveDate>> {
        self.fetch_season_dates(season).await
    }

    async fn schedule_for(&self, date: NaiveDate) -> ApiResult<Vec<ScheduleRow>> {
        self.fetch_schedule(date).await
    }

    async fn raw_game(&self, game_id: GameId) -> ApiResult<serde_json::Value> {
        self.fetch_game_raw(game_id).await
    }
}
