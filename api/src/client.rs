use crate::espn::{CalendarResponse, EspnCompetitor, EspnEvent, ScoreboardResponse};
use crate::{GameId, ScheduleRow, Season};
use chrono::NaiveDate;
use log::debug;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const ESPN_SITE_V2: &str = "https://site.api.espn.com/apis/site/v2/sports/basketball/nba";
const ESPN_CORE_V2: &str = "https://sports.core.api.espn.com/v2/sports/basketball/leagues/nba";

/// NBA API client backed by ESPN's public endpoints.
#[derive(Debug, Clone)]
pub struct NbaApi {
    client: Client,
    timeout: Duration,
    site_base: String,
    core_base: String,
}

impl Default for NbaApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("nba-raw/0.1 (bulk schedule and play-by-play downloader)")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(10),
            site_base: ESPN_SITE_V2.to_owned(),
            core_base: ESPN_CORE_V2.to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

// `Display` already carries the reqwest error text.
impl std::error::Error for ApiError {}

impl NbaApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at different hosts (mock servers, mirrors).
    pub fn with_base_urls(site_base: impl Into<String>, core_base: impl Into<String>) -> Self {
        Self {
            site_base: site_base.into().trim_end_matches('/').to_owned(),
            core_base: core_base.into().trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    /// Every date in `season` on which at least one game is scheduled, in
    /// calendar order.
    pub async fn fetch_season_dates(&self, season: Season) -> ApiResult<Vec<NaiveDate>> {
        let url = format!(
            "{}/seasons/{season}/types/2/calendar/ondays",
            self.core_base
        );
        let raw: CalendarResponse = self.get(&url).await?;
        Ok(parse_calendar(raw))
    }

    /// All games ESPN lists on the scoreboard for one date.
    pub async fn fetch_schedule(&self, date: NaiveDate) -> ApiResult<Vec<ScheduleRow>> {
        let url = format!(
            "{}/scoreboard?dates={}&limit=1000",
            self.site_base,
            date_param(date)
        );
        let raw: ScoreboardResponse = self.get(&url).await?;
        let rows = raw
            .events
            .unwrap_or_default()
            .iter()
            .filter_map(map_event_to_schedule_row)
            .collect();
        Ok(rows)
    }

    /// The unprocessed game summary (play-by-play + box score) for one game.
    ///
    /// Unlike the typed endpoints, a 4xx here is an error: an empty document
    /// would be cached as if it were a real game.
    pub async fn fetch_game_raw(&self, game_id: GameId) -> ApiResult<serde_json::Value> {
        let url = format!("{}/summary?event={game_id}", self.site_base);
        debug!("fetching summary for game {game_id}");
        let response = self.send(&url).await?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<serde_json::Value>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.clone())),
            Err(e) => {
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    Err(ApiError::NotFound(format!("game {game_id} ({e})")))
                } else {
                    Err(ApiError::Api(e, url.clone()))
                }
            }
        }
    }

    async fn send(&self, url: &str) -> ApiResult<reqwest::Response> {
        self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))
    }

    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self.send(url).await?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => {
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, url.to_owned()))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: ESPN wire types → clean domain types
// ---------------------------------------------------------------------------

pub fn date_param(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn parse_calendar(raw: CalendarResponse) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = raw
        .event_date
        .and_then(|d| d.dates)
        .unwrap_or_default()
        .iter()
        .filter_map(|d| d.get(..10))
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Map a scoreboard event to a schedule row. Events without a numeric id or a
/// season block cannot be keyed or filtered, so they are dropped.
fn map_event_to_schedule_row(event: &EspnEvent) -> Option<ScheduleRow> {
    let game_id = event.id.as_deref()?.parse::<GameId>().ok()?;
    let season = event.season.as_ref()?;

    let competition = event
        .competitions
        .as_deref()
        .unwrap_or_default()
        .first()
        .cloned()
        .unwrap_or_default();

    let status = competition
        .status
        .clone()
        .or_else(|| event.status.clone())
        .unwrap_or_default();
    let status_type = status.status_type.clone().unwrap_or_default();

    let competitors = competition.competitors.as_deref().unwrap_or_default();
    let (home, away) = split_home_away(competitors);
    let home_team = home.team.clone().unwrap_or_default();
    let away_team = away.team.clone().unwrap_or_default();

    let venue = competition.venue.clone().unwrap_or_default();
    let address = venue.address.clone().unwrap_or_default();

    Some(ScheduleRow {
        game_id,
        uid: event.uid.clone(),
        season: season.year.unwrap_or_default(),
        season_type: season.season_type.unwrap_or_default(),
        season_slug: season.slug.clone(),
        date: competition.date.clone().or_else(|| event.date.clone()),
        name: event.name.clone(),
        short_name: event.short_name.clone(),
        attendance: competition.attendance,
        neutral_site: competition.neutral_site,
        conference_competition: competition.conference_competition,
        venue_full_name: venue.full_name,
        venue_city: address.city,
        venue_state: address.state,
        status_type_id: status_type.id,
        status_type_name: status_type.name,
        status_type_state: status_type.state,
        status_type_completed: status_type.completed.unwrap_or(false),
        status_type_detail: status_type.detail,
        status_period: status.period,
        status_display_clock: status.display_clock.unwrap_or_default(),
        home_id: home_team.id.or_else(|| home.id.clone()),
        home_abbreviation: home_team.abbreviation,
        home_display_name: home_team.display_name,
        home_name: home_team.name,
        home_location: home_team.location,
        home_color: home_team.color,
        home_logo: home_team.logo,
        home_score: home.score,
        home_winner: home.winner,
        away_id: away_team.id.or_else(|| away.id.clone()),
        away_abbreviation: away_team.abbreviation,
        away_display_name: away_team.display_name,
        away_name: away_team.name,
        away_location: away_team.location,
        away_color: away_team.color,
        away_logo: away_team.logo,
        away_score: away.score,
        away_winner: away.winner,
        ..Default::default()
    })
}

/// Use "home"/"away" when ESPN labels them; fall back to index order.
pub(crate) fn split_home_away(competitors: &[EspnCompetitor]) -> (EspnCompetitor, EspnCompetitor) {
    let home = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("home"))
        .or_else(|| competitors.first());
    let away = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("away"))
        .or_else(|| competitors.get(1));
    (
        home.cloned().unwrap_or_default(),
        away.cloned().unwrap_or_default(),
    )
}
