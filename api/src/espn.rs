/// ESPN API raw wire types: serde shapes for deserializing ESPN responses.
/// These map to our clean domain types via the mapping functions in client.rs
/// and pbp.rs.
use serde::{Deserialize, Deserializer};

/// ESPN is inconsistent about ids: the same field arrives as `"401"` on one
/// endpoint and `401` on another.
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(|id| match id {
        IdRepr::Text(s) => s,
        IdRepr::Int(n) => n.to_string(),
        IdRepr::Float(f) => f.to_string(),
    }))
}

/// Scores come as `"104"` on the scoreboard and as numbers in plays.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_string(deserializer)?.and_then(|s| s.trim().parse::<u32>().ok()))
}

// ---------------------------------------------------------------------------
// Season calendar  (core v2 API, ondays)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub event_date: Option<CalendarDates>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CalendarDates {
    pub dates: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnEvent {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub uid: Option<String>,
    pub date: Option<String>, // ISO 8601
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub season: Option<EspnSeason>,
    pub competitions: Option<Vec<EspnCompetition>>,
    pub status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnSeason {
    pub year: Option<u16>,
    #[serde(rename = "type")]
    pub season_type: Option<u8>,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnCompetition {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub date: Option<String>,
    pub attendance: Option<u64>,
    pub neutral_site: Option<bool>,
    pub conference_competition: Option<bool>,
    pub venue: Option<EspnVenue>,
    pub competitors: Option<Vec<EspnCompetitor>>,
    pub status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
    pub period: Option<u8>,
    pub display_clock: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatusType {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub name: Option<String>, // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"
    pub state: Option<String>, // "pre" | "in" | "post"
    pub completed: Option<bool>,
    pub detail: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EspnCompetitor {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub home_away: Option<String>, // "home" | "away"
    pub team: Option<EspnTeam>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub score: Option<u32>,
    pub winner: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EspnTeam {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub abbreviation: Option<String>,
    pub display_name: Option<String>,
    pub short_display_name: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EspnVenue {
    pub full_name: Option<String>,
    pub address: Option<EspnAddress>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnAddress {
    pub city: Option<String>,
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Game summary (site v2 API), only the parts the normalizer reads.
// The boxscore is kept as an untyped document and flattened downstream.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SummaryResponse {
    pub header: Option<EspnHeader>,
    pub plays: Option<Vec<EspnPlay>>,
    pub boxscore: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnHeader {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub season: Option<EspnSeason>,
    pub competitions: Option<Vec<EspnCompetition>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnPlay {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "id_string")]
    pub sequence_number: Option<String>,
    #[serde(rename = "type")]
    pub play_type: Option<EspnPlayType>,
    pub text: Option<String>,
    pub away_score: Option<i64>,
    pub home_score: Option<i64>,
    pub period: Option<EspnPeriod>,
    pub clock: Option<EspnClock>,
    pub scoring_play: Option<bool>,
    pub score_value: Option<i64>,
    pub team: Option<EspnRef>,
    pub participants: Option<Vec<EspnParticipant>>,
    pub shooting_play: Option<bool>,
    pub coordinate: Option<EspnCoordinate>,
    pub wallclock: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnPlayType {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnPeriod {
    pub number: Option<u8>,
    pub display_value: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EspnClock {
    pub display_value: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnRef {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnParticipant {
    pub athlete: Option<EspnRef>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCoordinate {
    pub x: Option<f64>,
    pub y: Option<f64>,
}
