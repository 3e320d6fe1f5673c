use crate::error::{PipelineError, PipelineResult};
use nba_api::Season;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PUBLIC_BASE_URL: &str =
    "https://raw.githubusercontent.com/sportsdataverse/hoopR-nba-raw/main/nba/json/final";

/// Everything a pipeline entry point needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub max_concurrency: usize,
    /// Per-worker pause after each item; the only throttle against ESPN.
    pub item_delay: Duration,
    pub item_deadline: Option<Duration>,
    pub min_season: Season,
    pub public_base_url: String,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("nba"),
            max_concurrency: 30,
            item_delay: Duration::from_millis(500),
            item_deadline: None,
            min_season: 2002,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_owned(),
            log_file: PathBuf::from("nba_raw_logfile.txt"),
        }
    }
}

impl Config {
    /// Defaults, overridden by `NBA_RAW_*` environment variables.
    pub fn load() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PipelineResult<Self> {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("NBA_RAW_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(n) = var("NBA_RAW_MAX_CONCURRENCY") {
            config.max_concurrency = parse_var::<usize>("NBA_RAW_MAX_CONCURRENCY", &n)?.max(1);
        }
        if let Some(ms) = var("NBA_RAW_ITEM_DELAY_MS") {
            config.item_delay = Duration::from_millis(parse_var("NBA_RAW_ITEM_DELAY_MS", &ms)?);
        }
        if let Some(secs) = var("NBA_RAW_ITEM_DEADLINE_SECS") {
            let secs: u64 = parse_var("NBA_RAW_ITEM_DEADLINE_SECS", &secs)?;
            config.item_deadline = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(url) = var("NBA_RAW_PUBLIC_URL") {
            config.public_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(path) = var("NBA_RAW_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.data_dir)
    }

    /// Inclusive season range, with the start clamped to `min_season` and a
    /// missing end meaning "just the start year".
    pub fn seasons(&self, start: Season, end: Option<Season>) -> Vec<Season> {
        let start = start.max(self.min_season);
        let end = end.unwrap_or(start);
        (start..=end).collect()
    }

    pub fn game_json_url(&self, game_id: nba_api::GameId) -> String {
        format!("{}/{game_id}.json", self.public_base_url)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> PipelineResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| PipelineError::Config(format!("{key}={value:?} is not valid")))
}

/// On-disk layout under `data_dir`.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    pub fn raw_json_dir(&self) -> PathBuf {
        self.root.join("json").join("raw")
    }

    pub fn final_json_dir(&self) -> PathBuf {
        self.root.join("json").join("final")
    }

    pub fn schedules_dir(&self) -> PathBuf {
        self.root.join("schedules")
    }

    pub fn schedule_parquet(&self, season: Season) -> PathBuf {
        self.schedules_dir()
            .join("parquet")
            .join(format!("nba_schedule_{season}.parquet"))
    }

    pub fn schedule_csv(&self, season: Season) -> PathBuf {
        self.schedules_dir()
            .join("csv")
            .join(format!("nba_schedule_{season}.csv"))
    }

    pub fn master_schedule(&self) -> PathBuf {
        self.root.join("nba_schedule_master.parquet")
    }

    pub fn table_parquet(&self, kind: DataKind, season: Season) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join("parquet")
            .join(format!("{}_{season}.parquet", kind.file_prefix()))
    }

    pub fn table_csv(&self, kind: DataKind, season: Season) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join("csv")
            .join(format!("{}_{season}.csv", kind.file_prefix()))
    }
}

/// The three flattened outputs of the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Plays,
    TeamBox,
    PlayerBox,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Plays, DataKind::TeamBox, DataKind::PlayerBox];

    pub fn dir_name(&self) -> &'static str {
        match self {
            DataKind::Plays => "pbp",
            DataKind::TeamBox => "team_box",
            DataKind::PlayerBox => "player_box",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            DataKind::Plays => "play_by_play",
            DataKind::TeamBox => "team_box",
            DataKind::PlayerBox => "player_box",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataKind::Plays => "play-by-play",
            DataKind::TeamBox => "team box",
            DataKind::PlayerBox => "player box",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_stable() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_concurrency, 30);
        assert_eq!(config.item_delay, Duration::from_millis(500));
        assert_eq!(config.item_deadline, None);
        assert_eq!(config.min_season, 2002);
    }

    #[test]
    fn env_overrides_apply() {
        let config = Config::from_lookup(lookup(&[
            ("NBA_RAW_DATA_DIR", "/tmp/nba"),
            ("NBA_RAW_MAX_CONCURRENCY", "4"),
            ("NBA_RAW_ITEM_DELAY_MS", "0"),
            ("NBA_RAW_ITEM_DEADLINE_SECS", "20"),
            ("NBA_RAW_PUBLIC_URL", "https://example.org/final/"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/nba"));
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.item_delay, Duration::ZERO);
        assert_eq!(config.item_deadline, Some(Duration::from_secs(20)));
        assert_eq!(
            config.game_json_url(nba_api::GameId(401)),
            "https://example.org/final/401.json"
        );
    }

    #[test]
    fn bad_env_value_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[("NBA_RAW_MAX_CONCURRENCY", "many")])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn season_range_clamps_and_defaults_end() {
        let config = Config::default();
        assert_eq!(config.seasons(1999, Some(2003)), vec![2002, 2003]);
        assert_eq!(config.seasons(2020, None), vec![2020]);
        assert!(config.seasons(2024, Some(2023)).is_empty());
    }

    #[test]
    fn layout_paths() {
        let layout = Layout::new(Path::new("nba"));
        assert_eq!(layout.raw_json_dir(), PathBuf::from("nba/json/raw"));
        assert_eq!(
            layout.table_parquet(DataKind::Plays, 2023),
            PathBuf::from("nba/pbp/parquet/play_by_play_2023.parquet")
        );
        assert_eq!(
            layout.schedule_csv(2023),
            PathBuf::from("nba/schedules/csv/nba_schedule_2023.csv")
        );
    }
}
