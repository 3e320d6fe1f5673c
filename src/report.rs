use crate::pool::Settled;
use nba_api::Season;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Schedules,
    Games,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Schedules => "schedules",
            Stage::Games => "games",
            Stage::Extract => "extract",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Complete,
    Partial,
    Failed,
    Empty,
}

/// What one stage did for one season. Replaces "read the log file to find out".
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonReport {
    pub season: Season,
    pub stage: Stage,
    pub attempted: usize,
    pub succeeded: usize,
    /// `(key, reason)` for every item that contributed nothing.
    pub skipped: Vec<(String, String)>,
}

impl SeasonReport {
    pub fn new(season: Season, stage: Stage) -> Self {
        Self {
            season,
            stage,
            attempted: 0,
            succeeded: 0,
            skipped: Vec::new(),
        }
    }

    pub fn from_outcomes<K: fmt::Display, T>(
        season: Season,
        stage: Stage,
        outcomes: &[(K, Settled<T>)],
    ) -> Self {
        let mut report = Self::new(season, stage);
        for (key, outcome) in outcomes {
            match outcome {
                Ok(_) => report.record_success(),
                Err(reason) => report.record_skip(key, reason.clone()),
            }
        }
        report
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self, key: impl fmt::Display, reason: impl Into<String>) {
        self.attempted += 1;
        self.skipped.push((key.to_string(), reason.into()));
    }

    pub fn status(&self) -> Status {
        match (self.attempted, self.succeeded) {
            (0, _) => Status::Empty,
            (_, 0) => Status::Failed,
            (a, s) if a == s => Status::Complete,
            _ => Status::Partial,
        }
    }
}

impl fmt::Display for SeasonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {:?} ({}/{} ok",
            self.stage,
            self.season,
            self.status(),
            self.succeeded,
            self.attempted
        )?;
        if !self.skipped.is_empty() {
            let keys: Vec<&str> = self.skipped.iter().take(10).map(|(k, _)| k.as_str()).collect();
            write!(f, ", skipped: {}", keys.join(", "))?;
            if self.skipped.len() > keys.len() {
                write!(f, " (+{} more)", self.skipped.len() - keys.len())?;
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let mut r = SeasonReport::new(2023, Stage::Games);
        assert_eq!(r.status(), Status::Empty);
        r.record_success();
        assert_eq!(r.status(), Status::Complete);
        r.record_skip(401, "not found");
        assert_eq!(r.status(), Status::Partial);

        let mut failed = SeasonReport::new(2023, Stage::Games);
        failed.record_skip(1, "boom");
        assert_eq!(failed.status(), Status::Failed);
    }

    #[test]
    fn from_outcomes_counts_each_kind() {
        let outcomes: Vec<(u32, Settled<()>)> = vec![
            (1, Ok(())),
            (2, Err("missing field `header`".into())),
            (3, Ok(())),
        ];
        let r = SeasonReport::from_outcomes(2024, Stage::Schedules, &outcomes);
        assert_eq!(r.attempted, 3);
        assert_eq!(r.succeeded, 2);
        assert_eq!(r.skipped, vec![("2".to_string(), "missing field `header`".to_string())]);
    }

    #[test]
    fn display_lists_skipped_keys() {
        let mut r = SeasonReport::new(2022, Stage::Extract);
        r.record_success();
        r.record_skip(7, "bad shape");
        assert_eq!(r.to_string(), "extract 2022: Partial (1/2 ok, skipped: 7)");
    }
}
