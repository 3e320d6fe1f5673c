//! Bounded concurrent fetcher.
//!
//! Runs one async work function per key with at most `max_concurrency` in
//! flight. Each item is classified as a [`FetchOutcome`]. A skip is recorded
//! and the batch carries on. A fatal outcome stops the batch: no further keys
//! are dispatched and in-flight items are dropped.

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult, error_chain};
use futures_util::StreamExt;
use futures_util::stream;
use log::{error, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug)]
pub enum FetchOutcome<T> {
    Success(T),
    Skipped(String),
    Fatal(PipelineError),
}

impl<T> FetchOutcome<T> {
    pub fn classify(result: PipelineResult<T>) -> Self {
        match result {
            Ok(value) => FetchOutcome::Success(value),
            Err(e) if e.is_transient() => FetchOutcome::Skipped(error_chain(&e)),
            Err(e) => FetchOutcome::Fatal(e),
        }
    }
}

/// A finished item once fatal outcomes are ruled out: the value, or the skip
/// reason.
pub type Settled<T> = Result<T, String>;

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_concurrency: usize,
    pub item_delay: Duration,
    pub item_deadline: Option<Duration>,
}

impl From<&Config> for PoolOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            item_delay: config.item_delay,
            item_deadline: config.item_deadline,
        }
    }
}

impl PoolOptions {
    pub fn workers_for(&self, items: usize) -> usize {
        self.max_concurrency.min(items).max(1)
    }
}

/// Run `work` for every key. Returns one settled item per key in completion
/// order, or [`PipelineError::Aborted`] on the first fatal outcome.
pub async fn run_bounded<K, T, F, Fut>(
    keys: Vec<K>,
    options: PoolOptions,
    work: F,
) -> PipelineResult<Vec<(K, Settled<T>)>>
where
    K: Clone + Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let workers = options.workers_for(keys.len());
    let total = keys.len();

    let mut in_flight = stream::iter(keys)
        .map(|key| {
            let item = work(key.clone());
            async move {
                let result = match options.item_deadline {
                    Some(deadline) => tokio::time::timeout(deadline, item)
                        .await
                        .unwrap_or_else(|_| Err(PipelineError::Deadline(deadline))),
                    None => item.await,
                };
                if !options.item_delay.is_zero() {
                    tokio::time::sleep(options.item_delay).await;
                }
                (key, FetchOutcome::classify(result))
            }
        })
        .buffer_unordered(workers);

    let mut outcomes = Vec::with_capacity(total);
    while let Some((key, outcome)) = in_flight.next().await {
        match outcome {
            FetchOutcome::Fatal(e) => {
                error!("aborting batch at {key}: {}", error_chain(&e));
                return Err(PipelineError::Aborted {
                    key: key.to_string(),
                    source: Box::new(e),
                });
            }
            FetchOutcome::Skipped(reason) => {
                warn!("skipping {key}: {reason}");
                outcomes.push((key, Err(reason)));
            }
            FetchOutcome::Success(value) => outcomes.push((key, Ok(value))),
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nba_api::client::ApiError;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options(max_concurrency: usize) -> PoolOptions {
        PoolOptions {
            max_concurrency,
            item_delay: Duration::ZERO,
            item_deadline: None,
        }
    }

    #[test]
    fn workers_are_capped_by_items_and_limit() {
        assert_eq!(options(30).workers_for(4), 4);
        assert_eq!(options(3).workers_for(40), 3);
        assert_eq!(options(3).workers_for(0), 1);
    }

    #[test]
    fn classification_follows_the_error_taxonomy() {
        let skipped = FetchOutcome::<()>::classify(Err(PipelineError::Deadline(Duration::from_secs(1))));
        assert!(matches!(skipped, FetchOutcome::Skipped(ref r) if r.contains("deadline")));
        let fatal = FetchOutcome::<()>::classify(Err(PipelineError::Config("bad".into())));
        assert!(matches!(fatal, FetchOutcome::Fatal(PipelineError::Config(_))));
        assert!(matches!(FetchOutcome::classify(Ok(3)), FetchOutcome::Success(3)));
    }

    #[tokio::test]
    async fn transient_failure_is_isolated() {
        let outcomes = run_bounded(vec![1, 2, 3, 4], options(2), |k: u32| async move {
            if k == 3 {
                Err(PipelineError::Api(ApiError::NotFound(format!("game {k}"))))
            } else {
                Ok(k * 10)
            }
        })
        .await
        .expect("batch completes");

        assert_eq!(outcomes.len(), 4);
        let mut ok: Vec<u32> = outcomes
            .iter()
            .filter_map(|(_, o)| o.as_ref().ok().copied())
            .collect();
        ok.sort_unstable();
        assert_eq!(ok, vec![10, 20, 40]);

        let skipped: Vec<_> = outcomes
            .iter()
            .filter(|(_, o)| o.is_err())
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(skipped, vec![3]);
    }

    #[tokio::test]
    async fn unclassified_failure_stops_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        let err = run_bounded(vec![1, 2, 3, 4], options(1), move |k: u32| {
            let seen = seen_in.clone();
            async move {
                seen.lock().unwrap().push(k);
                if k == 2 {
                    Err(PipelineError::Table("disk on fire".into()))
                } else {
                    Ok(k)
                }
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Aborted { ref key, .. } if key == "2"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_cap() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (c, p) = (current.clone(), peak.clone());

        let outcomes = run_bounded((0..20).collect(), options(3), move |k: u32| {
            let (c, p) = (c.clone(), p.clone());
            async move {
                let now = c.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                c.fetch_sub(1, Ordering::SeqCst);
                Ok(k)
            }
        })
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn deadline_turns_slow_items_into_skips() {
        let opts = PoolOptions {
            item_deadline: Some(Duration::from_millis(20)),
            ..options(4)
        };
        let outcomes = run_bounded(vec![1u32, 2], opts, |k| async move {
            if k == 2 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(k)
        })
        .await
        .unwrap();

        let skipped: Vec<_> = outcomes
            .iter()
            .filter(|(_, o)| o.is_err())
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(skipped, vec![2]);
    }

    #[tokio::test]
    async fn empty_batch_is_fine() {
        let outcomes = run_bounded(Vec::<u32>::new(), options(4), |k| async move { Ok(k) })
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
