use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::errors::PricingError;

/// Runs `work` over every item with at most `concurrency` in flight.
///
/// Results come back in input order. A failing or panicking item only affects its own slot.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    work: F,
) -> Vec<Result<R, PricingError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, PricingError>> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let work = Arc::new(work);
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, work(index, item).await)
        });
    }

    let mut slots: Vec<Option<Result<R, PricingError>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(error) => warn!(
                event_name = "pricing.batch.task_failed",
                error = %error,
                "batch item task did not complete"
            ),
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(PricingError::TaskFailed("item did not complete".to_string()))
            })
        })
        .collect()
}
