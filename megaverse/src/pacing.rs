use std::future::Future;
use tokio::time::{Duration, sleep};

/// A step of a paced run that failed; everything after it was left unattempted.
#[derive(Debug)]
pub(crate) struct StepFailure<T, E> {
    pub index: usize,
    pub item: T,
    pub completed: usize,
    pub error: E,
}

/// Runs `step` over `items` one at a time, sleeping `delay` between
/// consecutive successful steps. Nothing is awaited after the last step, and
/// the run halts at the first error.
///
/// Returns the number of completed steps.
pub(crate) async fn run_paced<I, T, E, F, Fut>(
    items: I,
    delay: Duration,
    mut step: F,
) -> Result<usize, StepFailure<T, E>>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut items = items.into_iter().enumerate().peekable();
    let mut completed = 0;

    while let Some((index, item)) = items.next() {
        if let Err(error) = step(item.clone()).await {
            return Err(StepFailure {
                index,
                item,
                completed,
                error,
            });
        }
        completed += 1;

        if items.peek().is_some() && !delay.is_zero() {
            sleep(delay).await;
        }
    }

    Ok(completed)
}
