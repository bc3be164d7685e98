//! Fixed-interval polling with an overall deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Why a poll loop ended without the predicate becoming true.
#[derive(Debug)]
pub enum WaitError<E> {
    /// The predicate never held within the timeout.
    Timeout(Duration),
    /// The predicate itself failed; polling stops immediately.
    Check(E),
}

/// Waits `interval`, evaluates `check`, and repeats until it returns
/// `Ok(true)`, returns an error, or `timeout` has elapsed.
///
/// The first check happens one interval after the call. No backoff.
///
/// # Arguments
///
/// * `interval` - Delay before every check, including the first
/// * `timeout` - Overall budget, tested after each failed check
/// * `check` - Predicate; an `Err` ends the loop as [`WaitError::Check`]
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use devsync::reconcile::{poll_until, WaitError};
///
/// let result = poll_until(Duration::from_millis(1500), Duration::from_secs(300), || async {
///     let object = client.get_reconcilable(&target.object).await?;
///     Ok::<_, ClientError>(object.has_handled(&requested))
/// })
/// .await;
///
/// if let Err(WaitError::Timeout(after)) = result {
///     log::warn!("Still waiting after {:?}", after);
/// }
/// ```
pub async fn poll_until<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        tokio::time::sleep(interval).await;

        if check().await.map_err(WaitError::Check)? {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout(timeout));
        }
    }
}
