//! Repeats a request until the response is acceptable or a deadline expires.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;

use super::request::{GetRequest, Response};
use crate::error::{Error, Result};

/// Default time between two attempts when none is given
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Condition that a response must satisfy to stop polling
pub type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// Anything with an HTTP status that can be polled.
pub trait Polled {
    fn status(&self) -> u16;
}

impl<T> Polled for Response<T> {
    fn status(&self) -> u16 {
        Response::status(self)
    }
}

/// Runs `task` every `interval` until its result has one of the `statuses`
/// (200 when empty) and satisfies all the `predicates`.
///
/// The task receives the overall deadline so that a single attempt can't
/// outlive it. A task error aborts polling, except for a deadline error,
/// which is reported as [`Error::PollTimeout`]. The loop also stops with
/// `PollTimeout` when waiting another interval would pass the deadline.
pub async fn poll<R, F, Fut>(
    interval: Duration,
    timeout: Option<Duration>,
    statuses: &[u16],
    predicates: &[Predicate<R>],
    mut task: F,
) -> Result<R>
where
    R: Polled,
    F: FnMut(Instant) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let timeout = timeout.ok_or_else(|| Error::Poll("a timeout is required".to_string()))?;
    if interval.is_zero() {
        return Err(Error::Poll(
            "interval must be greater than zero".to_string(),
        ));
    }

    let deadline = Instant::now() + timeout;
    let accepted: &[u16] = if statuses.is_empty() { &[200] } else { statuses };
    let mut last_status = 0;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = match task(deadline).await {
            Ok(result) => result,
            Err(Error::DeadlineExceeded) => return Err(Error::PollTimeout { last_status }),
            Err(e) => return Err(e),
        };

        last_status = result.status();
        if accepted.contains(&last_status) && predicates.iter().all(|p| p(&result)) {
            debug!(
                "Poll finished after {} attempts with status {}",
                attempt, last_status
            );
            return Ok(result);
        }

        if Instant::now() + interval > deadline {
            return Err(Error::PollTimeout { last_status });
        }

        debug!(
            "Poll attempt {} got status {}, retrying in {:?}",
            attempt, last_status, interval
        );
        tokio::time::sleep(interval).await;
    }
}

/// Polls a single object through repeated `GET` requests.
pub struct PollRequest<T> {
    request: GetRequest<T>,
    interval: Duration,
    timeout: Option<Duration>,
    statuses: Vec<u16>,
    predicates: Vec<Predicate<Response<T>>>,
}

impl<T: DeserializeOwned> PollRequest<T> {
    pub(crate) fn new(request: GetRequest<T>) -> Self {
        Self {
            request,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: None,
            statuses: Vec::new(),
            predicates: Vec::new(),
        }
    }

    pub fn parameter(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.request = self.request.parameter(name, value);
        self
    }

    pub fn header(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    pub fn interval(mut self, value: Duration) -> Self {
        self.interval = value;
        self
    }

    /// Deadline for the whole poll, required.
    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    /// Adds an accepted status. Without any, only 200 is accepted.
    pub fn status(mut self, value: u16) -> Self {
        self.statuses.push(value);
        self
    }

    /// Adds a condition on the response, all of them must hold.
    pub fn predicate<P>(mut self, value: P) -> Self
    where
        P: Fn(&Response<T>) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(value));
        self
    }

    /// Polls until accepted and returns the accepted response.
    ///
    /// The response may carry an error envelope when an error status, such
    /// as 404 while waiting for a deletion, was accepted.
    pub async fn start(&self) -> Result<Response<T>> {
        poll(
            self.interval,
            self.timeout,
            &self.statuses,
            &self.predicates,
            |deadline| self.request.execute(Some(deadline)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Fake {
        status: u16,
        value: u32,
    }

    impl Polled for Fake {
        fn status(&self) -> u16 {
            self.status
        }
    }

    fn counter_task(
        calls: Arc<AtomicU32>,
        status: u16,
    ) -> impl FnMut(Instant) -> std::pin::Pin<Box<dyn Future<Output = Result<Fake>> + Send>> {
        move |_| {
            let calls = calls.clone();
            Box::pin(async move {
                let value = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Fake { status, value })
            })
        }
    }

    #[tokio::test]
    async fn test_requires_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = poll(
            Duration::from_millis(1),
            None,
            &[],
            &[],
            counter_task(calls.clone(), 200),
        )
        .await;

        assert!(matches!(result, Err(Error::Poll(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_requires_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = poll(
            Duration::ZERO,
            Some(Duration::from_secs(1)),
            &[],
            &[],
            counter_task(calls, 200),
        )
        .await;

        assert!(matches!(result, Err(Error::Poll(_))));
    }

    #[tokio::test]
    async fn test_stops_when_predicates_hold() {
        let calls = Arc::new(AtomicU32::new(0));
        let predicates: Vec<Predicate<Fake>> = vec![Box::new(|f: &Fake| f.value >= 3)];

        let result = poll(
            Duration::from_millis(1),
            Some(Duration::from_secs(5)),
            &[],
            &predicates,
            counter_task(calls.clone(), 200),
        )
        .await
        .unwrap();

        assert_eq!(result.value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_default_status_is_ok() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = poll(
            Duration::from_millis(10),
            Some(Duration::from_millis(35)),
            &[],
            &[],
            counter_task(calls.clone(), 202),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::PollTimeout { last_status: 202 })
        ));
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_accepts_error_status() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = poll(
            Duration::from_millis(1),
            Some(Duration::from_secs(1)),
            &[404],
            &[],
            counter_task(calls, 404),
        )
        .await
        .unwrap();

        assert_eq!(result.status, 404);
    }

    #[tokio::test]
    async fn test_task_error_aborts() {
        let result = poll(
            Duration::from_millis(1),
            Some(Duration::from_secs(1)),
            &[],
            &[],
            |_deadline: Instant| async { Err::<Fake, _>(Error::InvalidUrl("x".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_deadline_error_becomes_timeout() {
        let result = poll(
            Duration::from_millis(1),
            Some(Duration::from_secs(1)),
            &[],
            &[],
            |_deadline: Instant| async { Err::<Fake, _>(Error::DeadlineExceeded) },
        )
        .await;

        assert!(matches!(result, Err(Error::PollTimeout { last_status: 0 })));
    }
}
