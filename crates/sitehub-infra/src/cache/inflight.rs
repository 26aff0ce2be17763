//! Single-flight coordination for cache fills.
//!
//! The first caller for an uncached key becomes the fetcher; later callers
//! subscribe to a broadcast and read the file from disk once it lands.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;

use sitehub_core::domain::CacheKey;

use sitehub_core::ports::FetchError;

/// How a shared fill failed, as seen by the callers waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightFailure {
    /// The origin could not deliver the asset.
    Upstream(String),
    /// The asset arrived but could not be stored.
    Local(String),
}

impl From<&FetchError> for FlightFailure {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Io(_) => FlightFailure::Local(err.to_string()),
            _ => FlightFailure::Upstream(err.to_string()),
        }
    }
}

impl From<FlightFailure> for FetchError {
    fn from(failure: FlightFailure) -> Self {
        match failure {
            FlightFailure::Upstream(message) => FetchError::Coalesced(message),
            FlightFailure::Local(message) => FetchError::Io(std::io::Error::other(message)),
        }
    }
}

/// Completion notice shared with waiters.
pub type FlightResult = Result<(), FlightFailure>;

type Pending = Arc<DashMap<CacheKey, broadcast::Sender<FlightResult>>>;

/// Tracks cache fills in progress.
pub struct InFlightTracker {
    pending: Pending,
}

/// Role assigned to a caller after registration.
pub enum FetchRole {
    /// First caller for this key: performs the fetch.
    Fetcher(FetchGuard),
    /// Another caller is already fetching: wait for its result.
    Waiter(broadcast::Receiver<FlightResult>),
}

/// Removes the key from the tracker on drop.
///
/// If the fetch future is dropped before completing, waiters see the channel
/// close and retry on their own.
pub struct FetchGuard {
    key: CacheKey,
    sender: broadcast::Sender<FlightResult>,
    pending: Pending,
    completed: bool,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
        }
    }

    pub fn try_register(&self, key: &CacheKey) -> FetchRole {
        match self.pending.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                let (tx, _rx) = broadcast::channel(1);
                vacant.insert(tx.clone());
                FetchRole::Fetcher(FetchGuard {
                    key: key.clone(),
                    sender: tx,
                    pending: Arc::clone(&self.pending),
                    completed: false,
                })
            }
            Entry::Occupied(occupied) => FetchRole::Waiter(occupied.get().subscribe()),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchGuard {
    pub fn complete(mut self, result: FlightResult) {
        self.completed = true;
        // Remove before notifying so a woken waiter that retries registers fresh.
        self.pending.remove(&self.key);
        let _ = self.sender.send(result);
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.pending.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CacheKey {
        CacheKey::parse("npm/pkg/index.js").unwrap()
    }

    #[test]
    fn test_second_register_returns_waiter() {
        let tracker = InFlightTracker::new();
        let _guard = match tracker.try_register(&key()) {
            FetchRole::Fetcher(guard) => guard,
            FetchRole::Waiter(_) => panic!("Expected Fetcher"),
        };

        assert!(matches!(tracker.try_register(&key()), FetchRole::Waiter(_)));
        assert_eq!(tracker.in_flight_count(), 1);
    }

    #[test]
    fn test_drop_without_complete_removes_entry() {
        let tracker = InFlightTracker::new();
        {
            let _guard = match tracker.try_register(&key()) {
                FetchRole::Fetcher(guard) => guard,
                FetchRole::Waiter(_) => panic!("Expected Fetcher"),
            };
        }
        assert_eq!(tracker.in_flight_count(), 0);
        assert!(matches!(tracker.try_register(&key()), FetchRole::Fetcher(_)));
    }

    #[tokio::test]
    async fn test_waiter_receives_error() {
        let tracker = InFlightTracker::new();
        let guard = match tracker.try_register(&key()) {
            FetchRole::Fetcher(guard) => guard,
            FetchRole::Waiter(_) => panic!("Expected Fetcher"),
        };
        let mut rx = match tracker.try_register(&key()) {
            FetchRole::Waiter(rx) => rx,
            FetchRole::Fetcher(_) => panic!("Expected Waiter"),
        };

        tokio::spawn(async move {
            guard.complete(Err(FlightFailure::from(&FetchError::Status(404))));
        });

        let result = rx.recv().await.unwrap();
        assert_eq!(
            result,
            Err(FlightFailure::Upstream("Failed to download: 404".to_string()))
        );
        assert_eq!(tracker.in_flight_count(), 0);
    }

    #[test]
    fn test_local_failures_stay_local_for_waiters() {
        let io = FetchError::Io(std::io::Error::other("disk full"));
        let failure = FlightFailure::from(&io);
        assert!(matches!(failure, FlightFailure::Local(_)));
        assert!(matches!(FetchError::from(failure), FetchError::Io(_)));

        let timeout = FlightFailure::from(&FetchError::Timeout);
        assert!(matches!(FetchError::from(timeout), FetchError::Coalesced(_)));
    }
}
