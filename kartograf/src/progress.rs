//! Progress reporting of the tile acquisition.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Receives the cumulative number of processed tiles.
///
/// Called once per completed chunk. The reported values never decrease.
pub trait ProgressObserver: Send + Sync {
    /// Called after a chunk of tiles is processed.
    fn on_progress(&self, completed: usize);
}

impl<F: Fn(usize) + Send + Sync> ProgressObserver for F {
    fn on_progress(&self, completed: usize) {
        self(completed)
    }
}

impl ProgressObserver for UnboundedSender<usize> {
    fn on_progress(&self, completed: usize) {
        // The receiver may be gone if the caller is not interested anymore.
        let _ = self.send(completed);
    }
}

/// Cumulative counter shared by concurrently processed groups of tiles.
pub(crate) struct ProgressCounter {
    completed: Mutex<usize>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressCounter {
    pub(crate) fn new(observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            completed: Mutex::new(0),
            observer,
        }
    }

    /// Adds `count` processed tiles and notifies the observer.
    pub(crate) fn advance(&self, count: usize) {
        // The lock is held while notifying, so observers see values in increasing order.
        let mut completed = self.completed.lock();
        *completed += count;
        if let Some(observer) = &self.observer {
            observer.on_progress(*completed);
        }
    }

    pub(crate) fn completed(&self) -> usize {
        *self.completed.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_cumulative() {
        let seen = Arc::new(Mutex::new(vec![]));
        let seen_clone = seen.clone();
        let counter = ProgressCounter::new(Some(Arc::new(move |completed: usize| {
            seen_clone.lock().push(completed)
        })));

        counter.advance(10);
        counter.advance(10);
        counter.advance(3);

        assert_eq!(counter.completed(), 23);
        assert_eq!(*seen.lock(), vec![10, 20, 23]);
    }

    #[tokio::test]
    async fn channel_observer() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let counter = ProgressCounter::new(Some(Arc::new(sender)));
        counter.advance(5);
        assert_eq!(receiver.recv().await, Some(5));
    }
}
