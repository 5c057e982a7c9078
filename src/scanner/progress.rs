use std::sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
    mpsc::{self, Receiver, Sender},
};

/// Progress reported while a directory is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    /// Detection phase: one more file was accepted as a one-shot.
    Scanning { detected_count: usize },
    /// Metadata phase: `processed` of `total` accepted files were read.
    Processing { total: usize, processed: usize },
}

/// Receiving end handed to one listener.
pub struct ScanSubscription {
    id: u64,
    receiver: Receiver<ScanProgress>,
}

impl ScanSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<ScanProgress> {
        &self.receiver
    }

    /// Collect every event delivered so far without blocking.
    pub fn drain(&self) -> Vec<ScanProgress> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out of scan progress to any number of listeners.
#[derive(Default)]
pub struct ScanEvents {
    listeners: Mutex<Vec<(u64, Sender<ScanProgress>)>>,
    next_id: AtomicU64,
}

impl ScanEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it receives every event emitted from now on.
    pub fn subscribe(&self) -> ScanSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        self.lock().push((id, tx));
        ScanSubscription { id, receiver: rx }
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: &ScanSubscription) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription.id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `event` to every listener, dropping listeners whose receiver is gone.
    pub(crate) fn emit(&self, event: ScanProgress) {
        self.lock().retain(|(_, tx)| tx.send(event).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Sender<ScanProgress>)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_listeners_receive_identical_events() {
        let events = ScanEvents::new();
        let first = events.subscribe();
        let second = events.subscribe();
        events.emit(ScanProgress::Scanning { detected_count: 1 });
        events.emit(ScanProgress::Processing {
            total: 1,
            processed: 1,
        });
        assert_eq!(first.drain(), second.drain());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn unsubscribed_listeners_stop_receiving() {
        let events = ScanEvents::new();
        let sub = events.subscribe();
        assert!(events.unsubscribe(&sub));
        assert!(!events.unsubscribe(&sub));
        events.emit(ScanProgress::Scanning { detected_count: 1 });
        assert!(sub.drain().is_empty());
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_emit() {
        let events = ScanEvents::new();
        drop(events.subscribe());
        let kept = events.subscribe();
        events.emit(ScanProgress::Scanning { detected_count: 3 });
        assert_eq!(events.listener_count(), 1);
        assert_eq!(
            kept.drain(),
            vec![ScanProgress::Scanning { detected_count: 3 }]
        );
    }

    #[test]
    fn emitting_without_listeners_is_silent() {
        ScanEvents::new().emit(ScanProgress::Scanning { detected_count: 1 });
    }
}
