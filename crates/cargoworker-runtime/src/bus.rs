use cargoworker_types::Event;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::{Error, Result};

// NOTE: Delivery contract
//
// - Producers push into one bounded ingress queue; a full queue blocks the
//   producer until the dispatcher catches up, nothing else ever blocks it
// - The dispatcher copies each event into every subscriber queue with try_send;
//   a full subscriber queue drops that event for that subscriber only
// - Subscribers see events published after they registered, in dispatch order
// - close() drains everything already queued before the dispatcher exits

enum Envelope {
    Event(Event),
    Shutdown,
}

type Subscribers = Arc<Mutex<Vec<SyncSender<Event>>>>;

/// Publish handle handed to producers. Cheap to clone.
#[derive(Clone)]
pub struct EventSink {
    tx: SyncSender<Envelope>,
}

impl EventSink {
    /// Queue an event for dispatch. Blocks only while the ingress queue is full.
    ///
    /// Publishing after [`EventBus::close`] is a caller bug and reports
    /// [`Error::BusClosed`].
    pub fn publish(&self, event: Event) -> Result<()> {
        self.tx
            .send(Envelope::Event(event))
            .map_err(|_| Error::BusClosed)
    }
}

/// In-process fan-out of [`Event`]s to any number of subscribers
pub struct EventBus {
    sink: EventSink,
    subscribers: Subscribers,
    handle: Option<JoinHandle<()>>,
}

impl EventBus {
    /// Start the dispatcher thread with an ingress queue of `buffer` events
    pub fn new(buffer: usize) -> Result<Self> {
        let (tx, rx) = sync_channel(buffer.max(1));
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

        let dispatch_subscribers = Arc::clone(&subscribers);
        let handle = std::thread::Builder::new()
            .name("event-bus".to_string())
            .spawn(move || dispatch(rx, dispatch_subscribers))?;

        Ok(Self {
            sink: EventSink { tx },
            subscribers,
            handle: Some(handle),
        })
    }

    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    pub fn publish(&self, event: Event) -> Result<()> {
        self.sink.publish(event)
    }

    /// Register a subscriber queue holding up to `buffer` undelivered events
    /// (at least one). Events published before this call are not replayed.
    pub fn subscribe(&self, buffer: usize) -> Receiver<Event> {
        let (tx, rx) = sync_channel(buffer.max(1));
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Drain queued events, stop the dispatcher and disconnect subscribers
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // Queued behind every event already accepted, so those are delivered first
        if self.sink.tx.send(Envelope::Shutdown).is_err() {
            warn!("Event bus dispatcher exited before shutdown");
        }
        if handle.join().is_err() {
            warn!("Event bus dispatcher panicked");
        }
        lock(&self.subscribers).clear();
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(subscribers: &Subscribers) -> MutexGuard<'_, Vec<SyncSender<Event>>> {
    subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn dispatch(rx: Receiver<Envelope>, subscribers: Subscribers) {
    let mut dropped: u64 = 0;

    for envelope in rx {
        let event = match envelope {
            Envelope::Event(event) => event,
            Envelope::Shutdown => break,
        };

        let mut subs = lock(&subscribers);
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                true
            }
            // Receiver gone; stop delivering to it
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    debug!(dropped, "Event bus dispatcher stopped");
}
