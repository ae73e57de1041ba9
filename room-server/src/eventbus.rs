//! A minimal, peripheral pub-sub bus, grounded on
//! `original_source/utils/eventbus.py`'s `EventBus`. Subscribers are plain
//! synchronous closures; a panicking subscriber is caught and logged rather
//! than propagated, mirroring the Python `_safe_invoke`'s try/except-log.
//!
//! Nothing in the room/handler core depends on a subscriber existing — this
//! exists so the admin/plugin surfaces (none of which ship real plugins,
//! per the Non-goals) have somewhere to observe lifecycle events.

use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;

/// Lifecycle events the handler emits. A fixed, closed set — there is no
/// dynamic event-name registration since no real plugins are shipped.
#[derive(Debug, Clone)]
pub enum Event {
    RoomCreated { room_id: String },
    RoomDestroyed { room_id: String },
    PlayerJoined { room_id: String, user_id: i32 },
    PlayerLeft { room_id: String, user_id: i32 },
}

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.write().unwrap().push(Box::new(callback));
    }

    pub fn emit(&self, event: Event) {
        let subscribers = self.subscribers.read().unwrap();
        for subscriber in subscribers.iter() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
            if result.is_err() {
                tracing::error!(?event, "event bus subscriber panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_invokes_every_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        let c2 = count.clone();
        bus.on(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        bus.on(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(Event::RoomCreated {
            room_id: "R1".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn a_panicking_subscriber_does_not_stop_the_others() {
        let bus = EventBus::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        bus.on(|_| panic!("boom"));
        bus.on(move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(Event::PlayerLeft {
            room_id: "R1".into(),
            user_id: 1,
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
