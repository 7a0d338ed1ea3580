//! The [`EventBus`]: subscription registry plus pending-notification buffer.

use std::collections::BTreeSet;

use cryptopolis_types::{Notification, NotificationKind};
use tracing::trace;

/// Callback invoked for each delivered notification.
pub type Handler = Box<dyn FnMut(&Notification) + Send>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Which notifications a subscriber wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every notification.
    All,
    /// Only the listed kinds.
    Kinds(BTreeSet<NotificationKind>),
}

impl Filter {
    /// Filter accepting a single kind.
    pub fn only(kind: NotificationKind) -> Self {
        Self::Kinds(BTreeSet::from([kind]))
    }

    /// Whether a notification of `kind` passes this filter.
    pub fn accepts(&self, kind: NotificationKind) -> bool {
        match self {
            Self::All => true,
            Self::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

/// A registered subscriber.
struct Subscriber {
    id: SubscriptionId,
    filter: Filter,
    handler: Handler,
}

/// Typed publish/subscribe channel with buffered delivery.
#[derive(Default)]
pub struct EventBus {
    /// Subscribers in registration order.
    subscribers: Vec<Subscriber>,
    /// Notifications published since the last flush.
    pending: Vec<Notification>,
    /// Next subscription handle value.
    next_id: u64,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub const fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler for notifications passing `filter`.
    pub fn subscribe(&mut self, filter: Filter, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler,
        });
        id
    }

    /// Remove a subscriber. Returns `false` if the handle was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Buffer a notification for the next [`flush`](Self::flush).
    pub fn publish(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    /// Deliver every buffered notification and clear the buffer.
    ///
    /// Returns the number of notifications delivered (not the number of
    /// handler invocations).
    pub fn flush(&mut self) -> usize {
        let pending = core::mem::take(&mut self.pending);
        let count = pending.len();
        for notification in &pending {
            let kind = notification.kind();
            trace!(?kind, "delivering notification");
            for subscriber in &mut self.subscribers {
                if subscriber.filter.accepts(kind) {
                    (subscriber.handler)(notification);
                }
            }
        }
        count
    }

    /// Notifications waiting for the next flush.
    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use cryptopolis_types::{DayChanged, RugPull};
    use rust_decimal::Decimal;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<Notification>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Handler = Box::new(move |n: &Notification| {
            sink.lock().unwrap().push(n.clone());
        });
        (seen, handler)
    }

    fn day(d: u64) -> Notification {
        Notification::DayChanged(DayChanged { day: d })
    }

    fn rug() -> Notification {
        Notification::RugPull(RugPull {
            building_name: "NFT Gallery".to_owned(),
            treasury_loss: Decimal::from(100),
        })
    }

    #[test]
    fn publish_buffers_until_flush() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(Filter::All, handler);

        bus.publish(day(1));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.pending().len(), 1);

        assert_eq!(bus.flush(), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[day(1)]);
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn filters_by_kind() {
        let mut bus = EventBus::new();
        let (days, day_handler) = recorder();
        let (rugs, rug_handler) = recorder();
        bus.subscribe(Filter::only(NotificationKind::DayChanged), day_handler);
        bus.subscribe(Filter::only(NotificationKind::RugPull), rug_handler);

        bus.publish(day(1));
        bus.publish(rug());
        bus.publish(day(2));
        bus.flush();

        assert_eq!(days.lock().unwrap().as_slice(), &[day(1), day(2)]);
        assert_eq!(rugs.lock().unwrap().as_slice(), &[rug()]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        let id = bus.subscribe(Filter::All, handler);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        bus.publish(day(1));
        bus.flush();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn delivery_preserves_publish_order() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(Filter::All, handler);

        for d in 1..=5 {
            bus.publish(day(d));
        }
        bus.flush();

        let got: Vec<u64> = seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::DayChanged(p) => Some(p.day),
                _ => None,
            })
            .collect();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn flush_with_no_subscribers_drops_pending() {
        let mut bus = EventBus::new();
        bus.publish(day(1));
        assert_eq!(bus.flush(), 1);
        assert!(bus.pending().is_empty());
    }
}
