//! Local change registry.
//!
//! Callbacks are keyed by table (or [`Topic::All`]) and run synchronously on
//! the writer's task, in subscription order, before the write returns to its
//! caller's next await point. There is no debouncing.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::Table;

/// What a subscriber listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Table(Table),
    All,
}

impl From<Table> for Topic {
    fn from(table: Table) -> Self {
        Topic::Table(table)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// A row was inserted or replaced in this window.
    Upsert,
    /// A row was removed in this window.
    Delete,
    /// The engine was re-hydrated from a snapshot written elsewhere.
    Reload,
}

/// A change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// `None` when the whole engine was reloaded without a table hint.
    pub table: Option<Table>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn table(table: Table, kind: ChangeKind) -> Self {
        Self {
            table: Some(table),
            kind,
        }
    }

    pub fn full_reload() -> Self {
        Self {
            table: None,
            kind: ChangeKind::Reload,
        }
    }

    fn reaches(&self, topic: Topic) -> bool {
        match (topic, self.table) {
            (Topic::All, _) | (_, None) => true,
            (Topic::Table(t), Some(changed)) => t == changed,
        }
    }
}

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Topic, Callback)>,
}

/// Registry of change callbacks. Clones share subscribers.
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `topic`. It stays registered until the returned
    /// handle is dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe(
        &self,
        topic: impl Into<Topic>,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, topic.into(), Arc::new(callback)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every callback the event reaches.
    ///
    /// The registry lock is released before callbacks run, so a callback may
    /// subscribe, unsubscribe or read the store.
    pub fn notify(&self, event: &ChangeEvent) {
        let targets: Vec<Callback> = {
            let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry
                .entries
                .iter()
                .filter(|(_, topic, _)| event.reaches(*topic))
                .map(|(_, _, cb)| Arc::clone(cb))
                .collect()
        };

        tracing::trace!(table = ?event.table, kind = ?event.kind, targets = targets.len(), "notify");
        for callback in targets {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Unsubscribe handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.entries.retain(|(id, _, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_: &ChangeEvent| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_fan_out_by_table() {
        let bus = ChangeBus::new();
        let (posts, on_posts) = counter();
        let (all, on_all) = counter();
        let (groups, on_groups) = counter();
        let _a = bus.subscribe(Table::Posts, on_posts);
        let _b = bus.subscribe(Topic::All, on_all);
        let _c = bus.subscribe(Table::Groups, on_groups);

        bus.notify(&ChangeEvent::table(Table::Posts, ChangeKind::Delete));

        assert_eq!(posts.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 1);
        assert_eq!(groups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_full_reload_reaches_everyone() {
        let bus = ChangeBus::new();
        let (posts, on_posts) = counter();
        let (all, on_all) = counter();
        let _a = bus.subscribe(Table::Posts, on_posts);
        let _b = bus.subscribe(Topic::All, on_all);

        bus.notify(&ChangeEvent::full_reload());

        assert_eq!(posts.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = ChangeBus::new();
        let (count, on_change) = counter();
        let sub = bus.subscribe(Table::Users, on_change);
        assert_eq!(bus.len(), 1);

        sub.unsubscribe();
        assert!(bus.is_empty());

        bus.notify(&ChangeEvent::table(Table::Users, ChangeKind::Upsert));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callbacks_run_in_subscription_order() {
        let bus = ChangeBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for n in 0..3 {
            let order = Arc::clone(&order);
            subs.push(bus.subscribe(Topic::All, move |_: &ChangeEvent| {
                order.lock().expect("lock").push(n);
            }));
        }

        bus.notify(&ChangeEvent::table(Table::Ads, ChangeKind::Upsert));
        assert_eq!(*order.lock().expect("lock"), vec![0, 1, 2]);
    }

    #[test]
    fn test_callback_may_unsubscribe_others() {
        let bus = ChangeBus::new();
        let held: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let (count, on_change) = counter();
        *held.lock().expect("lock") = Some(bus.subscribe(Table::Chats, on_change));

        let slot = Arc::clone(&held);
        let _dropper = bus.subscribe(Topic::All, move |_: &ChangeEvent| {
            slot.lock().expect("lock").take();
        });

        bus.notify(&ChangeEvent::table(Table::Chats, ChangeKind::Upsert));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.len(), 1);
    }
}
