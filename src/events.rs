//! Events and listeners.

use crate::id::ComponentId;
use crate::tree::ComponentTree;
use core::fmt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Named event streams a listener can subscribe to.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// The component’s value changed. The listener receives the new value.
    ValueChanged = 0,
    /// A button was clicked or a menu item was picked (the listener receives its index).
    Click = 1,
    /// The pointer entered a drop button.
    Hover = 2,
    /// A dialog was closed.
    Close = 3,
    /// A drop button option, a tree node or a table row was selected.
    Selection = 4,
    /// The add affordance of a tab view was used.
    Add = 5,
    /// A tab was closed. The listener receives its former index.
    Remove = 6,
    /// A tree node was moved by the user, or a table was sorted.
    Order = 7,
    /// The selected tab changed.
    Index = 8,
    /// The border title of a container changed.
    Title = 9,
}

impl EventKind {
    // smallest and largest values in Ord
    pub(crate) const MIN: Self = EventKind::ValueChanged;
    pub(crate) const MAX: Self = EventKind::Title;
}

/// A listener callback.
///
/// Listeners receive the tree they were fired from, so they may freely mutate it, and the event
/// value as a string.
pub struct Listener(Arc<Mutex<dyn FnMut(&mut ComponentTree, &str) + Send>>);

impl Clone for Listener {
    fn clone(&self) -> Self {
        Listener(Arc::clone(&self.0))
    }
}

impl Listener {
    pub fn new<F: 'static + FnMut(&mut ComponentTree, &str) + Send>(listener: F) -> Self {
        Listener(Arc::new(Mutex::new(listener)))
    }

    /// Returns true if both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Invokes the callback.
    ///
    /// A listener that is still running further up the stack is skipped; returns false then.
    pub(crate) fn call(&self, tree: &mut ComponentTree, value: &str) -> bool {
        match self.0.try_lock() {
            Some(mut listener) => {
                (&mut *listener)(tree, value);
                true
            }
            None => {
                warn!("skipping re-entrant listener invocation");
                false
            }
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Refers to a single listener list.
pub(crate) type ListenerKey = (ComponentId, EventKind);

/// All listeners of one component tree, in registration order per key.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    map: BTreeMap<ListenerKey, Vec<Listener>>,
}

impl Listeners {
    pub(crate) fn new() -> Listeners {
        Listeners::default()
    }

    pub(crate) fn add(&mut self, component: ComponentId, kind: EventKind, listener: Listener) {
        self.map.entry((component, kind)).or_default().push(listener);
    }

    /// Removes a listener by identity. Returns false if it was not registered.
    pub(crate) fn remove(
        &mut self,
        component: ComponentId,
        kind: EventKind,
        listener: &Listener,
    ) -> bool {
        let key = (component, kind);
        let list = match self.map.get_mut(&key) {
            Some(list) => list,
            None => return false,
        };
        let len = list.len();
        list.retain(|l| !l.ptr_eq(listener));
        let removed = list.len() != len;
        if list.is_empty() {
            self.map.remove(&key);
        }
        removed
    }

    /// Returns a snapshot of the listeners for a key, so they can be called while the tree is
    /// borrowed mutably.
    pub(crate) fn get(&self, component: ComponentId, kind: EventKind) -> Vec<Listener> {
        self.map
            .get(&(component, kind))
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// Number of listeners registered on a component across all event kinds.
    pub(crate) fn count(&self, component: ComponentId) -> usize {
        self.map
            .range((component, EventKind::MIN)..=(component, EventKind::MAX))
            .map(|(_, list)| list.len())
            .sum()
    }

    /// Drops every listener of a component.
    pub(crate) fn remove_component(&mut self, component: ComponentId) {
        let keys_to_remove: Vec<_> = self
            .map
            .range((component, EventKind::MIN)..=(component, EventKind::MAX))
            .map(|(k, _)| *k)
            .collect();
        for key in keys_to_remove {
            self.map.remove(&key);
        }
    }
}

#[cfg(test)]
fn noop() -> Listener {
    Listener::new(|_, _| {})
}

#[test]
fn snapshot_keeps_registration_order() {
    let mut listeners = Listeners::new();
    let id = ComponentId::new();
    let (a, b, c) = (noop(), noop(), noop());
    listeners.add(id, EventKind::Click, a.clone());
    listeners.add(id, EventKind::Click, b.clone());
    listeners.add(id, EventKind::Click, c.clone());

    let snapshot = listeners.get(id, EventKind::Click);
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot[0].ptr_eq(&a));
    assert!(snapshot[1].ptr_eq(&b));
    assert!(snapshot[2].ptr_eq(&c));
    assert!(listeners.get(id, EventKind::Close).is_empty());
}

#[test]
fn remove_by_identity() {
    let mut listeners = Listeners::new();
    let id = ComponentId::new();
    let (a, b) = (noop(), noop());
    listeners.add(id, EventKind::ValueChanged, a.clone());
    listeners.add(id, EventKind::ValueChanged, b.clone());

    assert!(listeners.remove(id, EventKind::ValueChanged, &a));
    assert!(!listeners.remove(id, EventKind::ValueChanged, &a));
    let rest = listeners.get(id, EventKind::ValueChanged);
    assert_eq!(rest.len(), 1);
    assert!(rest[0].ptr_eq(&b));
}

#[test]
fn remove_component_covers_every_kind() {
    let mut listeners = Listeners::new();
    let id = ComponentId::new();
    let other = ComponentId::new();
    listeners.add(id, EventKind::MIN, noop());
    listeners.add(id, EventKind::Selection, noop());
    listeners.add(id, EventKind::MAX, noop());
    listeners.add(other, EventKind::Click, noop());
    assert_eq!(listeners.count(id), 3);

    listeners.remove_component(id);
    assert_eq!(listeners.count(id), 0);
    assert_eq!(listeners.count(other), 1);
}
