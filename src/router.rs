//! Event routing.
//!
//! Inbound events name their target by id. The router searches the live tree for it
//! depth-first and hands the payload to the component’s receiver. The search order is:
//!
//! 1. the node itself;
//! 2. for containers, each dialog (the dialog, then its content), then each child in order,
//!    then the border title;
//! 3. for composites, each internal slot in [`Kind::internal_slots`] order.
//!
//! Ids are unique, so the order only affects how quickly a match is found.

use crate::component::Kind;
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::tree::ComponentTree;
use tracing::{debug, trace};

/// Outcome of dispatching an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The payload was delivered to this component.
    Delivered(ComponentId),
    /// The component was found but it, or one of its owners, is disabled.
    Ignored(ComponentId),
    /// No live component has the id. Expected for events racing a removal.
    NotFound,
}

impl Dispatch {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Dispatch::Delivered(_))
    }
}

impl ComponentTree {
    /// Dispatches an event to a component of the mounted tree.
    pub fn dispatch(&mut self, target: &str, payload: &str) -> Dispatch {
        match self.root() {
            Some(root) => self.find_and_dispatch(root, target, payload),
            None => {
                debug!(target, "no mounted tree to dispatch to");
                Dispatch::NotFound
            }
        }
    }

    /// Dispatches an event to a component at or below `from`.
    pub fn find_and_dispatch(&mut self, from: ComponentId, target: &str, payload: &str) -> Dispatch {
        let id = match target.parse::<ComponentId>() {
            Ok(id) => id,
            Err(err) => {
                debug!(%err, "not dispatching event");
                return Dispatch::NotFound;
            }
        };
        if !self.locate(from, id) {
            debug!(target, "event target not found");
            return Dispatch::NotFound;
        }
        self.deliver(id, payload)
    }

    /// Returns true if `target` is `node` or reachable from it.
    fn locate(&self, node: ComponentId, target: ComponentId) -> bool {
        let kind = match self.kind(node) {
            Some(kind) => kind,
            None => return false,
        };
        if node == target {
            return true;
        }
        match kind {
            Kind::Container(container) => {
                container.overlays.iter().any(|d| self.locate(*d, target))
                    || container.children.iter().any(|c| self.locate(*c, target))
                    || container.title.map_or(false, |t| self.locate(t, target))
            }
            Kind::Dialog(dialog) => self.locate(dialog.content, target),
            kind if kind.is_composite() => kind
                .internal_slots()
                .into_iter()
                .any(|slot| self.locate(slot, target)),
            _ => false,
        }
    }

    fn deliver(&mut self, id: ComponentId, payload: &str) -> Dispatch {
        enum Receiver {
            Leaf,
            Container,
            Dialog,
            Tabs,
            DropButton,
            TreeView,
            Table,
        }

        if !self.is_interactive(id) {
            debug!(%id, "ignoring event for disabled component");
            return Dispatch::Ignored(id);
        }
        let receiver = match self.kind(id) {
            Some(Kind::Container(_)) => Receiver::Container,
            Some(Kind::Dialog(_)) => Receiver::Dialog,
            Some(Kind::Tabs(_)) => Receiver::Tabs,
            Some(Kind::DropButton(_)) => Receiver::DropButton,
            Some(Kind::TreeView(_)) => Receiver::TreeView,
            Some(Kind::Table(_)) => Receiver::Table,
            Some(_) => Receiver::Leaf,
            None => return Dispatch::NotFound,
        };

        trace!(%id, payload, "delivering event");
        match receiver {
            Receiver::Leaf => self.receive_leaf(id, payload),
            Receiver::Container => self.fire(id, EventKind::ValueChanged, payload),
            // anything addressed to a dialog comes from its close affordance
            Receiver::Dialog => self.close_dialog(id),
            Receiver::Tabs => self.receive_tabs(id, payload),
            Receiver::DropButton => self.receive_drop_button(id, payload),
            Receiver::TreeView => self.receive_tree_view(id, payload),
            Receiver::Table => self.receive_table(id, payload),
        }
        Dispatch::Delivered(id)
    }
}

#[cfg(test)]
use crate::session::{QueueChannel, Session};
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
fn clicks(tree: &mut ComponentTree, id: ComponentId) -> Arc<Mutex<usize>> {
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    tree.on(id, EventKind::Click, move |_, _| *counter.lock() += 1);
    count
}

#[test]
fn reaches_every_nesting_form() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let tabs = tree.tabs(false);
    let drop = tree.drop_button("More", vec!["a", "b"]);
    let view = tree.tree_view();
    let grid = tree.grid(2);
    tree.push(root, &[tabs, drop, view, grid]);

    let in_tab = tree.button("tab");
    tree.add_tab(tabs, "Tab", in_tab).unwrap();
    let in_node = tree.button("node");
    let node = tree.label("node parent");
    tree.add_tree_node(view, None, node, false);
    tree.add_tree_node(view, Some(node), in_node, false);
    let in_grid = tree.button("grid");
    tree.push(grid, &[in_grid]);
    let dialog = tree.create_dialog(grid, "Dialog").unwrap();
    let content = tree.dialog_content(dialog).unwrap();
    let in_dialog = tree.button("dialog");
    tree.push(content, &[in_dialog]);

    let session = Session::new(Arc::new(QueueChannel::new()), Settings::default());
    assert!(tree.mount(root, session));

    for button in &[in_tab, in_node, in_grid, in_dialog] {
        let count = clicks(&mut tree, *button);
        assert_eq!(
            tree.dispatch(&button.to_string(), "#click"),
            Dispatch::Delivered(*button)
        );
        assert_eq!(*count.lock(), 1);
    }
}

#[test]
fn unknown_and_malformed_targets() {
    let mut tree = ComponentTree::new();
    let label = tree.label("x");
    assert_eq!(tree.dispatch(&label.to_string(), "y"), Dispatch::NotFound);

    let root = tree.column();
    tree.push(root, &[label]);
    assert_eq!(tree.find_and_dispatch(root, "not an id", "y"), Dispatch::NotFound);
    assert_eq!(
        tree.find_and_dispatch(root, &ComponentId::new().to_string(), "y"),
        Dispatch::NotFound
    );
    assert_eq!(tree.text(label), Some("x"));

    assert_eq!(
        tree.find_and_dispatch(root, &label.to_string(), "y"),
        Dispatch::Delivered(label)
    );
    assert_eq!(tree.text(label), Some("y"));
}

#[test]
fn disabled_owner_blocks_delivery() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let inner = tree.row();
    let field = tree.text_field("before");
    tree.push(inner, &[field]);
    tree.push(root, &[inner]);

    tree.set_enabled(inner, false);
    assert_eq!(
        tree.find_and_dispatch(root, &field.to_string(), "after"),
        Dispatch::Ignored(field)
    );
    assert_eq!(tree.text(field), Some("before"));

    tree.set_enabled(inner, true);
    assert!(tree.find_and_dispatch(root, &field.to_string(), "after").is_delivered());
    assert_eq!(tree.text(field), Some("after"));
}
