//! Dialogs.

use crate::component::Kind;
use crate::container::{Container, Layout};
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::instruction::{dispatch_literal, Instruction};
use crate::markup::Element;
use crate::tree::ComponentTree;
use tracing::debug;

/// Payload sent by the close affordance.
const CLOSE: &str = "#close";

/// A floating window owned by a container.
///
/// Dialogs are not part of their creator’s child list. Their markup is appended to the overlay
/// layer the first time they are opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub(crate) title: String,
    /// Column container holding the dialog’s components.
    pub(crate) content: ComponentId,
    /// The container that owns this dialog.
    pub(crate) creator: ComponentId,
    pub(crate) modal: bool,
    pub(crate) open: bool,
    /// Set once the markup has been appended on the client.
    pub(crate) in_dom: bool,
}

impl Dialog {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> ComponentId {
        self.content
    }

    pub fn creator(&self) -> ComponentId {
        self.creator
    }

    pub fn is_modal(&self) -> bool {
        self.modal
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

pub(crate) fn render(tree: &ComponentTree, id: ComponentId, dialog: &Dialog) -> Element {
    let header = Element::new("div")
        .class("perch-dialog-header")
        .child(
            Element::new("span")
                .class("perch-dialog-title")
                .text(dialog.title.as_str()),
        )
        .child(
            Element::new("span")
                .class("perch-dialog-close")
                .attr("onclick", dispatch_literal(id, CLOSE))
                .text("\u{d7}"),
        );

    let mut element = Element::new("div").class("perch-dialog");
    if dialog.modal {
        element = element.class("perch-modal");
    }
    element.child(header).child(
        Element::new("div")
            .class("perch-dialog-body")
            .children(tree.render_element(dialog.content)),
    )
}

impl ComponentTree {
    /// Creates a closed dialog owned by `container`. Returns `None` if `container` is not a
    /// container.
    pub fn create_dialog(&mut self, container: ComponentId, title: &str) -> Option<ComponentId> {
        if self.kind(container).and_then(Kind::as_container).is_none() {
            debug!(%container, "dialogs can only be created by containers");
            return None;
        }

        let content = self.insert(Kind::Container(Container::new(Layout::Column)));
        let dialog = self.insert(Kind::Dialog(Dialog {
            title: title.to_string(),
            content,
            creator: container,
            modal: false,
            open: false,
            in_dom: false,
        }));
        self.set_owner(content, Some(dialog));
        self.set_owner(dialog, Some(container));
        if let Some(Kind::Container(c)) = self.kind_mut(container) {
            c.overlays.push(dialog);
        }

        if let Some(attachment) = self.attachment(container) {
            self.init(dialog, attachment.master, &attachment.session);
        }
        Some(dialog)
    }

    /// The content container of a dialog.
    pub fn dialog_content(&self, dialog: ComponentId) -> Option<ComponentId> {
        match self.kind(dialog)? {
            Kind::Dialog(d) => Some(d.content),
            _ => None,
        }
    }

    pub fn is_dialog_open(&self, dialog: ComponentId) -> bool {
        matches!(self.kind(dialog), Some(Kind::Dialog(d)) if d.open)
    }

    /// Modal dialogs block the rest of the page. Takes effect the next time the dialog opens.
    pub fn set_modal(&mut self, dialog: ComponentId, modal: bool) {
        if let Some(Kind::Dialog(d)) = self.kind_mut(dialog) {
            d.modal = modal;
        }
    }

    pub fn set_dialog_title(&mut self, dialog: ComponentId, title: &str) {
        let in_dom = match self.kind_mut(dialog) {
            Some(Kind::Dialog(d)) if d.title != title => {
                d.title = title.to_string();
                d.in_dom
            }
            _ => return,
        };
        if in_dom {
            self.redraw(dialog);
        }
    }

    /// Opens a dialog. Its markup is sent to the client the first time.
    pub fn open_dialog(&mut self, dialog: ComponentId) {
        let attached = self.is_attached(dialog);
        let (in_dom, modal) = match self.kind_mut(dialog) {
            Some(Kind::Dialog(d)) => {
                let previous = d.in_dom;
                d.open = true;
                d.in_dom |= attached;
                (previous, d.modal)
            }
            _ => return,
        };
        if !attached {
            return;
        }
        if !in_dom {
            let markup = self.render(dialog);
            self.emit(dialog, Instruction::AppendOverlay { markup });
        }
        self.emit(
            dialog,
            Instruction::OpenDialog {
                target: dialog,
                modal,
            },
        );
    }

    /// Closes a dialog and every open dialog created inside it, then fires [`EventKind::Close`].
    pub fn close_dialog(&mut self, dialog: ComponentId) {
        let content = match self.kind_mut(dialog) {
            Some(Kind::Dialog(d)) if d.open => {
                d.open = false;
                d.content
            }
            _ => return,
        };
        self.emit(dialog, Instruction::CloseDialog { target: dialog });

        let mut nested = Vec::new();
        self.collect_dialogs(content, &mut nested);
        for nested in nested {
            self.close_dialog(nested);
        }
        self.fire(dialog, EventKind::Close, "closed");
    }

    /// Dialogs owned by containers below `id`, not descending into the dialogs themselves.
    fn collect_dialogs(&self, id: ComponentId, out: &mut Vec<ComponentId>) {
        let owned = match self.kind(id) {
            Some(kind) => kind.owned(),
            None => return,
        };
        for child in owned {
            match self.kind(child) {
                Some(Kind::Dialog(_)) => out.push(child),
                Some(_) => self.collect_dialogs(child, out),
                None => {}
            }
        }
    }

    /// Closes a dialog, removes it from the client and from its creator, and disposes its
    /// content.
    pub(crate) fn dispose_dialog(&mut self, dialog: ComponentId) {
        let (content, creator, in_dom) = match self.kind(dialog) {
            Some(Kind::Dialog(d)) => (d.content, d.creator, d.in_dom),
            _ => return,
        };
        self.close_dialog(dialog);
        if in_dom {
            self.emit(dialog, Instruction::Remove { target: dialog });
        }
        self.dispose_subtree(content);
        if let Some(Kind::Container(c)) = self.kind_mut(creator) {
            c.overlays.retain(|d| *d != dialog);
        }
        self.forget(dialog);
        debug!(%dialog, "disposed dialog");
    }
}

#[cfg(test)]
use crate::session::{QueueChannel, Session};
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use std::sync::Arc;

#[test]
fn dialog_lifecycle() {
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    let mut tree = ComponentTree::new();
    let root = tree.column();
    tree.mount(root, session);

    let dialog = tree.create_dialog(root, "Confirm").unwrap();
    let content = tree.dialog_content(dialog).unwrap();
    let text = tree.label("Are you sure?");
    tree.push(content, &[text]);
    assert!(tree.is_attached(text));
    assert_eq!(tree.dialogs(root), &[dialog]);
    assert!(tree.render(root).find("Are you sure?").is_none());
    channel.drain();

    tree.open_dialog(dialog);
    let opened = channel.drain();
    assert_eq!(opened.len(), 2);
    assert!(opened[0].starts_with("perch.overlay("));
    assert!(opened[0].contains("Are you sure?"));
    assert_eq!(opened[1], format!("perch.openDialog(\"{}\", false);", dialog));

    tree.close_dialog(dialog);
    tree.open_dialog(dialog);
    assert_eq!(
        channel.drain(),
        vec![
            format!("perch.closeDialog(\"{}\");", dialog),
            format!("perch.openDialog(\"{}\", false);", dialog),
        ],
        "markup is only appended once"
    );

    tree.dispose(dialog);
    assert!(!tree.contains(dialog));
    assert!(!tree.contains(text));
    assert!(tree.dialogs(root).is_empty());
    let removed = channel.drain();
    assert_eq!(removed.last(), Some(&format!("perch.remove(\"{}\");", dialog)));
}

#[test]
fn closing_closes_nested_dialogs() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let outer = tree.create_dialog(root, "Outer").unwrap();
    let content = tree.dialog_content(outer).unwrap();
    let inner = tree.create_dialog(content, "Inner").unwrap();
    assert!(tree.create_dialog(outer, "not a container").is_none());

    tree.open_dialog(outer);
    tree.open_dialog(inner);
    let closed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for dialog in &[outer, inner] {
        let closed = Arc::clone(&closed);
        let dialog = *dialog;
        tree.on(dialog, EventKind::Close, move |_, _| closed.lock().push(dialog));
    }

    tree.close_dialog(outer);
    assert!(!tree.is_dialog_open(inner));
    assert_eq!(*closed.lock(), vec![inner, outer]);
}

#[test]
fn disposing_the_creator_closes_dialogs_latest_first() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let first = tree.create_dialog(root, "First").unwrap();
    let second = tree.create_dialog(root, "Second").unwrap();
    tree.open_dialog(first);
    tree.open_dialog(second);

    let closed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for dialog in &[first, second] {
        let closed = Arc::clone(&closed);
        let dialog = *dialog;
        tree.on(dialog, EventKind::Close, move |_, _| closed.lock().push(dialog));
    }

    tree.dispose(root);
    assert_eq!(*closed.lock(), vec![second, first]);
    assert!(tree.is_empty());
}
