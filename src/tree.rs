use crate::component::{Attachment, Component, Kind, DISABLED_CLASS};
use crate::events::{EventKind, Listener, Listeners};
use crate::id::ComponentId;
use crate::instruction::Instruction;
use crate::markup::Element;
use crate::redraw::{self, Arrangement, Mutation, Strategy};
use crate::session::Session;
use crate::{composite, container, dialog, table, widgets};
use std::collections::HashMap;
use tracing::{debug, info};

/// A tree of components belonging to one session.
///
/// The tree owns every component; application code holds [`ComponentId`]s and mutates
/// components through the tree. Mutations of attached components are sent to the client right
/// away as [`Instruction`]s.
#[derive(Debug, Default)]
pub struct ComponentTree {
    pub(crate) nodes: HashMap<ComponentId, Component>,
    root: Option<ComponentId>,
    listeners: Listeners,
}

impl ComponentTree {
    pub fn new() -> ComponentTree {
        ComponentTree {
            nodes: HashMap::new(),
            root: None,
            listeners: Listeners::new(),
        }
    }

    /// Adds a detached component.
    pub(crate) fn insert(&mut self, kind: Kind) -> ComponentId {
        let component = Component::new(kind);
        let id = component.id;
        self.nodes.insert(id, component);
        id
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn kind(&self, id: ComponentId) -> Option<&Kind> {
        self.nodes.get(&id).map(|c| &c.kind)
    }

    pub(crate) fn kind_mut(&mut self, id: ComponentId) -> Option<&mut Kind> {
        self.nodes.get_mut(&id).map(|c| &mut c.kind)
    }

    /// Returns true if the component exists and has not been disposed.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The mounted root container, if any.
    pub fn root(&self) -> Option<ComponentId> {
        self.root
    }

    pub fn owner(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(&id).and_then(|c| c.owner)
    }

    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.nodes.get(&id).map_or(false, Component::is_attached)
    }

    pub(crate) fn attachment(&self, id: ComponentId) -> Option<Attachment> {
        self.nodes.get(&id).and_then(|c| c.attachment.clone())
    }

    pub(crate) fn set_owner(&mut self, id: ComponentId, owner: Option<ComponentId>) {
        if let Some(component) = self.nodes.get_mut(&id) {
            component.owner = owner;
        }
    }

    /// Sends an instruction through the session of an attached component.
    pub(crate) fn emit(&self, id: ComponentId, instruction: Instruction) {
        if let Some(attachment) = self.nodes.get(&id).and_then(|c| c.attachment.as_ref()) {
            attachment.session.execute(&instruction);
        }
    }

    /// Makes `root` the root of this tree and attaches everything below it to `session`.
    ///
    /// Returns false if `root` does not exist or belongs to another component.
    pub fn mount(&mut self, root: ComponentId, session: Session) -> bool {
        match self.nodes.get(&root) {
            Some(component) if component.owner.is_none() && !matches!(component.kind, Kind::Dialog(_)) => {}
            _ => {
                debug!(%root, "cannot mount component as root");
                return false;
            }
        }
        self.root = Some(root);
        self.init(root, root, &session);
        info!(%root, session = %session.id(), "mounted component tree");
        true
    }

    /// Attaches a component and everything it owns.
    pub fn init(&mut self, id: ComponentId, master: ComponentId, session: &Session) {
        let owned = match self.nodes.get_mut(&id) {
            Some(component) => {
                component.attachment = Some(Attachment {
                    master,
                    session: session.clone(),
                });
                component.kind.owned()
            }
            None => return,
        };
        for child in owned {
            self.init(child, master, session);
        }
    }

    /// Clears the attachment of a component and everything it owns.
    pub(crate) fn detach(&mut self, id: ComponentId) {
        let owned = match self.nodes.get_mut(&id) {
            Some(component) => {
                component.attachment = None;
                component.kind.owned()
            }
            None => return,
        };
        for child in owned {
            self.detach(child);
        }
    }

    /// Returns true if `ancestor` owns `id`, directly or transitively.
    pub(crate) fn is_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = self.owner(id);
        while let Some(owner) = current {
            if owner == ancestor {
                return true;
            }
            current = self.owner(owner);
        }
        false
    }

    /// Returns true if `child` may be given to `parent`.
    pub(crate) fn can_adopt(&self, parent: ComponentId, child: ComponentId) -> bool {
        let component = match self.nodes.get(&child) {
            Some(component) => component,
            None => {
                debug!(%child, "ignoring unknown component");
                return false;
            }
        };
        if let Some(owner) = component.owner {
            debug!(%child, %owner, "ignoring component that already has an owner");
            return false;
        }
        if matches!(component.kind, Kind::Dialog(_))
            || self.root == Some(child)
            || child == parent
            || self.is_ancestor(child, parent)
        {
            debug!(%child, %parent, "ignoring component that cannot be a child here");
            return false;
        }
        true
    }

    /// Returns true if the component and all of its owners are enabled.
    pub fn is_interactive(&self, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(component) if component.enabled => current = component.owner,
                _ => return false,
            }
        }
        true
    }

    /// Shows or hides a component.
    pub fn set_visible(&mut self, id: ComponentId, visible: bool) {
        let owner = match self.nodes.get_mut(&id) {
            Some(component) if component.visible != visible => {
                component.visible = visible;
                component.owner
            }
            _ => return,
        };
        if !self.is_attached(id) {
            return;
        }

        // containers that filter hidden children and tables have to re-derive their layout
        if let Some(owner) = owner {
            let arrangement = match self.kind(owner) {
                Some(Kind::Container(c)) => Some(Arrangement::Container(c.layout)),
                Some(Kind::Table(_)) => Some(Arrangement::Table),
                _ => None,
            };
            if let Some(arrangement) = arrangement {
                if redraw::strategy(arrangement, Mutation::ChildVisibility) == Strategy::Replace {
                    self.redraw(owner);
                    return;
                }
            }
        }

        let value = if visible { "visible" } else { "hidden" };
        self.emit(
            id,
            Instruction::SetStyle {
                target: id,
                key: "visibility".to_string(),
                value: value.to_string(),
            },
        );
    }

    /// Enables or disables a component. Disabled components and their descendants ignore
    /// client events.
    pub fn set_enabled(&mut self, id: ComponentId, enabled: bool) {
        match self.nodes.get_mut(&id) {
            Some(component) if component.enabled != enabled => component.enabled = enabled,
            _ => return,
        }
        self.emit(
            id,
            Instruction::SetClass {
                target: id,
                class: DISABLED_CLASS,
                enabled: !enabled,
            },
        );
    }

    /// Sets a style property. An empty value removes it.
    pub fn set_style(&mut self, id: ComponentId, key: &str, value: &str) {
        let component = match self.nodes.get_mut(&id) {
            Some(component) => component,
            None => return,
        };
        let changed = if value.is_empty() {
            component.styles.remove(key).is_some()
        } else {
            component.styles.insert(key.to_string(), value.to_string()) != Some(value.to_string())
        };
        if changed {
            self.emit(
                id,
                Instruction::SetStyle {
                    target: id,
                    key: key.to_string(),
                    value: value.to_string(),
                },
            );
        }
    }

    /// Sets the width hint, e.g. `"100%"`. An empty value removes it.
    pub fn set_width(&mut self, id: ComponentId, width: &str) {
        self.set_size_hint(id, "width", width);
    }

    /// Sets the height hint. An empty value removes it.
    pub fn set_height(&mut self, id: ComponentId, height: &str) {
        self.set_size_hint(id, "height", height);
    }

    fn set_size_hint(&mut self, id: ComponentId, key: &'static str, value: &str) {
        let component = match self.nodes.get_mut(&id) {
            Some(component) => component,
            None => return,
        };
        let hint = if key == "width" {
            &mut component.width
        } else {
            &mut component.height
        };
        let value = Some(value.to_string()).filter(|v| !v.is_empty());
        if *hint == value {
            return;
        }
        *hint = value;
        let value = hint.clone().unwrap_or_default();
        self.emit(
            id,
            Instruction::SetStyle {
                target: id,
                key: key.to_string(),
                value,
            },
        );
    }

    /// Sets the tooltip. An empty value removes it.
    pub fn set_tooltip(&mut self, id: ComponentId, tooltip: &str) {
        let component = match self.nodes.get_mut(&id) {
            Some(component) => component,
            None => return,
        };
        let tooltip = Some(tooltip.to_string()).filter(|t| !t.is_empty());
        if component.tooltip == tooltip {
            return;
        }
        component.tooltip = tooltip;
        let value = component.tooltip.clone().unwrap_or_default();
        self.emit(
            id,
            Instruction::SetAttribute {
                target: id,
                name: "title",
                value,
            },
        );
    }

    /// Renders a component to markup. Unknown components render as an empty string.
    ///
    /// Rendering has no side effects and works whether or not the component is attached.
    pub fn render(&self, id: ComponentId) -> String {
        self.render_element(id)
            .map(|element| element.to_markup())
            .unwrap_or_default()
    }

    pub(crate) fn render_element(&self, id: ComponentId) -> Option<Element> {
        let component = self.nodes.get(&id)?;
        let element = match &component.kind {
            Kind::Label(label) => widgets::render_label(label),
            Kind::Button(button) => widgets::render_button(id, button),
            Kind::TextField(field) => widgets::render_text_field(id, field),
            Kind::NumberField(field) => widgets::render_number_field(id, field),
            Kind::CheckBox(check_box) => widgets::render_check_box(id, check_box),
            Kind::ContextMenu(menu) => widgets::render_context_menu(id, menu),
            Kind::Container(container) => container::render(self, container),
            Kind::Tabs(tabs) => composite::render_tabs(self, id, tabs),
            Kind::DropButton(button) => composite::render_drop_button(self, id, button),
            Kind::TreeView(view) => composite::render_tree_view(self, id, view),
            Kind::Table(t) => table::render(self, id, t),
            Kind::Dialog(dialog) => dialog::render(self, id, dialog),
        };
        Some(component.decorate(element))
    }

    /// Re-renders an attached component and replaces its client-side node.
    pub fn redraw(&self, id: ComponentId) {
        if !self.is_attached(id) {
            return;
        }
        let markup = self.render(id);
        self.emit(id, Instruction::Replace { target: id, markup });
    }

    /// Registers a listener and returns its handle.
    pub fn on<F>(&mut self, id: ComponentId, kind: EventKind, listener: F) -> Listener
    where
        F: 'static + FnMut(&mut ComponentTree, &str) + Send,
    {
        let listener = Listener::new(listener);
        self.add_listener(id, kind, listener.clone());
        listener
    }

    pub fn add_listener(&mut self, id: ComponentId, kind: EventKind, listener: Listener) {
        if self.nodes.contains_key(&id) {
            self.listeners.add(id, kind, listener);
        } else {
            debug!(%id, ?kind, "not registering listener on unknown component");
        }
    }

    pub fn remove_listener(&mut self, id: ComponentId, kind: EventKind, listener: &Listener) -> bool {
        self.listeners.remove(id, kind, listener)
    }

    /// Number of listeners registered on a component.
    pub fn listener_count(&self, id: ComponentId) -> usize {
        self.listeners.count(id)
    }

    /// Notifies listeners in registration order.
    ///
    /// Stops early if a listener disposes the component.
    pub(crate) fn fire(&mut self, id: ComponentId, kind: EventKind, value: &str) {
        for listener in self.listeners.get(id, kind) {
            if !self.nodes.contains_key(&id) {
                break;
            }
            listener.call(self, value);
        }
    }

    /// Disposes a component and everything it owns.
    ///
    /// The component is first taken out of its owner (which updates the client), then its
    /// dialogs, children and listeners are released. Disposing twice does nothing.
    pub fn dispose(&mut self, id: ComponentId) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        if let Some(owner) = self.owner(id) {
            if self.release_from_owner(owner, id) {
                return;
            }
        }
        self.dispose_subtree(id);
    }

    /// Takes a component out of its owner. Returns true if the owner also disposed it.
    fn release_from_owner(&mut self, owner: ComponentId, id: ComponentId) -> bool {
        enum Release {
            Child,
            Title,
            Tab(usize),
            TreeNode,
            TableCell,
            DialogContent,
            Other,
        }

        let release = match self.kind(owner) {
            Some(Kind::Container(c)) if c.children.contains(&id) => Release::Child,
            Some(Kind::Container(c)) if c.title == Some(id) => Release::Title,
            Some(Kind::Tabs(tabs)) => tabs
                .tabs
                .iter()
                .position(|tab| tab.label == id || tab.content == id)
                .map_or(Release::Other, Release::Tab),
            Some(Kind::TreeView(_)) => Release::TreeNode,
            Some(Kind::Table(_)) => Release::TableCell,
            Some(Kind::Dialog(dialog)) if dialog.content == id => Release::DialogContent,
            _ => Release::Other,
        };

        match release {
            Release::Child => {
                self.remove(owner, &[id]);
                false
            }
            Release::Title => {
                if let Some(Kind::Container(c)) = self.kind_mut(owner) {
                    c.title = None;
                }
                self.redraw(owner);
                false
            }
            Release::Tab(index) => {
                self.remove_tab(owner, index);
                true
            }
            Release::TreeNode => self.remove_tree_node(owner, id),
            Release::TableCell => {
                self.release_cell(owner, id);
                false
            }
            Release::DialogContent => {
                self.dispose_dialog(owner);
                true
            }
            Release::Other => false,
        }
    }

    /// Disposes a component without touching its owner.
    ///
    /// Dialogs go first, latest first, then children, then the border title.
    pub(crate) fn dispose_subtree(&mut self, id: ComponentId) {
        let (overlays, owned) = match self.kind(id) {
            None => return,
            Some(Kind::Dialog(_)) => {
                self.dispose_dialog(id);
                return;
            }
            Some(Kind::Container(c)) => (
                c.overlays.clone(),
                c.children.iter().chain(c.title.iter()).copied().collect(),
            ),
            Some(kind) => (Vec::new(), kind.owned()),
        };

        for dialog in overlays.into_iter().rev() {
            self.dispose_dialog(dialog);
        }
        for child in owned {
            self.dispose_subtree(child);
        }

        self.listeners.remove_component(id);
        self.nodes.remove(&id);
        if self.root == Some(id) {
            self.root = None;
        }
        debug!(%id, "disposed component");
    }

    /// Removes a disposed dialog from its bookkeeping. Used by dialog disposal.
    pub(crate) fn forget(&mut self, id: ComponentId) {
        self.listeners.remove_component(id);
        self.nodes.remove(&id);
    }
}

#[cfg(test)]
use crate::session::QueueChannel;
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
fn session() -> (Session, QueueChannel) {
    let channel = QueueChannel::new();
    (
        Session::new(Arc::new(channel.clone()), Settings::default()),
        channel,
    )
}

#[test]
fn test_tree_mount_and_dispose() {
    let (session, channel) = session();
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let inner = tree.row();
    let label = tree.label("hello");
    tree.push(inner, &[label]);
    tree.push(root, &[inner]);
    tree.on(label, EventKind::ValueChanged, |_, _| {});
    assert!(!tree.is_attached(label));

    assert!(tree.mount(root, session));
    assert!(channel.drain().is_empty(), "mounting emits nothing");
    for id in &[root, inner, label] {
        assert_eq!(tree.get(*id).and_then(Component::master), Some(root));
    }

    tree.dispose(root);
    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
    assert_eq!(tree.listener_count(label), 0);
    assert!(tree.children(root).is_empty());

    // second disposal is a no-op
    tree.dispose(root);
    assert!(tree.is_empty());
}

#[test]
fn mount_rejects_owned_components() {
    let (session, _) = session();
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let child = tree.column();
    tree.push(root, &[child]);
    assert!(!tree.mount(child, session.clone()));
    assert!(!tree.mount(ComponentId::new(), session));
}

#[test]
fn property_patches_target_one_node() {
    let (session, channel) = session();
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let label = tree.label("x");
    tree.push(root, &[label]);

    // detached: state changes, nothing is sent
    tree.set_style(label, "color", "red");
    assert!(channel.drain().is_empty());

    tree.mount(root, session);
    tree.set_visible(label, false);
    tree.set_visible(label, false);
    tree.set_enabled(label, false);
    tree.set_style(label, "color", "red");
    tree.set_style(label, "color", "blue");
    tree.set_tooltip(label, "tip");
    tree.set_width(label, "50%");

    let id = format!("\"{}\"", label);
    assert_eq!(
        channel.drain(),
        vec![
            format!("perch.style({}, \"visibility\", \"hidden\");", id),
            format!("perch.toggleClass({}, \"perch-disabled\", true);", id),
            format!("perch.style({}, \"color\", \"blue\");", id),
            format!("perch.attr({}, \"title\", \"tip\");", id),
            format!("perch.style({}, \"width\", \"50%\");", id),
        ]
    );
    let component = tree.get(label).unwrap();
    assert!(!component.is_visible());
    assert!(!component.is_enabled());
    assert_eq!(component.style("color"), Some("blue"));
    assert_eq!(component.width(), Some("50%"));
}

#[test]
fn fire_stops_when_a_listener_disposes_the_component() {
    let mut tree = ComponentTree::new();
    let label = tree.label("x");
    let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let log = Arc::clone(&calls);
    tree.on(label, EventKind::ValueChanged, move |tree, _| {
        log.lock().push("first");
        tree.dispose(label);
    });
    let log = Arc::clone(&calls);
    tree.on(label, EventKind::ValueChanged, move |_, _| {
        log.lock().push("second");
    });

    tree.set_text(label, "y");
    assert_eq!(*calls.lock(), vec!["first"]);
    assert!(!tree.contains(label));
}
