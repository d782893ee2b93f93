//! Composite components.
//!
//! Composites own components outside of a container child list: tab labels and tab contents,
//! option menus, tree nodes. They expose them to the event router through
//! [`Kind::internal_slots`].

use crate::component::Kind;
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::instruction::dispatch_literal;
use crate::markup::Element;
use crate::tree::ComponentTree;
use crate::widgets::{ContextMenu, Label};
use tracing::debug;

const SELECT_PREFIX: &str = "#select ";
const CLOSE_PREFIX: &str = "#close ";
const ADD: &str = "#add";
const HOVER: &str = "#hover";
const SELECTED_PREFIX: &str = "#selected ";
const DESELECTED: &str = "#deselected";
const MOVED_PREFIX: &str = "#moved ";

/// A tab: its title label and its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tab {
    pub label: ComponentId,
    pub content: ComponentId,
}

/// A tabbed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabs {
    pub(crate) tabs: Vec<Tab>,
    pub(crate) selected: Option<usize>,
    /// Editable tab views show close and add affordances.
    pub(crate) editable: bool,
    /// Tab selector menu listing every tab title.
    pub(crate) menu: ComponentId,
}

impl Tabs {
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn menu(&self) -> ComponentId {
        self.menu
    }
}

/// A button with a menu of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropButton {
    pub(crate) text: String,
    pub(crate) menu: ComponentId,
}

impl DropButton {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn menu(&self) -> ComponentId {
        self.menu
    }
}

/// A node of a tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub(crate) component: ComponentId,
    /// Sortable nodes may be moved among their siblings by the user.
    pub(crate) sortable: bool,
    pub(crate) children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }
}

/// A tree of nodes, each showing a component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeView {
    pub(crate) roots: Vec<TreeNode>,
    pub(crate) selected: Option<ComponentId>,
}

impl TreeView {
    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn selected(&self) -> Option<ComponentId> {
        self.selected
    }

    /// Node components in pre-order.
    pub fn components(&self) -> Vec<ComponentId> {
        let mut components = Vec::new();
        collect(&self.roots, &mut components);
        components
    }

    pub fn find(&self, component: ComponentId) -> Option<&TreeNode> {
        find_node(&self.roots, component)
    }
}

fn collect(nodes: &[TreeNode], out: &mut Vec<ComponentId>) {
    for node in nodes {
        out.push(node.component);
        collect(&node.children, out);
    }
}

fn find_node(nodes: &[TreeNode], component: ComponentId) -> Option<&TreeNode> {
    for node in nodes {
        if node.component == component {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, component) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut(nodes: &mut [TreeNode], component: ComponentId) -> Option<&mut TreeNode> {
    for node in nodes.iter_mut() {
        if node.component == component {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, component) {
            return Some(found);
        }
    }
    None
}

/// Finds the sibling list holding a node, and the node’s position in it.
fn siblings_of(
    nodes: &mut Vec<TreeNode>,
    component: ComponentId,
) -> Option<(&mut Vec<TreeNode>, usize)> {
    if let Some(pos) = nodes.iter().position(|n| n.component == component) {
        return Some((nodes, pos));
    }
    for node in nodes.iter_mut() {
        if let Some(found) = siblings_of(&mut node.children, component) {
            return Some(found);
        }
    }
    None
}

/// Parses `<prefix><index>` with an index below `len`.
pub(crate) fn parse_index(payload: &str, prefix: &str, len: usize) -> Option<usize> {
    payload
        .strip_prefix(prefix)
        .and_then(|index| index.trim().parse::<usize>().ok())
        .filter(|index| *index < len)
}

/// Selection after removing the tab at `removed`, leaving `len` tabs.
fn selection_after_removal(selected: Option<usize>, removed: usize, len: usize) -> Option<usize> {
    match selected {
        _ if len == 0 => None,
        Some(s) if s > removed => Some(s - 1),
        Some(s) if s >= len => Some(len - 1),
        other => other,
    }
}

pub(crate) fn render_tabs(tree: &ComponentTree, id: ComponentId, tabs: &Tabs) -> Element {
    let headers = tabs.tabs.iter().enumerate().map(|(index, tab)| {
        let select = dispatch_literal(id, &format!("{}{}", SELECT_PREFIX, index));
        let mut header = Element::new("li")
            .class("perch-tab")
            .attr("onclick", select)
            .children(tree.render_element(tab.label));
        if tabs.selected == Some(index) {
            header = header.class("perch-selected");
        }
        if tabs.editable {
            let close = dispatch_literal(id, &format!("{}{}", CLOSE_PREFIX, index));
            header = header.child(
                Element::new("span")
                    .class("perch-tab-close")
                    .attr("onclick", format!("event.stopPropagation(); {}", close))
                    .text("\u{d7}"),
            );
        }
        header
    });

    let mut list = Element::new("ul").class("perch-tab-list").children(headers);
    if tabs.editable {
        list = list.child(
            Element::new("li")
                .class("perch-tab-add")
                .attr("onclick", dispatch_literal(id, ADD))
                .text("+"),
        );
    }

    let panels = tabs.tabs.iter().enumerate().map(|(index, tab)| {
        Element::new("div")
            .class("perch-tab-panel")
            .attr_if(tabs.selected != Some(index), "style", "display: none")
            .children(tree.render_element(tab.content))
    });

    Element::new("div")
        .class("perch-tabs")
        .child(list)
        .children(tree.render_element(tabs.menu))
        .children(panels)
}

pub(crate) fn render_drop_button(
    tree: &ComponentTree,
    id: ComponentId,
    button: &DropButton,
) -> Element {
    Element::new("div")
        .class("perch-drop-button")
        .child(
            Element::new("button")
                .attr("type", "button")
                .attr("onmouseover", dispatch_literal(id, HOVER))
                .text(button.text.as_str()),
        )
        .children(tree.render_element(button.menu))
}

pub(crate) fn render_tree_view(tree: &ComponentTree, id: ComponentId, view: &TreeView) -> Element {
    Element::new("div")
        .class("perch-tree")
        .child(render_tree_nodes(tree, id, view, &view.roots))
}

fn render_tree_nodes(
    tree: &ComponentTree,
    id: ComponentId,
    view: &TreeView,
    nodes: &[TreeNode],
) -> Element {
    let items = nodes.iter().map(|node| {
        let select = dispatch_literal(id, &format!("{}{}", SELECTED_PREFIX, node.component));
        let mut item = Element::new("li")
            .class("perch-tree-node")
            .attr_if(node.sortable, "data-sortable", "true")
            .child(
                Element::new("div")
                    .class("perch-tree-item")
                    .attr("onclick", select)
                    .children(tree.render_element(node.component)),
            );
        if view.selected == Some(node.component) {
            item = item.class("perch-selected");
        }
        if !node.children.is_empty() {
            item = item.child(render_tree_nodes(tree, id, view, &node.children));
        }
        item
    });
    Element::new("ul").children(items)
}

impl ComponentTree {
    /// Creates a tab view. Editable tab views let the user close tabs and ask for new ones.
    pub fn tabs(&mut self, editable: bool) -> ComponentId {
        let menu = self.insert(Kind::ContextMenu(ContextMenu::new(Vec::new())));
        let tabs = self.insert(Kind::Tabs(Tabs {
            tabs: Vec::new(),
            selected: None,
            editable,
            menu,
        }));
        self.set_owner(menu, Some(tabs));
        self.on(menu, EventKind::Click, move |tree, index| {
            if let Ok(index) = index.parse() {
                tree.select_tab(tabs, index);
            }
        });
        tabs
    }

    pub fn tab_list(&self, tabs: ComponentId) -> &[Tab] {
        match self.kind(tabs) {
            Some(Kind::Tabs(t)) => &t.tabs,
            _ => &[],
        }
    }

    pub fn selected_tab(&self, tabs: ComponentId) -> Option<usize> {
        match self.kind(tabs)? {
            Kind::Tabs(t) => t.selected,
            _ => None,
        }
    }

    /// Adds a tab showing `content`. Returns `None` if `content` cannot be adopted.
    ///
    /// On an attached tab view the new tab becomes selected; otherwise only the first tab is
    /// selected automatically.
    pub fn add_tab(&mut self, tabs: ComponentId, title: &str, content: ComponentId) -> Option<Tab> {
        if !matches!(self.kind(tabs), Some(Kind::Tabs(_))) || !self.can_adopt(tabs, content) {
            return None;
        }
        let label = self.insert(Kind::Label(Label::new(title)));
        self.set_owner(label, Some(tabs));
        self.set_owner(content, Some(tabs));
        let tab = Tab { label, content };

        let attachment = self.attachment(tabs);
        let selected = match self.kind_mut(tabs) {
            Some(Kind::Tabs(t)) => {
                t.tabs.push(tab);
                let index = t.tabs.len() - 1;
                if attachment.is_some() || t.selected.is_none() {
                    t.selected = Some(index);
                    Some(index)
                } else {
                    None
                }
            }
            _ => return None,
        };
        self.sync_tab_menu(tabs, false);

        if let Some(attachment) = attachment {
            self.init(label, attachment.master, &attachment.session);
            self.init(content, attachment.master, &attachment.session);
            self.redraw(tabs);
        }
        if let Some(index) = selected {
            self.fire(tabs, EventKind::Index, &index.to_string());
        }
        Some(tab)
    }

    /// Removes and disposes the tab at `index`, then fires [`EventKind::Remove`] with it.
    pub fn remove_tab(&mut self, tabs: ComponentId, index: usize) {
        let (tab, before, after) = match self.kind_mut(tabs) {
            Some(Kind::Tabs(t)) if index < t.tabs.len() => {
                let tab = t.tabs.remove(index);
                let before = t.selected;
                t.selected = selection_after_removal(before, index, t.tabs.len());
                (tab, before, t.selected)
            }
            _ => return,
        };

        self.dispose_subtree(tab.label);
        self.dispose_subtree(tab.content);
        self.sync_tab_menu(tabs, false);
        self.redraw(tabs);

        self.fire(tabs, EventKind::Remove, &index.to_string());
        if let Some(after) = after {
            if before != Some(after) || before == Some(index) {
                self.fire(tabs, EventKind::Index, &after.to_string());
            }
        }
    }

    /// Selects a tab and fires [`EventKind::Index`].
    pub fn select_tab(&mut self, tabs: ComponentId, index: usize) {
        self.apply_tab_selection(tabs, index, true);
    }

    fn apply_tab_selection(&mut self, tabs: ComponentId, index: usize, update_client: bool) {
        match self.kind_mut(tabs) {
            Some(Kind::Tabs(t)) if index < t.tabs.len() && t.selected != Some(index) => {
                t.selected = Some(index)
            }
            _ => return,
        }
        if update_client {
            self.redraw(tabs);
        }
        self.fire(tabs, EventKind::Index, &index.to_string());
    }

    /// Mirrors the tab titles into the tab selector menu.
    pub(crate) fn sync_tab_menu(&mut self, tabs: ComponentId, update_client: bool) {
        let (menu, labels) = match self.kind(tabs) {
            Some(Kind::Tabs(t)) => (t.menu, t.tabs.iter().map(|tab| tab.label).collect::<Vec<_>>()),
            _ => return,
        };
        let options = labels
            .iter()
            .map(|label| self.text(*label).unwrap_or_default().to_string())
            .collect();
        self.apply_options(menu, options, update_client);
    }

    pub(crate) fn receive_tabs(&mut self, tabs: ComponentId, payload: &str) {
        let (len, editable) = match self.kind(tabs) {
            Some(Kind::Tabs(t)) => (t.tabs.len(), t.editable),
            _ => return,
        };
        if let Some(index) = parse_index(payload, SELECT_PREFIX, len) {
            // the client already shows the tab
            self.apply_tab_selection(tabs, index, false);
        } else if let Some(index) = parse_index(payload, CLOSE_PREFIX, len).filter(|_| editable) {
            self.remove_tab(tabs, index);
        } else if payload == ADD && editable {
            self.fire(tabs, EventKind::Add, "add");
        } else {
            debug!(%tabs, payload, "ignoring tabs payload");
        }
    }

    /// Creates a drop button. Picking an option fires [`EventKind::Selection`] on the button
    /// with the option text.
    pub fn drop_button<I, S>(&mut self, text: impl Into<String>, options: I) -> ComponentId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let menu = self.context_menu(options);
        let button = self.insert(Kind::DropButton(DropButton {
            text: text.into(),
            menu,
        }));
        self.set_owner(menu, Some(button));
        self.on(menu, EventKind::Click, move |tree, index| {
            let option = index
                .parse::<usize>()
                .ok()
                .and_then(|index| tree.options(menu).get(index).cloned());
            if let Some(option) = option {
                tree.fire(button, EventKind::Selection, &option);
            }
        });
        button
    }

    pub(crate) fn receive_drop_button(&mut self, button: ComponentId, payload: &str) {
        if payload == HOVER {
            self.fire(button, EventKind::Hover, "hover");
        } else {
            self.apply_text(button, payload.to_string(), false);
        }
    }

    pub fn tree_view(&mut self) -> ComponentId {
        self.insert(Kind::TreeView(TreeView::default()))
    }

    /// Nodes of a tree view.
    pub fn tree_nodes(&self, view: ComponentId) -> &[TreeNode] {
        match self.kind(view) {
            Some(Kind::TreeView(v)) => &v.roots,
            _ => &[],
        }
    }

    /// Adds a node showing `component` under `parent`, or at the top level.
    ///
    /// Returns false if the parent is not a node of this view or the component cannot be
    /// adopted.
    pub fn add_tree_node(
        &mut self,
        view: ComponentId,
        parent: Option<ComponentId>,
        component: ComponentId,
        sortable: bool,
    ) -> bool {
        match self.kind(view) {
            Some(Kind::TreeView(v)) if parent.map_or(true, |p| v.find(p).is_some()) => {}
            _ => return false,
        }
        if !self.can_adopt(view, component) {
            return false;
        }
        self.set_owner(component, Some(view));

        let node = TreeNode {
            component,
            sortable,
            children: Vec::new(),
        };
        if let Some(Kind::TreeView(v)) = self.kind_mut(view) {
            match parent.and_then(|p| find_node_mut(&mut v.roots, p)) {
                Some(parent) => parent.children.push(node),
                None => v.roots.push(node),
            }
        }

        if let Some(attachment) = self.attachment(view) {
            self.init(component, attachment.master, &attachment.session);
            self.redraw(view);
        }
        true
    }

    /// Removes a node and its descendants, disposing their components.
    pub fn remove_tree_node(&mut self, view: ComponentId, component: ComponentId) -> bool {
        let removed = match self.kind_mut(view) {
            Some(Kind::TreeView(v)) => siblings_of(&mut v.roots, component).map(|(s, pos)| s.remove(pos)),
            _ => None,
        };
        let removed = match removed {
            Some(removed) => removed,
            None => return false,
        };

        let mut components = Vec::new();
        collect(std::slice::from_ref(&removed), &mut components);
        if let Some(Kind::TreeView(v)) = self.kind_mut(view) {
            if v.selected.map_or(false, |s| components.contains(&s)) {
                v.selected = None;
            }
        }
        for component in components {
            self.dispose_subtree(component);
        }
        self.redraw(view);
        true
    }

    pub fn selected_node(&self, view: ComponentId) -> Option<ComponentId> {
        match self.kind(view)? {
            Kind::TreeView(v) => v.selected,
            _ => None,
        }
    }

    /// Selects a node, or clears the selection, and fires [`EventKind::Selection`] with the
    /// node’s component id (empty when cleared).
    pub fn select_node(&mut self, view: ComponentId, node: Option<ComponentId>) {
        self.apply_node_selection(view, node, true);
    }

    fn apply_node_selection(&mut self, view: ComponentId, node: Option<ComponentId>, update_client: bool) {
        match self.kind_mut(view) {
            Some(Kind::TreeView(v)) => {
                if node.map_or(false, |n| v.find(n).is_none()) || v.selected == node {
                    return;
                }
                v.selected = node;
            }
            _ => return,
        }
        if update_client {
            self.redraw(view);
        }
        let value = node.map(|n| n.to_string()).unwrap_or_default();
        self.fire(view, EventKind::Selection, &value);
    }

    /// Moves a sortable node to `index` among its siblings and fires [`EventKind::Order`] with
    /// `"<component id> <index>"`.
    pub fn move_tree_node(&mut self, view: ComponentId, node: ComponentId, index: usize) {
        self.apply_move(view, node, index, true);
    }

    fn apply_move(&mut self, view: ComponentId, node: ComponentId, index: usize, update_client: bool) {
        let index = match self.kind_mut(view) {
            Some(Kind::TreeView(v)) => match siblings_of(&mut v.roots, node) {
                Some((siblings, pos)) if siblings[pos].sortable => {
                    let moved = siblings.remove(pos);
                    let index = index.min(siblings.len());
                    siblings.insert(index, moved);
                    if index == pos {
                        return;
                    }
                    index
                }
                _ => return,
            },
            _ => return,
        };
        if update_client {
            self.redraw(view);
        }
        self.fire(view, EventKind::Order, &format!("{} {}", node, index));
    }

    pub(crate) fn receive_tree_view(&mut self, view: ComponentId, payload: &str) {
        if payload == DESELECTED {
            self.apply_node_selection(view, None, false);
        } else if let Some(rest) = payload.strip_prefix(SELECTED_PREFIX) {
            match rest.trim().parse::<ComponentId>() {
                Ok(node) => self.apply_node_selection(view, Some(node), false),
                Err(err) => debug!(%view, %err, "ignoring tree selection"),
            }
        } else if let Some(rest) = payload.strip_prefix(MOVED_PREFIX) {
            let mut parts = rest.split_whitespace();
            let node = parts.next().and_then(|p| p.parse::<ComponentId>().ok());
            let index = parts.next().and_then(|p| p.parse::<usize>().ok());
            match (node, index) {
                (Some(node), Some(index)) => self.apply_move(view, node, index, false),
                _ => debug!(%view, payload, "ignoring malformed tree move"),
            }
        } else {
            debug!(%view, payload, "ignoring tree view payload");
        }
    }
}

#[test]
fn selection_after_tab_removal() {
    assert_eq!(selection_after_removal(Some(0), 0, 0), None);
    assert_eq!(selection_after_removal(Some(2), 0, 2), Some(1));
    assert_eq!(selection_after_removal(Some(1), 1, 2), Some(1));
    assert_eq!(selection_after_removal(Some(2), 2, 2), Some(1));
    assert_eq!(selection_after_removal(Some(0), 1, 2), Some(0));
    assert_eq!(selection_after_removal(None, 0, 1), None);
}

#[test]
fn tab_menu_mirrors_titles() {
    let mut tree = ComponentTree::new();
    let tabs = tree.tabs(true);
    let a = tree.column();
    let b = tree.column();
    let first = tree.add_tab(tabs, "First", a).unwrap();
    tree.add_tab(tabs, "Second", b).unwrap();
    assert_eq!(tree.selected_tab(tabs), Some(0));

    let menu = match tree.kind(tabs) {
        Some(Kind::Tabs(t)) => t.menu(),
        _ => unreachable!(),
    };
    assert_eq!(tree.options(menu), &["First".to_string(), "Second".to_string()]);

    tree.set_text(first.label, "Renamed");
    assert_eq!(tree.options(menu)[0], "Renamed");

    tree.remove_tab(tabs, 0);
    assert_eq!(tree.options(menu), &["Second".to_string()]);
    assert!(!tree.contains(a));
    assert!(!tree.contains(first.label));
    assert_eq!(tree.selected_tab(tabs), Some(0));
}

#[test]
fn tree_nodes_nest_and_move() {
    let mut tree = ComponentTree::new();
    let view = tree.tree_view();
    let root = tree.label("root");
    let a = tree.label("a");
    let b = tree.label("b");
    let c = tree.label("c");

    assert!(tree.add_tree_node(view, None, root, false));
    assert!(tree.add_tree_node(view, Some(root), a, true));
    assert!(tree.add_tree_node(view, Some(root), b, true));
    assert!(tree.add_tree_node(view, Some(a), c, false));
    let stray = tree.label("x");
    assert!(!tree.add_tree_node(view, Some(ComponentId::new()), stray, false));
    assert!(!tree.add_tree_node(view, None, a, false), "already a node");

    let slots = tree.kind(view).map(Kind::internal_slots).unwrap();
    assert_eq!(slots, vec![root, a, c, b]);

    tree.move_tree_node(view, b, 0);
    let order: Vec<_> = tree.tree_nodes(view)[0]
        .children()
        .iter()
        .map(TreeNode::component)
        .collect();
    assert_eq!(order, vec![b, a]);

    // not sortable
    tree.move_tree_node(view, root, 5);
    assert_eq!(tree.tree_nodes(view)[0].component(), root);

    tree.select_node(view, Some(c));
    assert!(tree.remove_tree_node(view, a));
    assert!(!tree.contains(a));
    assert!(!tree.contains(c));
    assert_eq!(tree.selected_node(view), None);
    assert_eq!(tree.kind(view).map(Kind::internal_slots).unwrap(), vec![root, b]);
}
