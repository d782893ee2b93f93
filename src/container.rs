//! Containers.

use crate::component::Kind;
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::instruction::Instruction;
use crate::markup::Element;
use crate::redraw::{self, Mutation, Strategy};
use crate::tree::ComponentTree;
use crate::widgets::Label;
use core::cmp::Ordering;
use tracing::debug;

/// How a container arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Children stacked vertically, one slot each.
    Column,
    /// Children side by side, one slot each.
    Row,
    /// Visible children in rows of `columns` cells.
    Grid { columns: usize },
    /// Only the selected child is shown.
    Cards { selected: Option<usize> },
}

impl Layout {
    /// True if every child always occupies the slot at its own index, so that children can be
    /// inserted and removed on the client by position.
    pub fn is_position_stable(&self) -> bool {
        match self {
            Layout::Column | Layout::Row => true,
            Layout::Grid { .. } | Layout::Cards { .. } => false,
        }
    }

    /// True if hidden children are left out of the rendered layout.
    pub fn filters_hidden(&self) -> bool {
        matches!(self, Layout::Grid { .. })
    }

    fn class(&self) -> &'static str {
        match self {
            Layout::Column => "perch-column",
            Layout::Row => "perch-row",
            Layout::Grid { .. } => "perch-grid",
            Layout::Cards { .. } => "perch-cards",
        }
    }
}

/// A component with an ordered list of children and any number of dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub(crate) layout: Layout,
    pub(crate) children: Vec<ComponentId>,
    /// Dialogs, in creation order.
    pub(crate) overlays: Vec<ComponentId>,
    /// Border title label.
    pub(crate) title: Option<ComponentId>,
}

impl Container {
    pub(crate) fn new(layout: Layout) -> Container {
        Container {
            layout,
            children: Vec::new(),
            overlays: Vec::new(),
            title: None,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn dialogs(&self) -> &[ComponentId] {
        &self.overlays
    }

    pub fn title(&self) -> Option<ComponentId> {
        self.title
    }

    /// Keeps the card selection pointing at a child after the child list changed.
    fn reselect(&mut self, previous: Option<ComponentId>) {
        if let Layout::Cards { selected } = &mut self.layout {
            *selected = previous
                .and_then(|id| self.children.iter().position(|c| *c == id))
                .or(if self.children.is_empty() { None } else { Some(0) });
        }
    }

    fn selected_card(&self) -> Option<ComponentId> {
        match self.layout {
            Layout::Cards { selected } => selected.and_then(|i| self.children.get(i).copied()),
            _ => None,
        }
    }
}

/// Wraps a child in its slot element.
pub(crate) fn slot(child: Element) -> Element {
    Element::new("div").class("perch-slot").child(child)
}

pub(crate) fn render(tree: &ComponentTree, container: &Container) -> Element {
    let mut element = Element::new("div")
        .class("perch-container")
        .class(container.layout.class());

    if let Some(title) = container.title.and_then(|t| tree.render_element(t)) {
        element = element.child(Element::new("div").class("perch-title").child(title));
    }

    let body = match container.layout {
        Layout::Column | Layout::Row => Element::new("div").class("perch-slots").children(
            container
                .children
                .iter()
                .filter_map(|c| tree.render_element(*c))
                .map(slot),
        ),
        Layout::Grid { columns } => {
            let columns = columns.max(1);
            let cells = container
                .children
                .iter()
                .filter(|c| tree.get(**c).map_or(false, |c| c.is_visible()))
                .filter_map(|c| tree.render_element(*c));

            let mut rows = Vec::new();
            let mut row = Element::new("tr");
            let mut in_row = 0;
            for cell in cells {
                row = row.child(Element::new("td").child(cell));
                in_row += 1;
                if in_row == columns {
                    rows.push(row);
                    row = Element::new("tr");
                    in_row = 0;
                }
            }
            if in_row > 0 {
                rows.push(row);
            }
            Element::new("table")
                .class("perch-grid-table")
                .child(Element::new("tbody").children(rows))
        }
        Layout::Cards { .. } => Element::new("div")
            .class("perch-card")
            .children(container.selected_card().and_then(|c| tree.render_element(c))),
    };

    element.child(body)
}

impl ComponentTree {
    /// Creates an empty container. Cards start out with nothing selected.
    pub fn container(&mut self, layout: Layout) -> ComponentId {
        let mut container = Container::new(layout);
        container.reselect(None);
        self.insert(Kind::Container(container))
    }

    pub fn column(&mut self) -> ComponentId {
        self.container(Layout::Column)
    }

    pub fn row(&mut self) -> ComponentId {
        self.container(Layout::Row)
    }

    pub fn grid(&mut self, columns: usize) -> ComponentId {
        self.container(Layout::Grid { columns })
    }

    pub fn cards(&mut self) -> ComponentId {
        self.container(Layout::Cards { selected: None })
    }

    fn container_ref(&self, id: ComponentId) -> Option<&Container> {
        self.kind(id).and_then(Kind::as_container)
    }

    fn container_mut(&mut self, id: ComponentId) -> Option<&mut Container> {
        match self.kind_mut(id) {
            Some(Kind::Container(container)) => Some(container),
            _ => None,
        }
    }

    /// Children of a container, in order. Empty for anything else.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        match self.container_ref(id) {
            Some(c) => &c.children,
            None => &[],
        }
    }

    pub fn dialogs(&self, id: ComponentId) -> &[ComponentId] {
        match self.container_ref(id) {
            Some(c) => &c.overlays,
            None => &[],
        }
    }

    pub fn layout(&self, id: ComponentId) -> Option<Layout> {
        self.container_ref(id).map(|c| c.layout)
    }

    /// Appends children to a container.
    pub fn push(&mut self, container: ComponentId, children: &[ComponentId]) {
        let len = self.children(container).len();
        self.add(container, len, children);
    }

    /// Inserts children at `index`, clamped to the number of children.
    ///
    /// Children that are unknown, already owned, dialogs, or ancestors of the container are
    /// skipped. If the container is attached, the new children are attached before the client is
    /// told about them.
    pub fn add(&mut self, container: ComponentId, index: usize, children: &[ComponentId]) {
        if self.container_ref(container).is_none() {
            debug!(%container, "cannot add children to a non-container");
            return;
        }

        let mut accepted: Vec<ComponentId> = Vec::with_capacity(children.len());
        for &child in children {
            if !accepted.contains(&child) && self.can_adopt(container, child) {
                accepted.push(child);
            }
        }
        if accepted.is_empty() {
            return;
        }

        for &child in &accepted {
            self.set_owner(child, Some(container));
        }
        let (index, layout) = match self.container_mut(container) {
            Some(c) => {
                let previous = c.selected_card();
                let index = index.min(c.children.len());
                c.children.splice(index..index, accepted.iter().copied());
                c.reselect(previous);
                (index, c.layout)
            }
            None => return,
        };

        let attachment = match self.attachment(container) {
            Some(attachment) => attachment,
            None => return,
        };
        for &child in &accepted {
            self.init(child, attachment.master, &attachment.session);
        }

        match redraw::strategy(layout, Mutation::Insert) {
            Strategy::Patch => {
                let markup: String = accepted
                    .iter()
                    .filter_map(|c| self.render_element(*c))
                    .map(|element| slot(element).to_markup())
                    .collect();
                self.emit(
                    container,
                    Instruction::Insert {
                        container,
                        index,
                        markup,
                    },
                );
            }
            Strategy::Replace => self.redraw(container),
        }
    }

    /// Removes children from a container. Components that are not children are ignored.
    ///
    /// Removed children are detached but stay alive, so they can be added elsewhere.
    pub fn remove(&mut self, container: ComponentId, children: &[ComponentId]) {
        let (indices, removed, layout) = match self.container_mut(container) {
            Some(c) => {
                let mut indices: Vec<usize> = children
                    .iter()
                    .filter_map(|id| c.children.iter().position(|c| c == id))
                    .collect();
                if indices.is_empty() {
                    return;
                }
                indices.sort_unstable();
                indices.dedup();
                indices.reverse();

                let previous = c.selected_card();
                let removed: Vec<ComponentId> =
                    indices.iter().map(|i| c.children.remove(*i)).collect();
                c.reselect(previous);
                (indices, removed, c.layout)
            }
            None => return,
        };

        let attached = self.is_attached(container);
        for &child in &removed {
            self.set_owner(child, None);
            self.detach(child);
        }
        if !attached {
            return;
        }

        match redraw::strategy(layout, Mutation::Remove) {
            Strategy::Patch => self.emit(container, Instruction::RemoveSlots { container, indices }),
            Strategy::Replace => self.redraw(container),
        }
    }

    /// Removes the children at the given positions.
    pub fn remove_at(&mut self, container: ComponentId, indices: &[usize]) {
        let current = self.children(container);
        let children: Vec<ComponentId> = indices
            .iter()
            .filter_map(|i| current.get(*i).copied())
            .collect();
        self.remove(container, &children);
    }

    /// Replaces all children of a container.
    pub fn set_children(&mut self, container: ComponentId, children: &[ComponentId]) {
        let previous = match self.container_mut(container) {
            Some(c) => std::mem::take(&mut c.children),
            None => return,
        };
        for &child in &previous {
            self.set_owner(child, None);
            self.detach(child);
        }

        let mut accepted: Vec<ComponentId> = Vec::with_capacity(children.len());
        for &child in children {
            if !accepted.contains(&child) && self.can_adopt(container, child) {
                accepted.push(child);
            }
        }
        for &child in &accepted {
            self.set_owner(child, Some(container));
        }
        if let Some(c) = self.container_mut(container) {
            c.children = accepted.clone();
            c.reselect(None);
        }

        if let Some(attachment) = self.attachment(container) {
            for &child in &accepted {
                self.init(child, attachment.master, &attachment.session);
            }
            self.redraw(container);
        }
    }

    /// Sorts the children of a container with a stable sort, and redraws it if the order
    /// changed.
    pub fn sort_children_by<F>(&mut self, container: ComponentId, mut compare: F)
    where
        F: FnMut(&crate::Component, &crate::Component) -> Ordering,
    {
        let (sorted, previous) = match self.container_ref(container) {
            Some(c) => {
                let mut sorted = c.children.clone();
                sorted.sort_by(|a, b| match (self.get(*a), self.get(*b)) {
                    (Some(a), Some(b)) => compare(a, b),
                    _ => Ordering::Equal,
                });
                if sorted == c.children {
                    return;
                }
                (sorted, c.selected_card())
            }
            None => return,
        };
        let layout = match self.container_mut(container) {
            Some(c) => {
                c.children = sorted;
                c.reselect(previous);
                c.layout
            }
            None => return,
        };
        if redraw::strategy(layout, Mutation::Reorder) == Strategy::Replace {
            self.redraw(container);
        }
    }

    /// Sets the border title of a container. The title is a label owned by the container.
    pub fn set_border_title(&mut self, container: ComponentId, title: &str) {
        let existing = match self.container_ref(container) {
            Some(c) => c.title,
            None => return,
        };
        match existing {
            Some(label) => self.set_text(label, title),
            None => {
                let label = self.insert(Kind::Label(Label::new(title)));
                self.set_owner(label, Some(container));
                if let Some(c) = self.container_mut(container) {
                    c.title = Some(label);
                }
                if let Some(attachment) = self.attachment(container) {
                    self.init(label, attachment.master, &attachment.session);
                    self.redraw(container);
                }
            }
        }
        self.fire(container, EventKind::Title, title);
    }

    pub fn border_title(&self, container: ComponentId) -> Option<&str> {
        self.container_ref(container)
            .and_then(|c| c.title)
            .and_then(|label| self.text(label))
    }

    /// Index of the shown card of a card container.
    pub fn card(&self, container: ComponentId) -> Option<usize> {
        let len = self.children(container).len();
        match self.layout(container)? {
            Layout::Cards { selected } => selected.filter(|i| *i < len),
            _ => None,
        }
    }

    /// Shows the card at `index` and fires [`EventKind::Index`].
    pub fn set_card(&mut self, container: ComponentId, index: usize) {
        let layout = match self.container_mut(container) {
            Some(c) if index < c.children.len() => match &mut c.layout {
                Layout::Cards { selected } if *selected != Some(index) => {
                    *selected = Some(index);
                    c.layout
                }
                _ => return,
            },
            _ => return,
        };
        if redraw::strategy(layout, Mutation::Selection) == Strategy::Replace {
            self.redraw(container);
        }
        self.fire(container, EventKind::Index, &index.to_string());
    }

    pub fn first_card(&mut self, container: ComponentId) {
        self.set_card(container, 0);
    }

    pub fn last_card(&mut self, container: ComponentId) {
        let len = self.children(container).len();
        if len > 0 {
            self.set_card(container, len - 1);
        }
    }

    /// Shows the next card, wrapping around.
    pub fn next_card(&mut self, container: ComponentId) {
        let len = self.children(container).len();
        if len == 0 {
            return;
        }
        if let Some(current) = self.card(container) {
            self.set_card(container, (current + 1) % len);
        }
    }

    /// Shows the previous card, wrapping around.
    pub fn previous_card(&mut self, container: ComponentId) {
        let len = self.children(container).len();
        if len == 0 {
            return;
        }
        if let Some(current) = self.card(container) {
            self.set_card(container, (current + len - 1) % len);
        }
    }
}

#[test]
fn grid_rows_skip_hidden_children() {
    let mut tree = ComponentTree::new();
    let grid = tree.grid(2);
    let labels: Vec<_> = (0..4).map(|i| tree.label(format!("L{}", i))).collect();
    tree.push(grid, &labels);
    tree.set_visible(labels[1], false);

    let markup = tree.render(grid);
    assert_eq!(markup.matches("<tr>").count(), 2);
    assert_eq!(markup.matches("<td>").count(), 3);
    assert!(!markup.contains("L1"));
}

#[test]
fn cards_follow_their_selection() {
    let mut tree = ComponentTree::new();
    let cards = tree.cards();
    let a = tree.label("first card");
    let b = tree.label("second card");
    let c = tree.label("third card");
    assert_eq!(tree.card(cards), None);

    tree.push(cards, &[a, b, c]);
    assert_eq!(tree.card(cards), Some(0));
    assert!(tree.render(cards).contains("first card"));
    assert!(!tree.render(cards).contains("second card"));

    tree.previous_card(cards);
    assert_eq!(tree.card(cards), Some(2));
    tree.next_card(cards);
    assert_eq!(tree.card(cards), Some(0));

    tree.set_card(cards, 1);
    tree.remove(cards, &[a]);
    assert_eq!(tree.card(cards), Some(0), "selection follows the shown child");
    assert!(tree.render(cards).contains("second card"));

    tree.remove(cards, &[b]);
    assert_eq!(tree.card(cards), Some(0));
    tree.remove(cards, &[c]);
    assert_eq!(tree.card(cards), None);
}

#[test]
fn card_selection_without_cards() {
    let mut tree = ComponentTree::new();
    let cards = tree.container(Layout::Cards { selected: Some(3) });
    assert_eq!(tree.card(cards), None);
    tree.next_card(cards);
    tree.previous_card(cards);
    tree.last_card(cards);
    assert_eq!(tree.card(cards), None);
    assert!(tree.render(cards).contains("perch-card"));

    let only = tree.label("only card");
    tree.push(cards, &[only]);
    assert_eq!(tree.card(cards), Some(0));
    tree.next_card(cards);
    assert_eq!(tree.card(cards), Some(0));
    assert!(tree.render(cards).contains("only card"));
}

#[test]
fn misuse_is_ignored() {
    let mut tree = ComponentTree::new();
    let outer = tree.column();
    let inner = tree.column();
    let other = tree.column();
    let label = tree.label("x");

    tree.push(outer, &[inner, inner]);
    assert_eq!(tree.children(outer), &[inner]);
    tree.push(inner, &[label]);

    // already owned
    tree.push(other, &[label]);
    assert!(tree.children(other).is_empty());
    // cycles
    tree.push(inner, &[outer]);
    tree.push(inner, &[inner]);
    assert_eq!(tree.children(inner), &[label]);
    // not a container
    tree.push(label, &[other]);
    assert_eq!(tree.owner(other), None);
    // not a child
    tree.remove(outer, &[label, ComponentId::new()]);
    assert_eq!(tree.children(inner), &[label]);
}

#[test]
fn sort_and_replace_children() {
    let mut tree = ComponentTree::new();
    let column = tree.column();
    let b = tree.label("b");
    let a = tree.label("a");
    let c = tree.label("c");
    tree.push(column, &[b, a]);

    tree.sort_children_by(column, |x, y| {
        let text = |c: &crate::Component| match c.kind() {
            Kind::Label(label) => label.text().to_string(),
            _ => String::new(),
        };
        text(x).cmp(&text(y))
    });
    assert_eq!(tree.children(column), &[a, b]);

    tree.set_children(column, &[c, b]);
    assert_eq!(tree.children(column), &[c, b]);
    assert_eq!(tree.owner(a), None);
    assert_eq!(tree.owner(c), Some(column));
}

#[test]
fn border_title() {
    let mut tree = ComponentTree::new();
    let column = tree.column();
    assert_eq!(tree.border_title(column), None);
    tree.set_border_title(column, "Settings");
    tree.set_border_title(column, "Options");
    assert_eq!(tree.border_title(column), Some("Options"));
    let markup = tree.render(column);
    assert!(markup.contains("<div class=\"perch-title\">"));
    assert!(markup.contains("Options"));
}
