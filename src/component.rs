//! Components.

use crate::composite::{DropButton, Tabs, TreeView};
use crate::container::Container;
use crate::dialog::Dialog;
use crate::id::ComponentId;
use crate::markup::Element;
use crate::session::Session;
use crate::table::Table;
use crate::widgets::{Button, CheckBox, ContextMenu, Label, NumberField, TextField};
use std::collections::BTreeMap;

/// Class carried by disabled components.
pub(crate) const DISABLED_CLASS: &str = "perch-disabled";

/// Where a component is attached: the id of the master (root) container and the session.
#[derive(Debug, Clone)]
pub(crate) struct Attachment {
    pub(crate) master: ComponentId,
    pub(crate) session: Session,
}

/// A component: properties shared by every kind, plus the kind itself.
#[derive(Debug)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) styles: BTreeMap<String, String>,
    pub(crate) width: Option<String>,
    pub(crate) height: Option<String>,
    pub(crate) tooltip: Option<String>,
    pub(crate) attachment: Option<Attachment>,
    /// The container, composite or dialog this component belongs to.
    pub(crate) owner: Option<ComponentId>,
    pub(crate) kind: Kind,
}

impl Component {
    pub(crate) fn new(kind: Kind) -> Component {
        Component {
            id: ComponentId::new(),
            visible: true,
            enabled: true,
            styles: BTreeMap::new(),
            width: None,
            height: None,
            tooltip: None,
            attachment: None,
            owner: None,
            kind,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        self.styles.get(key).map(String::as_str)
    }

    pub fn width(&self) -> Option<&str> {
        self.width.as_deref()
    }

    pub fn height(&self) -> Option<&str> {
        self.height.as_deref()
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    pub fn owner(&self) -> Option<ComponentId> {
        self.owner
    }

    /// Whether mutations of this component are sent to a client.
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Id of the root container this component was attached under.
    pub fn master(&self) -> Option<ComponentId> {
        self.attachment.as_ref().map(|a| a.master)
    }

    /// Applies the shared properties to a kind’s rendered root element.
    pub(crate) fn decorate(&self, element: Element) -> Element {
        let mut element = element.attr("id", self.id.to_string());
        if let Some(style) = self.style_attr() {
            element = element.attr("style", style);
        }
        if !self.enabled {
            element = element.class(DISABLED_CLASS);
        }
        if let Some(tooltip) = &self.tooltip {
            element = element.attr("title", tooltip.as_str());
        }
        element
    }

    fn style_attr(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .styles
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        if let Some(width) = &self.width {
            parts.push(format!("width: {}", width));
        }
        if let Some(height) = &self.height {
            parts.push(format!("height: {}", height));
        }
        if !self.visible {
            parts.push("visibility: hidden".to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// The kinds of components.
#[derive(Debug)]
pub enum Kind {
    Label(Label),
    Button(Button),
    TextField(TextField),
    NumberField(NumberField),
    CheckBox(CheckBox),
    ContextMenu(ContextMenu),
    Container(Container),
    Tabs(Tabs),
    DropButton(DropButton),
    TreeView(TreeView),
    Table(Table),
    Dialog(Dialog),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Label(_) => "label",
            Kind::Button(_) => "button",
            Kind::TextField(_) => "text field",
            Kind::NumberField(_) => "number field",
            Kind::CheckBox(_) => "check box",
            Kind::ContextMenu(_) => "context menu",
            Kind::Container(_) => "container",
            Kind::Tabs(_) => "tabs",
            Kind::DropButton(_) => "drop button",
            Kind::TreeView(_) => "tree view",
            Kind::Table(_) => "table",
            Kind::Dialog(_) => "dialog",
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Kind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Composites hold components outside of a container child list.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Kind::Tabs(_) | Kind::DropButton(_) | Kind::TreeView(_) | Kind::Table(_)
        )
    }

    /// Components held by a composite, in search order.
    ///
    /// - tabs: the tab selector menu, then each tab’s label followed by its content
    /// - drop buttons: the option menu
    /// - tree views: node components in pre-order
    /// - tables: cells in row-major order
    ///
    /// Empty for every other kind.
    pub fn internal_slots(&self) -> Vec<ComponentId> {
        match self {
            Kind::Tabs(tabs) => {
                let mut slots = Vec::with_capacity(1 + tabs.tabs.len() * 2);
                slots.push(tabs.menu);
                for tab in &tabs.tabs {
                    slots.push(tab.label);
                    slots.push(tab.content);
                }
                slots
            }
            Kind::DropButton(button) => vec![button.menu],
            Kind::TreeView(view) => view.components(),
            Kind::Table(table) => table.cells(),
            _ => Vec::new(),
        }
    }

    /// Every component this one owns.
    pub(crate) fn owned(&self) -> Vec<ComponentId> {
        match self {
            Kind::Container(container) => container
                .overlays
                .iter()
                .chain(container.children.iter())
                .chain(container.title.iter())
                .copied()
                .collect(),
            Kind::Dialog(dialog) => vec![dialog.content],
            kind => kind.internal_slots(),
        }
    }
}

#[cfg(test)]
use crate::composite::Tab;
#[cfg(test)]
use crate::container::Layout;

#[test]
fn decorate_applies_shared_properties() {
    let mut component = Component::new(Kind::Label(Label::new("x")));
    let id = component.id;
    assert_eq!(
        component.decorate(Element::new("span")).to_markup(),
        format!("<span id=\"{}\"></span>", id)
    );

    component.styles.insert("color".into(), "red".into());
    component.styles.insert("background".into(), "blue".into());
    component.styles.insert("margin".into(), " ".into());
    component.width = Some("10px".into());
    component.visible = false;
    component.enabled = false;
    component.tooltip = Some("<tip>".into());

    assert_eq!(
        component.decorate(Element::new("span")).to_markup(),
        format!(
            "<span class=\"perch-disabled\" id=\"{}\" \
             style=\"background: blue; color: red; width: 10px; visibility: hidden\" \
             title=\"&lt;tip&gt;\"></span>",
            id
        )
    );
}

#[test]
fn tab_slots_are_menu_then_label_content_pairs() {
    let menu = ComponentId::new();
    let tabs: Vec<Tab> = (0..2)
        .map(|_| Tab {
            label: ComponentId::new(),
            content: ComponentId::new(),
        })
        .collect();
    let kind = Kind::Tabs(Tabs {
        tabs: tabs.clone(),
        selected: None,
        editable: false,
        menu,
    });

    assert_eq!(
        kind.internal_slots(),
        vec![menu, tabs[0].label, tabs[0].content, tabs[1].label, tabs[1].content]
    );
    assert!(kind.is_composite());
}

#[test]
fn containers_have_no_internal_slots() {
    let mut container = Container::new(Layout::Column);
    let child = ComponentId::new();
    let title = ComponentId::new();
    container.children.push(child);
    container.title = Some(title);
    let kind = Kind::Container(container);

    assert!(kind.internal_slots().is_empty());
    assert!(!kind.is_composite());
    assert_eq!(kind.owned(), vec![child, title]);
}
