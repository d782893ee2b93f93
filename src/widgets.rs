//! Leaf widgets.
//!
//! Leaves hold a single value and render to a single element. The default reaction to a client
//! payload is to take it as the new value; buttons and menus also understand a few commands.

use crate::component::Kind;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::instruction::{dispatch_expr, dispatch_literal, Instruction};
use crate::markup::Element;
use crate::tree::ComponentTree;
use tracing::debug;

/// Payload sent by a clicked button.
const CLICK: &str = "#click";
/// Prefix of the payload sent by a picked menu item; the item index follows.
const ITEM_PREFIX: &str = "#item ";

/// A piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub(crate) text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Label {
        Label { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub(crate) text: String,
}

impl Button {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A single- or multi-line text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub(crate) text: String,
    pub(crate) multiline: bool,
}

impl TextField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }
}

/// A numeric input with a range.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberField {
    pub(crate) value: f64,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) step: f64,
}

impl NumberField {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckBox {
    pub(crate) text: String,
    pub(crate) checked: bool,
}

impl CheckBox {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

/// A list of options. Picking one fires [`EventKind::Click`] with its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub(crate) options: Vec<String>,
}

impl ContextMenu {
    pub(crate) fn new(options: Vec<String>) -> ContextMenu {
        ContextMenu { options }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

pub(crate) fn render_label(label: &Label) -> Element {
    Element::new("span")
        .class("perch-label")
        .text(label.text.as_str())
}

pub(crate) fn render_button(id: ComponentId, button: &Button) -> Element {
    Element::new("button")
        .class("perch-button")
        .attr("type", "button")
        .attr("onclick", dispatch_literal(id, CLICK))
        .text(button.text.as_str())
}

pub(crate) fn render_text_field(id: ComponentId, field: &TextField) -> Element {
    let onchange = dispatch_expr(id, "this.value");
    if field.multiline {
        Element::new("textarea")
            .class("perch-text-area")
            .attr("onchange", onchange)
            .text(field.text.as_str())
    } else {
        Element::new("input")
            .class("perch-text-field")
            .attr("type", "text")
            .attr("value", field.text.as_str())
            .attr("onchange", onchange)
    }
}

pub(crate) fn render_number_field(id: ComponentId, field: &NumberField) -> Element {
    Element::new("input")
        .class("perch-number-field")
        .attr("type", "number")
        .attr("min", field.min.to_string())
        .attr("max", field.max.to_string())
        .attr("step", field.step.to_string())
        .attr("value", field.value.to_string())
        .attr("onchange", dispatch_expr(id, "this.value"))
}

pub(crate) fn render_check_box(id: ComponentId, check_box: &CheckBox) -> Element {
    let input = Element::new("input")
        .attr("type", "checkbox")
        .attr_if(check_box.checked, "checked", "checked")
        .attr("onchange", dispatch_expr(id, "String(this.checked)"));
    Element::new("label")
        .class("perch-check-box")
        .child(input)
        .text(check_box.text.as_str())
}

pub(crate) fn render_context_menu(id: ComponentId, menu: &ContextMenu) -> Element {
    let items = menu.options.iter().enumerate().map(|(index, option)| {
        Element::new("li")
            .class("perch-menu-item")
            .attr(
                "onclick",
                dispatch_literal(id, &format!("{}{}", ITEM_PREFIX, index)),
            )
            .text(option.as_str())
    });
    Element::new("ul").class("perch-menu").children(items)
}

/// Parses a numeric payload. Non-finite values are rejected.
pub(crate) fn parse_number(payload: &str) -> Result<f64> {
    payload
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| Error::MalformedPayload {
            kind: "number field",
            payload: payload.to_string(),
        })
}

pub(crate) fn parse_bool(payload: &str) -> Result<bool> {
    match payload.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::MalformedPayload {
            kind: "check box",
            payload: payload.to_string(),
        }),
    }
}

/// Parses a menu payload into an index below `len`.
pub(crate) fn parse_item(payload: &str, len: usize) -> Result<usize> {
    payload
        .strip_prefix(ITEM_PREFIX)
        .and_then(|index| index.trim().parse::<usize>().ok())
        .filter(|index| *index < len)
        .ok_or_else(|| Error::MalformedPayload {
            kind: "context menu",
            payload: payload.to_string(),
        })
}

/// How a text change is shown on the client.
enum TextPatch {
    Text,
    Value,
    Redraw,
}

impl ComponentTree {
    pub fn label(&mut self, text: impl Into<String>) -> ComponentId {
        self.insert(Kind::Label(Label::new(text)))
    }

    /// Creates a button. Clicking it fires [`EventKind::Click`].
    pub fn button(&mut self, text: impl Into<String>) -> ComponentId {
        self.insert(Kind::Button(Button { text: text.into() }))
    }

    pub fn text_field(&mut self, text: impl Into<String>) -> ComponentId {
        self.insert(Kind::TextField(TextField {
            text: text.into(),
            multiline: false,
        }))
    }

    pub fn text_area(&mut self, text: impl Into<String>) -> ComponentId {
        self.insert(Kind::TextField(TextField {
            text: text.into(),
            multiline: true,
        }))
    }

    /// Creates a number field. The bounds are swapped if given in the wrong order, and the
    /// initial value is clamped into them.
    pub fn number_field(&mut self, value: f64, min: f64, max: f64, step: f64) -> ComponentId {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let mut field = NumberField {
            value: min,
            min,
            max,
            step,
        };
        if value.is_finite() {
            field.value = field.clamp(value);
        }
        self.insert(Kind::NumberField(field))
    }

    pub fn check_box(&mut self, text: impl Into<String>, checked: bool) -> ComponentId {
        self.insert(Kind::CheckBox(CheckBox {
            text: text.into(),
            checked,
        }))
    }

    pub fn context_menu<I, S>(&mut self, options: I) -> ComponentId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        self.insert(Kind::ContextMenu(ContextMenu::new(options)))
    }

    /// Text of a label, button, text field or drop button.
    pub fn text(&self, id: ComponentId) -> Option<&str> {
        match self.kind(id)? {
            Kind::Label(label) => Some(&label.text),
            Kind::Button(button) => Some(&button.text),
            Kind::TextField(field) => Some(&field.text),
            Kind::DropButton(button) => Some(&button.text),
            _ => None,
        }
    }

    /// Sets the text of a label, button, text field or drop button, and notifies
    /// [`EventKind::ValueChanged`] if it changed.
    pub fn set_text(&mut self, id: ComponentId, text: impl Into<String>) {
        self.apply_text(id, text.into(), true);
    }

    pub(crate) fn apply_text(&mut self, id: ComponentId, text: String, update_client: bool) {
        let component = match self.get_mut(id) {
            Some(component) => component,
            None => return,
        };
        let owner = component.owner;
        let (current, patch) = match &mut component.kind {
            Kind::Label(Label { text }) | Kind::Button(Button { text }) => (text, TextPatch::Text),
            Kind::TextField(TextField { text, .. }) => (text, TextPatch::Value),
            Kind::DropButton(button) => (&mut button.text, TextPatch::Redraw),
            kind => {
                debug!(%id, kind = kind.name(), "component has no text");
                return;
            }
        };
        if *current == text {
            return;
        }
        *current = text.clone();

        if update_client {
            match patch {
                TextPatch::Text => self.emit(
                    id,
                    Instruction::SetText {
                        target: id,
                        text: text.clone(),
                    },
                ),
                TextPatch::Value => self.emit(
                    id,
                    Instruction::SetValue {
                        target: id,
                        value: text.clone(),
                    },
                ),
                TextPatch::Redraw => self.redraw(id),
            }
        }
        // tab labels are mirrored in the tab selector
        if let Some(owner) = owner {
            self.sync_tab_menu(owner, true);
        }
        self.fire(id, EventKind::ValueChanged, &text);
    }

    pub fn number(&self, id: ComponentId) -> Option<f64> {
        match self.kind(id)? {
            Kind::NumberField(field) => Some(field.value),
            _ => None,
        }
    }

    /// Sets the value of a number field, clamped into its range. Non-finite values are ignored.
    pub fn set_number(&mut self, id: ComponentId, value: f64) {
        if !value.is_finite() {
            debug!(%id, value, "ignoring non-finite number");
            return;
        }
        self.apply_number(id, value, true);
    }

    fn apply_number(&mut self, id: ComponentId, value: f64, update_client: bool) {
        let field = match self.kind_mut(id) {
            Some(Kind::NumberField(field)) => field,
            _ => return,
        };
        let value = field.clamp(value);
        if field.value == value {
            return;
        }
        field.value = value;
        if update_client {
            self.emit(
                id,
                Instruction::SetValue {
                    target: id,
                    value: value.to_string(),
                },
            );
        }
        self.fire(id, EventKind::ValueChanged, &value.to_string());
    }

    pub fn is_checked(&self, id: ComponentId) -> Option<bool> {
        match self.kind(id)? {
            Kind::CheckBox(check_box) => Some(check_box.checked),
            _ => None,
        }
    }

    pub fn set_checked(&mut self, id: ComponentId, checked: bool) {
        self.apply_checked(id, checked, true);
    }

    fn apply_checked(&mut self, id: ComponentId, checked: bool, update_client: bool) {
        match self.kind_mut(id) {
            Some(Kind::CheckBox(check_box)) if check_box.checked != checked => {
                check_box.checked = checked
            }
            _ => return,
        }
        if update_client {
            self.emit(id, Instruction::SetChecked { target: id, checked });
        }
        self.fire(id, EventKind::ValueChanged, &checked.to_string());
    }

    /// Options of a context menu.
    pub fn options(&self, id: ComponentId) -> &[String] {
        match self.kind(id) {
            Some(Kind::ContextMenu(menu)) => &menu.options,
            _ => &[],
        }
    }

    pub fn set_options<I, S>(&mut self, id: ComponentId, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        self.apply_options(id, options, true);
    }

    pub(crate) fn apply_options(&mut self, id: ComponentId, options: Vec<String>, update_client: bool) {
        match self.kind_mut(id) {
            Some(Kind::ContextMenu(menu)) if menu.options != options => menu.options = options,
            _ => return,
        }
        if update_client {
            self.redraw(id);
        }
    }

    /// Reacts to a client payload addressed to a leaf.
    pub(crate) fn receive_leaf(&mut self, id: ComponentId, payload: &str) {
        enum Receiver {
            Text,
            Button,
            Number(f64, f64),
            Check,
            Menu(usize),
        }

        let receiver = match self.kind(id) {
            Some(Kind::Label(_)) | Some(Kind::TextField(_)) => Receiver::Text,
            Some(Kind::Button(_)) => Receiver::Button,
            Some(Kind::NumberField(field)) => Receiver::Number(field.min, field.max),
            Some(Kind::CheckBox(_)) => Receiver::Check,
            Some(Kind::ContextMenu(menu)) => Receiver::Menu(menu.options.len()),
            _ => return,
        };

        match receiver {
            Receiver::Text => self.apply_text(id, payload.to_string(), false),
            Receiver::Button if payload == CLICK => self.fire(id, EventKind::Click, "click"),
            Receiver::Button => self.apply_text(id, payload.to_string(), false),
            Receiver::Number(min, max) => match parse_number(payload) {
                // the client is only told when it shows something other than the stored value
                Ok(value) => self.apply_number(id, value, value < min || value > max),
                Err(err) => debug!(%id, %err, "keeping last valid value"),
            },
            Receiver::Check => match parse_bool(payload) {
                Ok(checked) => self.apply_checked(id, checked, false),
                Err(err) => debug!(%id, %err, "keeping last valid value"),
            },
            Receiver::Menu(len) => match parse_item(payload, len) {
                Ok(index) => self.fire(id, EventKind::Click, &index.to_string()),
                Err(err) => debug!(%id, %err, "ignoring menu payload"),
            },
        }
    }
}

#[test]
fn payload_parsing() {
    assert_eq!(parse_number(" 2.5 ").unwrap(), 2.5);
    assert!(parse_number("abc").is_err());
    assert!(parse_number("NaN").is_err());
    assert!(parse_number("inf").is_err());
    assert!(parse_bool("true").unwrap());
    assert!(!parse_bool("false").unwrap());
    assert!(parse_bool("yes").is_err());
    assert_eq!(parse_item("#item 1", 2).unwrap(), 1);
    assert!(parse_item("#item 2", 2).is_err());
    assert!(parse_item("1", 2).is_err());
}

#[test]
fn number_field_clamps() {
    let mut tree = ComponentTree::new();
    let field = tree.number_field(50.0, 10.0, 0.0, 1.0);
    assert_eq!(tree.number(field), Some(10.0));
    tree.set_number(field, -3.0);
    assert_eq!(tree.number(field), Some(0.0));
    tree.set_number(field, f64::NAN);
    assert_eq!(tree.number(field), Some(0.0));
}

#[test]
fn text_is_escaped_when_rendered() {
    let mut tree = ComponentTree::new();
    let button = tree.button("<b>\"OK\"</b>");
    let markup = tree.render(button);
    assert!(markup.starts_with("<button class=\"perch-button\" type=\"button\" onclick=\""));
    assert!(markup.ends_with(">&lt;b&gt;&quot;OK&quot;&lt;/b&gt;</button>"));
    assert!(markup.contains(&format!("perch.dispatch(&quot;{}&quot;, &quot;#click&quot;)", button)));
}

#[test]
fn value_setters_notify_only_on_change() {
    let mut tree = ComponentTree::new();
    let check_box = tree.check_box("Remember", false);
    let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = std::sync::Arc::clone(&seen);
    tree.on(check_box, EventKind::ValueChanged, move |_, value| {
        log.lock().push(value.to_string())
    });

    tree.set_checked(check_box, true);
    tree.set_checked(check_box, true);
    tree.set_checked(check_box, false);
    assert_eq!(*seen.lock(), vec!["true", "false"]);
    assert_eq!(tree.text(check_box), None);
}
