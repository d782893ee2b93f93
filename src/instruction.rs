//! Client instructions.
//!
//! Every change the server makes to a rendered page is expressed as an [`Instruction`], which is
//! turned into a script for the browser-side `perch` runtime object before it goes out over the
//! session’s [`RemoteChannel`](crate::RemoteChannel).

use crate::id::ComponentId;
use core::fmt;
use core::fmt::Write;

/// Name of the browser-side runtime object.
const RUNTIME: &str = "perch";

/// Toast notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// A single client-side DOM instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Replaces a component’s root node (and its subtree) with new markup.
    Replace { target: ComponentId, markup: String },
    /// Inserts child slot markup into a container so that the first new slot ends up at `index`.
    Insert {
        container: ComponentId,
        index: usize,
        markup: String,
    },
    /// Removes child slots of a container by index. Indices are in descending order so each
    /// removal leaves the remaining indices valid.
    RemoveSlots {
        container: ComponentId,
        indices: Vec<usize>,
    },
    /// Removes a component’s root node.
    Remove { target: ComponentId },
    /// Sets a single style property.
    SetStyle {
        target: ComponentId,
        key: String,
        value: String,
    },
    /// Adds or removes a class.
    SetClass {
        target: ComponentId,
        class: &'static str,
        enabled: bool,
    },
    SetAttribute {
        target: ComponentId,
        name: &'static str,
        value: String,
    },
    SetText { target: ComponentId, text: String },
    /// Sets the value of an input.
    SetValue { target: ComponentId, value: String },
    SetChecked { target: ComponentId, checked: bool },
    /// Appends markup to the overlay layer of the page.
    AppendOverlay { markup: String },
    OpenDialog { target: ComponentId, modal: bool },
    CloseDialog { target: ComponentId },
    /// Shows a toast notification.
    Notify {
        level: Level,
        title: String,
        message: String,
    },
    /// Sets the document title.
    SetTitle { title: String },
    /// Asks the client to acknowledge liveness by dispatching an event to `target`.
    Ping { target: String },
}

impl Instruction {
    /// Renders the instruction as a client script.
    pub fn to_script(&self) -> String {
        let id = |id: &ComponentId| js_string(&id.to_string());

        match self {
            Instruction::Replace { target, markup } => {
                call("replace", &[id(target), js_string(markup)])
            }
            Instruction::Insert {
                container,
                index,
                markup,
            } => call(
                "insert",
                &[id(container), index.to_string(), js_string(markup)],
            ),
            Instruction::RemoveSlots { container, indices } => {
                let list: Vec<_> = indices.iter().map(|i| i.to_string()).collect();
                call(
                    "removeSlots",
                    &[id(container), format!("[{}]", list.join(", "))],
                )
            }
            Instruction::Remove { target } => call("remove", &[id(target)]),
            Instruction::SetStyle { target, key, value } => {
                call("style", &[id(target), js_string(key), js_string(value)])
            }
            Instruction::SetClass {
                target,
                class,
                enabled,
            } => call(
                "toggleClass",
                &[id(target), js_string(class), enabled.to_string()],
            ),
            Instruction::SetAttribute {
                target,
                name,
                value,
            } => call("attr", &[id(target), js_string(name), js_string(value)]),
            Instruction::SetText { target, text } => call("text", &[id(target), js_string(text)]),
            Instruction::SetValue { target, value } => {
                call("value", &[id(target), js_string(value)])
            }
            Instruction::SetChecked { target, checked } => {
                call("checked", &[id(target), checked.to_string()])
            }
            Instruction::AppendOverlay { markup } => call("overlay", &[js_string(markup)]),
            Instruction::OpenDialog { target, modal } => {
                call("openDialog", &[id(target), modal.to_string()])
            }
            Instruction::CloseDialog { target } => call("closeDialog", &[id(target)]),
            Instruction::Notify {
                level,
                title,
                message,
            } => call(
                "notify",
                &[js_string(level.name()), js_string(title), js_string(message)],
            ),
            Instruction::SetTitle { title } => call("title", &[js_string(title)]),
            Instruction::Ping { target } => call("ping", &[js_string(target)]),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_script())
    }
}

fn call(method: &str, args: &[String]) -> String {
    format!("{}.{}({});", RUNTIME, method, args.join(", "))
}

/// Script that dispatches a constant payload back to a component.
pub(crate) fn dispatch_literal(target: ComponentId, payload: &str) -> String {
    dispatch_expr(target, &js_string(payload))
}

/// Script that dispatches the value of a client-side expression back to a component.
pub(crate) fn dispatch_expr(target: ComponentId, expr: &str) -> String {
    format!(
        "{}.dispatch({}, {})",
        RUNTIME,
        js_string(&target.to_string()),
        expr
    )
}

/// Quotes a string as a JavaScript string literal.
///
/// `<` is always escaped so that the literal can never close an enclosing script element.
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\u003c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[test]
fn js_string_escapes() {
    assert_eq!(js_string("plain"), "\"plain\"");
    assert_eq!(js_string("a\"b\\c"), r#""a\"b\\c""#);
    assert_eq!(js_string("line\nbreak\t"), r#""line\nbreak\t""#);
    assert_eq!(js_string("</script>"), r#""\u003c/script>""#);
    assert_eq!(js_string("\u{1}\u{2028}"), r#""\u0001\u2028""#);
}

#[test]
fn scripts() {
    let id = ComponentId::new();
    let quoted = format!("\"{}\"", id);

    assert_eq!(
        Instruction::Insert {
            container: id,
            index: 2,
            markup: "<p>x</p>".into()
        }
        .to_script(),
        format!("perch.insert({}, 2, \"\\u003cp>x\\u003c/p>\");", quoted)
    );
    assert_eq!(
        Instruction::RemoveSlots {
            container: id,
            indices: vec![3, 1]
        }
        .to_script(),
        format!("perch.removeSlots({}, [3, 1]);", quoted)
    );
    assert_eq!(
        Instruction::SetClass {
            target: id,
            class: "perch-disabled",
            enabled: true
        }
        .to_string(),
        format!("perch.toggleClass({}, \"perch-disabled\", true);", quoted)
    );
    assert_eq!(
        Instruction::Notify {
            level: Level::Warning,
            title: "Disk".into(),
            message: "almost \"full\"".into()
        }
        .to_script(),
        r#"perch.notify("warning", "Disk", "almost \"full\"");"#
    );
}

#[test]
fn dispatch_scripts() {
    let id = ComponentId::new();
    assert_eq!(
        dispatch_literal(id, "#click"),
        format!("perch.dispatch(\"{}\", \"#click\")", id)
    );
    assert_eq!(
        dispatch_expr(id, "this.value"),
        format!("perch.dispatch(\"{}\", this.value)", id)
    );
}
