//! Structured markup.
//!
//! Components never concatenate markup by hand: they build an [`Element`] tree, and every text
//! and attribute value passes through [`escape`] exactly once when the tree is serialized.

use core::fmt::Write;

/// Elements that have no closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

/// A markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(this: Element) -> Self {
        Node::Element(this)
    }
}

impl From<String> for Node {
    fn from(this: String) -> Self {
        Node::Text(this)
    }
}

impl From<&str> for Node {
    fn from(this: &str) -> Self {
        Node::Text(this.to_string())
    }
}

/// A markup element with attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Element {
        Element {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute, replacing any previous value of the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name, value)),
        }
        self
    }

    /// Sets an attribute only if `cond` holds.
    pub fn attr_if(self, cond: bool, name: impl Into<String>, value: impl Into<String>) -> Self {
        if cond {
            self.attr(name, value)
        } else {
            self
        }
    }

    /// Adds a class; duplicates are ignored.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Serializes the element into `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&self.tag) {
            return;
        }

        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(out),
                Node::Text(text) => out.push_str(&escape(text)),
            }
        }

        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// Escapes text for use in markup content and double- or single-quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[test]
fn escape_covers_markup_metacharacters() {
    assert_eq!(escape("plain text"), "plain text");
    assert_eq!(
        escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
    );
    // already-escaped input is escaped again, never passed through
    assert_eq!(escape("&amp;"), "&amp;amp;");
    assert_eq!(escape("ünïcødé"), "ünïcødé");
}

#[test]
fn element_serialization() {
    let element = Element::new("div")
        .attr("id", "w1")
        .class("a")
        .class("b")
        .class("a")
        .attr("title", "say \"hi\"")
        .child(Element::new("span").text("1 < 2"))
        .child(Element::new("input").attr("value", "x").text("ignored"))
        .text("tail");

    assert_eq!(
        element.to_markup(),
        "<div class=\"a b\" id=\"w1\" title=\"say &quot;hi&quot;\">\
         <span>1 &lt; 2</span><input value=\"x\">tail</div>"
    );
}

#[test]
fn attr_replaces_previous_value() {
    let element = Element::new("p")
        .attr("style", "a")
        .attr("style", "b")
        .attr_if(false, "hidden", "");
    assert_eq!(element.get_attr("style"), Some("b"));
    assert_eq!(element.get_attr("hidden"), None);
    assert_eq!(element.to_markup(), "<p style=\"b\"></p>");
}
