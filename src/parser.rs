//! Lenient DocBook tree builder.
//!
//! Docstrings are DocBook fragments at best: several top-level nodes, stray
//! end tags, unclosed elements and bare `<` are all common. The parser never
//! fails. Everything is collected under a synthetic root element, unknown
//! end tags are dropped, unclosed elements are closed at the end of input
//! and a `<` that does not start a tag is kept as text.

use html_escape::decode_html_entities;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

/// Name of the synthetic element wrapping a parsed fragment.
pub const ROOT_NAME: &str = "root";

lazy_static! {
    static ref START_TAG: Regex = Regex::new(
        r#"^<([A-Za-z_][\w.:\-]*)((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/?)>"#
    )
    .unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap();
    static ref END_TAG: Regex = Regex::new(r"^</([A-Za-z_][\w.:\-]*)\s*>").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocbookNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<DocbookNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DocbookNode::Text(text) => out.push_str(text),
                DocbookNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Direct child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            DocbookNode::Element(element) => Some(element),
            DocbookNode::Text(_) => None,
        })
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // adjacent text (split CDATA, entities) becomes one node
        if let Some(DocbookNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(DocbookNode::Text(text.to_string()));
        }
    }
}

/// Builds [`Element`] trees from DocBook fragments.
#[derive(Debug, Clone)]
pub struct DocbookParser {
    max_depth: usize,
}

impl Default for DocbookParser {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DocbookParser {
    /// Elements nested deeper than `max_depth` are flattened into their
    /// nearest allowed ancestor.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse `xml` into a synthetic [`ROOT_NAME`] element.
    pub fn parse(&self, xml: &str) -> Element {
        let mut stack = vec![Element::new(ROOT_NAME)];
        let mut rest = xml;

        while !rest.is_empty() {
            let Some(lt) = rest.find('<') else {
                push_decoded(&mut stack, rest);
                break;
            };
            push_decoded(&mut stack, &rest[..lt]);
            rest = &rest[lt..];

            if let Some(after) = rest.strip_prefix("<!--") {
                rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            } else if let Some(after) = rest.strip_prefix("<![CDATA[") {
                match after.find("]]>") {
                    Some(end) => {
                        top(&mut stack).push_text(&after[..end]);
                        rest = &after[end + 3..];
                    }
                    None => {
                        // unterminated, so it is just text
                        top(&mut stack).push_text("<![CDATA[");
                        rest = after;
                    }
                }
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            } else if let Some(caps) = END_TAG.captures(rest) {
                close_element(&mut stack, &caps[1]);
                rest = &rest[caps[0].len()..];
            } else if let Some(caps) = START_TAG.captures(rest) {
                let mut element = Element::new(&caps[1]);
                for attr in ATTRIBUTE.captures_iter(&caps[2]) {
                    let value = attr
                        .get(2)
                        .or_else(|| attr.get(3))
                        .or_else(|| attr.get(4))
                        .map_or("", |m| m.as_str());
                    element
                        .attributes
                        .insert(attr[1].to_string(), decode_html_entities(value).into_owned());
                }

                let self_closing = !caps[3].is_empty();
                if self_closing {
                    top(&mut stack).children.push(DocbookNode::Element(element));
                } else if stack.len() > self.max_depth {
                    debug!("ignoring <{}> nested beyond depth {}", element.name, self.max_depth);
                } else {
                    stack.push(element);
                }
                rest = &rest[caps[0].len()..];
            } else {
                top(&mut stack).push_text("<");
                rest = &rest[1..];
            }
        }

        while stack.len() > 1 {
            pop_into_parent(&mut stack);
        }
        stack.pop().unwrap_or_else(|| Element::new(ROOT_NAME))
    }
}

fn top(stack: &mut [Element]) -> &mut Element {
    // the root is never popped while parsing
    let last = stack.len() - 1;
    &mut stack[last]
}

fn push_decoded(stack: &mut [Element], text: &str) {
    if !text.is_empty() {
        top(stack).push_text(&decode_html_entities(text));
    }
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(element) = stack.pop() {
        top(stack).children.push(DocbookNode::Element(element));
    }
}

/// Close the innermost open element named `name` and everything opened
/// inside it. End tags without an open element are dropped.
fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(index) = stack.iter().rposition(|element| element.name == name) else {
        debug!("dropping stray </{}>", name);
        return;
    };
    if index == 0 {
        return;
    }
    while stack.len() > index {
        pop_into_parent(stack);
    }
}
