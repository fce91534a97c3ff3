//! gtk-doc markdown to DocBook.
//!
//! [`blocks`] classifies lines into blocks, this module renders the blocks
//! (recursing into list items, quotes and section bodies) and [`spans`]
//! handles the inline markdown inside paragraphs and titles.

pub mod blocks;
pub mod spans;

use crate::error::{DocError, Result};
use blocks::{Block, BlockKind, BlockScanner};
use html_escape::{encode_double_quoted_attribute, encode_text};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use spans::parse_span_elements;

lazy_static! {
    static ref INLINE_CODE_FENCE: Regex = Regex::new(r"(?s)\|\[(.*?)\]\|").unwrap();
}

/// Entities resolved inside code blocks. `&amp;` comes last so `&amp;lt;`
/// stays `&lt;`.
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&ast;", "*"),
    ("&num;", "#"),
    ("&percnt;", "%"),
    ("&colon;", ":"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

/// Where a block list is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Document,
    ListItem,
    Quote,
    Section,
}

/// Markdown parser with a bounded recursion depth.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    max_depth: usize,
}

impl MarkdownParser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Convert `text` to a DocBook fragment. `symbol` names the documented
    /// entity and is only used for diagnostics.
    pub fn parse(&self, text: &str, symbol: &str) -> Result<String> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = text.split('\n').collect();
        debug!("parsing markdown for '{}' ({} lines)", symbol, lines.len());
        self.parse_lines(&lines, Context::Document, 0)
    }

    fn parse_lines<S: AsRef<str>>(&self, lines: &[S], context: Context, depth: usize) -> Result<String> {
        if depth > self.max_depth {
            return Err(DocError::NestingTooDeep {
                max: self.max_depth,
            });
        }
        if depth > 0 {
            debug!("recursing into {:?} body at depth {}", context, depth);
        }
        let blocks = BlockScanner::scan(lines);
        self.render_blocks(&blocks, context, depth)
    }

    fn render_blocks(&self, blocks: &[Block], context: Context, depth: usize) -> Result<String> {
        let mut output = String::new();

        for block in blocks {
            match &block.kind {
                BlockKind::Paragraph { lines, .. } => {
                    let text = parse_span_elements(&lines.join("\n"));
                    // a blank line before a later paragraph of a list item
                    // keeps it visually separate
                    if context == Context::ListItem && output.is_empty() && block.interrupted {
                        output.push('\n');
                    }
                    output.push_str("<para>");
                    output.push_str(&text);
                    output.push_str("</para>\n");
                }
                BlockKind::Heading {
                    title,
                    id,
                    level,
                    lines,
                } => {
                    let tag = if *level == 1 { "refsect2" } else { "refsect3" };
                    output.push('<');
                    output.push_str(tag);
                    if let Some(id) = id {
                        output.push_str(" id=\"");
                        output.push_str(&encode_double_quoted_attribute(id));
                        output.push('"');
                    }
                    output.push_str("><title>");
                    output.push_str(&parse_span_elements(title));
                    output.push_str("</title>");
                    output.push_str(&self.parse_lines(lines, Context::Section, depth + 1)?);
                    output.push_str("</");
                    output.push_str(tag);
                    output.push_str(">\n");
                }
                BlockKind::ListItem {
                    marker,
                    first,
                    last,
                    lines,
                    ..
                } => {
                    let tag = marker.list_tag();
                    if *first {
                        output.push('<');
                        output.push_str(tag);
                        output.push_str(">\n");
                    }

                    let body = if block.interrupted {
                        let mut lines = lines.clone();
                        lines.push(String::new());
                        self.parse_lines(&lines, Context::ListItem, depth + 1)?
                    } else {
                        self.parse_lines(lines, Context::ListItem, depth + 1)?
                    };
                    output.push_str("<listitem>");
                    output.push_str(&body);
                    output.push_str("</listitem>\n");

                    if *last {
                        output.push_str("</");
                        output.push_str(tag);
                        output.push_str(">\n");
                    }
                }
                BlockKind::Quote { lines } => {
                    output.push_str("<blockquote>\n");
                    output.push_str(&self.parse_lines(lines, Context::Quote, depth + 1)?);
                    output.push_str("</blockquote>\n");
                }
                BlockKind::Code { language, lines } => {
                    let tag = match language.as_deref() {
                        Some("plain") => {
                            output.push_str("<informalexample><screen><![CDATA[\n");
                            "screen"
                        }
                        Some(language) => {
                            output.push_str("<informalexample><programlisting language=\"");
                            output.push_str(&encode_double_quoted_attribute(language));
                            output.push_str("\"><![CDATA[\n");
                            "programlisting"
                        }
                        None => {
                            output.push_str("<informalexample><programlisting><![CDATA[\n");
                            "programlisting"
                        }
                    };
                    for line in lines {
                        output.push_str(&escape_cdata(&replace_entities(line)));
                        output.push('\n');
                    }
                    output.push_str("]]></");
                    output.push_str(tag);
                    output.push_str("></informalexample>\n");
                }
                BlockKind::Markup { text, .. } | BlockKind::SelfClosingTag { text } => {
                    output.push_str(text);
                    output.push('\n');
                }
            }
        }

        Ok(output)
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Convert gtk-doc markdown to DocBook with the default depth cap.
pub fn parse_markdown(text: &str, symbol: &str) -> Result<String> {
    MarkdownParser::default().parse(text, symbol)
}

/// Resolve the fixed set of entities used in gtk-doc code samples.
pub fn replace_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| {
            acc.replace(entity, replacement)
        })
}

/// Turn single-line `|[ ... ]|` fences left in paragraphs into inline
/// `<programlisting>` elements. CDATA sections are left alone.
pub fn convert_inline_code_fences(docbook: &str) -> String {
    if !docbook.contains("|[") {
        return docbook.to_string();
    }

    let mut output = String::with_capacity(docbook.len());
    let mut rest = docbook;
    while let Some(start) = rest.find("<![CDATA[") {
        output.push_str(&replace_inline_fences(&rest[..start]));
        let section = &rest[start..];
        let end = section.find("]]>").map_or(section.len(), |pos| pos + 3);
        output.push_str(&section[..end]);
        rest = &section[end..];
    }
    output.push_str(&replace_inline_fences(rest));
    output
}

fn replace_inline_fences(text: &str) -> String {
    INLINE_CODE_FENCE
        .replace_all(text, |caps: &regex::Captures| {
            format!(
                "<programlisting>{}</programlisting>",
                encode_text(&replace_entities(caps[1].trim()))
            )
        })
        .into_owned()
}

fn escape_cdata(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}
