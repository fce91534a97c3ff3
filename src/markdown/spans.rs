//! Span-level markdown: code spans, links and images.
//!
//! Everything else in a paragraph, including DocBook tags and entities,
//! passes through untouched.

use html_escape::encode_double_quoted_attribute;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `(url "title")` right after the link text.
    static ref INLINE_TARGET: Regex =
        Regex::new(r#"^\([ ]*([^)'"]*?)(?:[ ]+['"](.+?)['"])?[ ]*\)"#).unwrap();
    /// `[reference]` right after the link text.
    static ref REFERENCE_TARGET: Regex = Regex::new(r"^\s*\[([^\]<]*?)\]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Backtick,
    Link,
    Image,
}

impl Marker {
    fn text(self) -> &'static str {
        match self {
            Marker::Backtick => "`",
            Marker::Link => "[",
            Marker::Image => "![",
        }
    }
}

enum Target<'a> {
    Url(&'a str),
    Reference(&'a str),
}

/// Convert span elements in a paragraph to DocBook.
pub fn parse_span_elements(text: &str) -> String {
    parse_spans(text, true)
}

fn parse_spans(text: &str, allow_links: bool) -> String {
    let mut markup = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((pos, marker)) = next_marker(rest, allow_links) {
        markup.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let consumed = match marker {
            Marker::Backtick => code_span(rest).map(|(content, len)| {
                markup.push_str("<literal>");
                markup.push_str(content);
                markup.push_str("</literal>");
                len
            }),
            Marker::Link | Marker::Image => link(rest, marker == Marker::Image).map(|(xml, len)| {
                markup.push_str(&xml);
                len
            }),
        };

        match consumed {
            Some(len) => rest = &rest[len..],
            None => {
                markup.push_str(marker.text());
                rest = &rest[marker.text().len()..];
            }
        }
    }

    markup.push_str(rest);
    markup
}

fn next_marker(text: &str, allow_links: bool) -> Option<(usize, Marker)> {
    let backtick = text.find('`').map(|pos| (pos, Marker::Backtick));
    let bracket = if allow_links {
        text.find('[').map(|pos| {
            if pos > 0 && text.as_bytes()[pos - 1] == b'!' {
                (pos - 1, Marker::Image)
            } else {
                (pos, Marker::Link)
            }
        })
    } else {
        None
    };

    match (backtick, bracket) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// A run of n backticks, text without backticks, and a run of exactly n
/// backticks. Returns the content and the consumed length.
fn code_span(text: &str) -> Option<(&str, usize)> {
    let open = text.bytes().take_while(|&b| b == b'`').count();
    let after = &text[open..];
    let content_len = after.find('`')?;
    if content_len == 0 {
        return None;
    }
    let close = after[content_len..]
        .bytes()
        .take_while(|&b| b == b'`')
        .count();
    if close != open {
        return None;
    }
    Some((&after[..content_len], open + content_len + close))
}

/// `[text](url)`, `[text][ref]` or `![alt](src)` at the start of `text`.
fn link(text: &str, image: bool) -> Option<(String, usize)> {
    let start = if image { 2 } else { 1 };
    let close = text[start..].find(['[', ']'])?;
    if text.as_bytes()[start + close] != b']' {
        return None;
    }
    let label = &text[start..start + close];
    let mut consumed = start + close + 1;
    let remaining = &text[consumed..];

    let target = if let Some(caps) = INLINE_TARGET.captures(remaining) {
        consumed += caps[0].len();
        Target::Url(caps.get(1).map_or("", |m| m.as_str()))
    } else if let Some(caps) = REFERENCE_TARGET.captures(remaining) {
        consumed += caps[0].len();
        Target::Reference(caps.get(1).map_or("", |m| m.as_str()))
    } else {
        return None;
    };

    let xml = match (image, target) {
        (true, Target::Url(src)) => format!(
            "<inlinemediaobject><imageobject><imagedata fileref=\"{}\"></imagedata></imageobject>\
             <textobject><phrase>{}</phrase></textobject></inlinemediaobject>",
            encode_double_quoted_attribute(src),
            label
        ),
        // images need a source
        (true, Target::Reference(_)) => return None,
        (false, Target::Url(url)) => format!(
            "<ulink url=\"{}\">{}</ulink>",
            encode_double_quoted_attribute(url),
            parse_spans(label, false)
        ),
        (false, Target::Reference(reference)) => {
            let reference = if reference.is_empty() { label } else { reference };
            format!(
                "<link linkend=\"{}\">{}</link>",
                encode_double_quoted_attribute(reference),
                parse_spans(label, false)
            )
        }
    };

    Some((xml, consumed))
}
