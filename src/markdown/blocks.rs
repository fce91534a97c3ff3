//! Line classifier grouping gtk-doc markdown lines into blocks.
//!
//! The scanner keeps one open block and a list of finished ones. Each line
//! either extends the open block or closes it and opens a new one; the kind
//! of the open block decides which rules apply first.

use lazy_static::lazy_static;
use regex::Regex;

/// Inline DocBook elements. A paragraph that opens one of these and closes
/// it on a later line keeps collecting lines instead of starting a markup
/// block.
pub const TEXT_LEVEL_ELEMENTS: &[&str] = &[
    "literal",
    "emphasis",
    "envar",
    "filename",
    "firstterm",
    "footnote",
    "function",
    "manvolnum",
    "option",
    "replaceable",
    "structfield",
    "structname",
    "title",
    "varname",
];

lazy_static! {
    static ref ATX_HEADING: Regex =
        Regex::new(r"^(#{1,2})[ \t]+(.+?)[ \t]*#*[ \t]*(?:\{#([^}]+)\})?[ \t]*$").unwrap();
    static ref SETEXT_LEVEL_1: Regex = Regex::new(r"^={4,}[ \t]*$").unwrap();
    static ref SETEXT_LEVEL_2: Regex = Regex::new(r"^-{4,}[ \t]*$").unwrap();
    static ref CODE_START: Regex =
        Regex::new(r#"^[ \t]*\|\[[ ]*(?:<!-- language="([^"]+?)" -->)?"#).unwrap();
    static ref CODE_END: Regex = Regex::new(r"^[ \t]*\]\|(.*)$").unwrap();
    static ref DOCTYPE: Regex = Regex::new(r"^[ ]*<!DOCTYPE").unwrap();
    static ref MARKUP_START: Regex = Regex::new(r"^[ ]*<\??(\w+)([^>]*)>").unwrap();
    static ref BULLET_ITEM: Regex = Regex::new(r"^([ ]*)[*+-][ ](.*)$").unwrap();
    static ref ORDERED_ITEM: Regex = Regex::new(r"^([ ]{0,4})\d+[.][ ]+(.*)$").unwrap();
    static ref BULLET_CONTINUATION: Regex = Regex::new(r"^([ ]{0,3})([*+-])[ ](.*)$").unwrap();
    static ref ORDERED_CONTINUATION: Regex = Regex::new(r"^([ ]{0,3})(\d+[.])[ ](.*)$").unwrap();
    static ref QUOTE: Regex = Regex::new(r"^[ ]*>[ ]?(.*)$").unwrap();
    static ref QUOTE_PREFIX: Regex = Regex::new(r"^[ ]*>[ ]?").unwrap();
    static ref LIST_INDENT: Regex = Regex::new(r"^[ ]{0,4}").unwrap();
}

/// Whether `tag` is one of [`TEXT_LEVEL_ELEMENTS`].
pub fn is_text_level_element(tag: &str) -> bool {
    TEXT_LEVEL_ELEMENTS.contains(&tag)
}

/// Marker style of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    /// `*`, `+` or `-`
    Bullet,
    /// `1.`, `2.`, ...
    Ordered,
}

impl ListMarker {
    /// DocBook element wrapping items with this marker.
    pub fn list_tag(self) -> &'static str {
        match self {
            ListMarker::Bullet => "itemizedlist",
            ListMarker::Ordered => "orderedlist",
        }
    }

    fn continuation(self) -> &'static Regex {
        match self {
            ListMarker::Bullet => &BULLET_CONTINUATION,
            ListMarker::Ordered => &ORDERED_CONTINUATION,
        }
    }
}

/// The kinds of block the scanner produces, each with its own payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph {
        lines: Vec<String>,
        /// Text-level element opened in this paragraph and not closed yet.
        open_inline_tag: Option<String>,
    },
    Heading {
        title: String,
        id: Option<String>,
        level: u8,
        /// Section body, parsed recursively.
        lines: Vec<String>,
    },
    ListItem {
        marker: ListMarker,
        indentation: String,
        first: bool,
        last: bool,
        lines: Vec<String>,
    },
    Quote {
        lines: Vec<String>,
    },
    Code {
        language: Option<String>,
        lines: Vec<String>,
    },
    /// Raw DocBook passed through verbatim. `tag` is `None` for `<!DOCTYPE`.
    Markup {
        tag: Option<String>,
        text: String,
        closed: bool,
        depth: usize,
    },
    SelfClosingTag {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// A blank line followed the block's last line.
    pub interrupted: bool,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            interrupted: false,
        }
    }

    fn paragraph(line: &str, open_inline_tag: Option<String>) -> Self {
        Self::new(BlockKind::Paragraph {
            lines: vec![line.to_string()],
            open_inline_tag,
        })
    }
}

/// Groups lines into [`Block`]s.
#[derive(Debug, Default)]
pub struct BlockScanner {
    blocks: Vec<Block>,
    current: Option<Block>,
}

impl BlockScanner {
    /// Classify `lines` and return the finished blocks in order.
    pub fn scan<S: AsRef<str>>(lines: &[S]) -> Vec<Block> {
        let mut scanner = BlockScanner::default();
        for line in lines {
            scanner.feed(line.as_ref());
        }
        scanner.finish()
    }

    fn finish(mut self) -> Vec<Block> {
        if let Some(Block {
            kind: BlockKind::Markup { closed: false, .. },
            ..
        }) = &self.current
        {
            log::warn!("unterminated markup block flushed at end of input");
        }
        self.push_current();
        self.blocks
    }

    fn push_current(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }

    fn open(&mut self, kind: BlockKind) {
        self.push_current();
        self.current = Some(Block::new(kind));
    }

    fn feed(&mut self, line: &str) {
        if self.feed_open_markup(line) {
            return;
        }

        if matches!(
            self.current,
            Some(Block {
                kind: BlockKind::Heading { .. },
                ..
            })
        ) {
            self.feed_heading(line);
            return;
        }

        if matches!(
            self.current,
            Some(Block {
                kind: BlockKind::Code { .. },
                ..
            })
        ) {
            self.feed_code(line);
            return;
        }

        let deindented = line.trim_start();
        if deindented.is_empty() {
            if let Some(block) = &mut self.current {
                block.interrupted = true;
            }
            return;
        }

        if self.feed_continuation(line) {
            return;
        }

        // indentation sensitive types
        if let Some(caps) = ATX_HEADING.captures(line) {
            self.open(BlockKind::Heading {
                title: caps[2].to_string(),
                id: caps.get(3).map(|m| m.as_str().to_string()),
                level: caps[1].len() as u8,
                lines: Vec::new(),
            });
            return;
        }
        if SETEXT_LEVEL_1.is_match(line) {
            self.setext_heading(1);
            return;
        }
        if SETEXT_LEVEL_2.is_match(line) {
            self.setext_heading(2);
            return;
        }
        if let Some(caps) = CODE_START.captures(line) {
            let rest = &line[caps.get(0).map_or(0, |m| m.end())..];
            // `|[ ... ]|` on one line is an inline fence and stays in the text
            if !rest.contains("]|") {
                if let Some(block) = &mut self.current {
                    block.interrupted = true;
                }
                let first_line = rest.trim_start();
                let lines = if first_line.is_empty() {
                    Vec::new()
                } else {
                    vec![first_line.to_string()]
                };
                self.open(BlockKind::Code {
                    language: caps.get(1).map(|m| m.as_str().to_string()),
                    lines,
                });
                return;
            }
        }

        // indentation insensitive types
        let mut opened_inline_tag = None;
        if DOCTYPE.is_match(line) {
            self.open(BlockKind::Markup {
                tag: None,
                text: deindented.to_string(),
                closed: deindented.contains('>'),
                depth: 0,
            });
            return;
        } else if let Some(caps) = MARKUP_START.captures(line) {
            let tag = &caps[1];
            let attributes = caps[2].trim_end();
            let self_closing = attributes.ends_with('/') || attributes.ends_with('?');

            // autolinks like <http://...> are text
            if !tag.starts_with("http") {
                let scanning = self.scanning_inline_tag();
                let text_level = is_text_level_element(tag);
                let end_tag = format!("</{}>", tag);

                if !text_level && !scanning {
                    if self_closing {
                        self.open(BlockKind::SelfClosingTag {
                            text: deindented.to_string(),
                        });
                    } else {
                        self.open(BlockKind::Markup {
                            tag: Some(tag.to_string()),
                            text: deindented.to_string(),
                            closed: deindented.contains(&end_tag),
                            depth: 0,
                        });
                    }
                    return;
                }

                if text_level && !scanning && !deindented.contains(&end_tag) {
                    opened_inline_tag = Some(tag.to_string());
                }
            }
        } else if let Some(caps) = BULLET_ITEM.captures(line) {
            self.open(BlockKind::ListItem {
                marker: ListMarker::Bullet,
                indentation: caps[1].to_string(),
                first: true,
                last: true,
                lines: vec![strip_list_indent(&caps[2])],
            });
            return;
        } else if let Some(caps) = QUOTE.captures(line) {
            self.open(BlockKind::Quote {
                lines: vec![caps[1].to_string()],
            });
            return;
        }

        if let Some(caps) = ORDERED_ITEM.captures(line) {
            self.open(BlockKind::ListItem {
                marker: ListMarker::Ordered,
                indentation: caps[1].to_string(),
                first: true,
                last: true,
                lines: vec![strip_list_indent(&caps[2])],
            });
            return;
        }

        self.add_paragraph_line(line, opened_inline_tag);
    }

    /// Extend an unclosed markup block. Returns whether the line was consumed.
    fn feed_open_markup(&mut self, line: &str) -> bool {
        let Some(Block {
            kind:
                BlockKind::Markup {
                    tag,
                    text,
                    closed,
                    depth,
                },
            ..
        }) = &mut self.current
        else {
            return false;
        };
        if *closed {
            return false;
        }

        let (opens, closes) = match tag {
            Some(tag) => (
                opens_tag(line, tag),
                line.contains(&format!("</{}>", tag)),
            ),
            None => (line.contains('<'), line.contains('>')),
        };
        if opens {
            *depth += 1;
        }
        if closes {
            if *depth > 0 {
                *depth -= 1;
            } else {
                *closed = true;
            }
        }

        text.push('\n');
        text.push_str(line);
        true
    }

    /// Everything up to the next heading of the same or a higher level is
    /// section body.
    fn feed_heading(&mut self, line: &str) {
        let level = match &self.current {
            Some(Block {
                kind: BlockKind::Heading { level, .. },
                ..
            }) => *level,
            _ => return,
        };

        if SETEXT_LEVEL_1.is_match(line) {
            self.heading_from_last_line(1, line);
        } else if level >= 2 && SETEXT_LEVEL_2.is_match(line) {
            self.heading_from_last_line(2, line);
        } else if let Some(caps) = ATX_HEADING
            .captures(line)
            .filter(|caps| level >= 2 || caps[1].len() == 1)
        {
            self.open(BlockKind::Heading {
                title: caps[2].to_string(),
                id: caps.get(3).map(|m| m.as_str().to_string()),
                level: caps[1].len() as u8,
                lines: Vec::new(),
            });
        } else if let Some(Block {
            kind: BlockKind::Heading { lines, .. },
            ..
        }) = &mut self.current
        {
            lines.push(line.to_string());
        }
    }

    /// A setext underline inside a section turns the section's last body
    /// line into the title of a new section.
    fn heading_from_last_line(&mut self, level: u8, underline: &str) {
        let Some(Block {
            kind: BlockKind::Heading { lines, .. },
            ..
        }) = &mut self.current
        else {
            return;
        };

        match lines.pop() {
            Some(title) if !title.trim().is_empty() => {
                self.open(BlockKind::Heading {
                    title: title.trim().to_string(),
                    id: None,
                    level,
                    lines: Vec::new(),
                });
            }
            popped => {
                lines.extend(popped);
                lines.push(underline.to_string());
            }
        }
    }

    fn feed_code(&mut self, line: &str) {
        if let Some(caps) = CODE_END.captures(line) {
            let rest = caps[1].to_string();
            self.push_current();
            if !rest.trim().is_empty() {
                self.current = Some(Block::paragraph(rest.trim_start(), None));
            }
        } else if let Some(Block {
            kind: BlockKind::Code { lines, .. },
            ..
        }) = &mut self.current
        {
            lines.push(line.to_string());
        }
    }

    /// Quote and list item continuation lines. Returns whether the line was
    /// consumed.
    fn feed_continuation(&mut self, line: &str) -> bool {
        let Some(block) = &mut self.current else {
            return false;
        };

        match &mut block.kind {
            BlockKind::Quote { lines } => {
                if block.interrupted {
                    return false;
                }
                lines.push(QUOTE_PREFIX.replace(line, "").into_owned());
                true
            }
            BlockKind::ListItem {
                marker,
                indentation,
                lines,
                ..
            } => {
                let marker = *marker;
                if let Some(caps) = marker.continuation().captures(line) {
                    if caps[1] != **indentation {
                        lines.push(line.to_string());
                    } else {
                        let indentation = indentation.clone();
                        let first_line = strip_list_indent(&caps[3]);
                        if let BlockKind::ListItem { last, .. } = &mut block.kind {
                            *last = false;
                        }
                        self.open(BlockKind::ListItem {
                            marker,
                            indentation,
                            first: false,
                            last: true,
                            lines: vec![first_line],
                        });
                    }
                    return true;
                }

                if block.interrupted {
                    // an indented line after a blank line continues the item
                    if line.starts_with(' ') {
                        lines.push(String::new());
                        lines.push(strip_list_indent(line));
                        block.interrupted = false;
                        return true;
                    }
                    false
                } else {
                    lines.push(strip_list_indent(line));
                    true
                }
            }
            _ => false,
        }
    }

    fn setext_heading(&mut self, level: u8) {
        let Some(Block {
            kind: BlockKind::Paragraph { lines, .. },
            interrupted: false,
        }) = &mut self.current
        else {
            // an underline without a paragraph right above it is dropped
            return;
        };

        let title = lines.pop().unwrap_or_default();
        if lines.is_empty() {
            self.current = None;
        }
        self.open(BlockKind::Heading {
            title: title.trim().to_string(),
            id: None,
            level,
            lines: Vec::new(),
        });
    }

    fn scanning_inline_tag(&self) -> bool {
        matches!(
            &self.current,
            Some(Block {
                kind: BlockKind::Paragraph {
                    open_inline_tag: Some(_),
                    ..
                },
                ..
            })
        )
    }

    fn add_paragraph_line(&mut self, line: &str, opened_inline_tag: Option<String>) {
        if let Some(Block {
            kind:
                BlockKind::Paragraph {
                    lines,
                    open_inline_tag,
                },
            interrupted: false,
        }) = &mut self.current
        {
            lines.push(line.to_string());
            match open_inline_tag {
                Some(tag) => {
                    if line.contains(&format!("</{}>", tag)) {
                        *open_inline_tag = None;
                    }
                }
                None => *open_inline_tag = opened_inline_tag,
            }
            return;
        }

        self.push_current();
        self.current = Some(Block::paragraph(line, opened_inline_tag));
    }
}

/// Whether `line` contains an opening `<tag>` / `<tag ...>` for `tag`.
fn opens_tag(line: &str, tag: &str) -> bool {
    let needle = format!("<{}", tag);
    line.match_indices(&needle).any(|(idx, _)| {
        matches!(
            line[idx + needle.len()..].chars().next(),
            Some('>') | Some('/') | Some(' ') | Some('\t')
        )
    })
}

fn strip_list_indent(text: &str) -> String {
    LIST_INDENT.replace(text, "").into_owned()
}
