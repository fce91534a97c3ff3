//! girdoc
//!
//! Converts gtk-doc documentation strings (a mix of markdown, DocBook and
//! gtk-doc reference syntax, as found in GIR files) to cross-referenced
//! reStructuredText.

pub mod config;
pub mod converter;
pub mod error;
pub mod escape;
pub mod markdown;
pub mod parser;
pub mod renderer;
pub mod resolver;
pub mod scanner;
pub mod stats;
pub mod symbols;

pub use config::ConverterConfig;
pub use converter::{Converter, DocInfo, DocRequest};
pub use error::DocError;
pub use escape::{docbook_escape, escape_rest};
pub use markdown::{parse_markdown, MarkdownParser};
pub use parser::{DocbookNode, DocbookParser, Element};
pub use renderer::RestRenderer;
pub use resolver::ReferenceResolver;
pub use scanner::{tokenize, Token, TokenKind};
pub use stats::ReferenceStats;
pub use symbols::{docref_to_target, DocEntry, Repository, SymbolLookup, SymbolTable};
