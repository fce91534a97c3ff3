//! Docstring conversion pipeline.
//!
//! `docbook_escape` -> markdown -> inline code fences -> DocBook tree ->
//! reStructuredText. A [`Converter`] is cheap to share between threads; all
//! conversions of one namespace build use the same lookup and stats sink.

use crate::config::ConverterConfig;
use crate::error::Result;
use crate::escape::{docbook_escape, indent};
use crate::markdown::{convert_inline_code_fences, MarkdownParser};
use crate::renderer::RestRenderer;
use crate::stats::ReferenceStats;
use crate::symbols::SymbolLookup;
use html_escape::encode_text;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One docstring of a batch together with its context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRequest {
    pub docstring: String,
    /// Dotted type name, e.g. `Gtk.Widget`
    pub current_type: Option<String>,
    /// Dotted function name, e.g. `Gtk.Widget.show`
    pub current_func: Option<String>,
}

impl DocRequest {
    pub fn new(docstring: impl Into<String>) -> Self {
        Self {
            docstring: docstring.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, current_type: impl Into<String>) -> Self {
        self.current_type = Some(current_type.into());
        self
    }

    pub fn with_func(mut self, current_func: impl Into<String>) -> Self {
        self.current_func = Some(current_func.into());
        self
    }
}

/// Converted documentation of one entity, with version metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocInfo {
    pub fullname: String,
    /// Description in reST
    pub desc: String,
    pub version_added: Option<String>,
    pub deprecated: bool,
    pub version_deprecated: Option<String>,
    /// Deprecation note in reST
    pub deprecation_desc: String,
}

impl DocInfo {
    /// The description followed by `versionadded` / `deprecated` directives.
    pub fn to_rest(&self) -> String {
        let mut sections = Vec::new();
        if !self.desc.is_empty() {
            sections.push(self.desc.clone());
        }

        if let Some(version) = &self.version_added {
            sections.push(format!(".. versionadded:: {}", version));
        }

        if self.deprecated {
            let mut directive = match &self.version_deprecated {
                Some(version) => format!(".. deprecated:: {}", version),
                // the directive needs a version
                None => ".. warning:: Deprecated".to_string(),
            };
            if !self.deprecation_desc.is_empty() {
                directive.push_str("\n\n");
                directive.push_str(&indent(&self.deprecation_desc, 4));
            }
            sections.push(directive);
        }

        sections.join("\n\n")
    }
}

pub struct Converter {
    lookup: Arc<dyn SymbolLookup>,
    stats: Arc<ReferenceStats>,
    config: ConverterConfig,
    markdown: MarkdownParser,
}

impl Converter {
    pub fn new(
        lookup: Arc<dyn SymbolLookup>,
        stats: Arc<ReferenceStats>,
        config: ConverterConfig,
    ) -> Self {
        let markdown = MarkdownParser::new(config.max_nesting_depth);
        Self {
            lookup,
            stats,
            config,
            markdown,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<ReferenceStats> {
        &self.stats
    }

    /// Convert a gtk-doc docstring to a DocBook fragment. References are
    /// left untouched.
    pub fn docstring_to_docbook(&self, docstring: &str) -> Result<String> {
        self.docstring_to_docbook_for(docstring, "")
    }

    fn docstring_to_docbook_for(&self, docstring: &str, symbol: &str) -> Result<String> {
        let escaped = docbook_escape(docstring);
        let docbook = self.markdown.parse(&escaped, symbol)?;
        Ok(convert_inline_code_fences(&docbook))
    }

    /// Render a DocBook fragment to reST.
    pub fn docbook_to_rest(
        &self,
        docbook: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> String {
        RestRenderer::new(self.lookup.as_ref(), &self.stats, &self.config).render(
            docbook,
            current_type,
            current_func,
        )
    }

    /// Convert a docstring to reST. Never fails; docstrings that cannot be
    /// parsed as markdown are rendered as a single paragraph.
    pub fn convert(
        &self,
        docstring: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> String {
        let symbol = current_func.or(current_type).unwrap_or("");
        debug!("converting docstring of '{}' ({} bytes)", symbol, docstring.len());

        let docbook = match self.docstring_to_docbook_for(docstring, symbol) {
            Ok(docbook) => docbook,
            Err(err) => {
                warn!("{}: {}, rendering as plain text", symbol, err);
                format!("<para>{}</para>", encode_text(docstring))
            }
        };

        let mut rst = self.docbook_to_rest(&docbook, current_type, current_func);

        if !docstring.ends_with('\n') {
            let trimmed = rst.trim_end_matches('\n').len();
            rst.truncate(trimmed);
        }
        while rst.ends_with("\n\n") {
            rst.pop();
        }
        rst
    }

    /// Convert the docs of `fullname` as supplied by the lookup.
    pub fn doc_info(
        &self,
        fullname: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> Option<DocInfo> {
        let entry = self.lookup.lookup_docs(fullname)?;

        let deprecation_desc = if entry.deprecation_docs.is_empty() {
            String::new()
        } else {
            self.convert(&entry.deprecation_docs, current_type, current_func)
        };

        Some(DocInfo {
            fullname: fullname.to_string(),
            desc: self.convert(&entry.docs, current_type, current_func),
            version_added: entry.version_added.clone(),
            deprecated: entry.deprecated
                || entry.version_deprecated.is_some()
                || !entry.deprecation_docs.is_empty(),
            version_deprecated: entry.version_deprecated.clone(),
            deprecation_desc,
        })
    }

    /// Convert independent docstrings in parallel, keeping their order.
    pub fn convert_batch(&self, requests: &[DocRequest]) -> Vec<String> {
        debug!("converting batch of {} docstrings", requests.len());
        requests
            .par_iter()
            .map(|request| {
                self.convert(
                    &request.docstring,
                    request.current_type.as_deref(),
                    request.current_func.as_deref(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{DocEntry, Repository};
    use pretty_assertions::assert_eq;

    fn converter_with(config: ConverterConfig) -> Converter {
        let mut repo = Repository::new();
        repo.add_symbol("GtkWidget", "Gtk.Widget")
            .add_symbol("GtkWindow", "Gtk.Window")
            .add_instance_param("Gtk.Widget.show", "widget")
            .add_docs(
                "Gtk.Widget.show",
                DocEntry {
                    docs: "Shows @widget.".to_string(),
                    version_added: Some("3.0".to_string()),
                    ..Default::default()
                },
            )
            .add_docs(
                "Gtk.Widget.old",
                DocEntry {
                    docs: "Old.".to_string(),
                    version_deprecated: Some("3.10".to_string()),
                    deprecation_docs: "Use #GtkWindow.".to_string(),
                    ..Default::default()
                },
            );
        Converter::new(Arc::new(repo), Arc::new(ReferenceStats::new()), config)
    }

    fn converter() -> Converter {
        converter_with(ConverterConfig::default())
    }

    #[test]
    fn test_docstring_to_docbook() {
        let docbook = converter()
            .docstring_to_docbook("a <b> #GtkWidget\n\n|[ x ]|")
            .unwrap();
        assert_eq!(
            docbook,
            "<para>a &lt;b&gt; #GtkWidget</para>\n<para><programlisting>x</programlisting></para>\n"
        );
    }

    #[test]
    fn test_convert_trailing_newlines() {
        let converter = converter();
        assert_eq!(converter.convert("a\n\nb", None, None), "a\n\nb");
        assert_eq!(converter.convert("a\n", None, None), "a\n");
    }

    #[test]
    fn test_convert_non_tag_brackets() {
        assert_eq!(
            converter().convert("in <gtk/gtk.h> and a < b", None, None),
            "in <gtk/gtk.h> and a < b"
        );
    }

    #[test]
    fn test_nesting_fallback() {
        let converter = converter_with(ConverterConfig {
            max_nesting_depth: 1,
            ..Default::default()
        });
        let out = converter.convert("> > > #GtkWidget", None, None);
        assert_eq!(out, "> > > :obj:`Gtk.Widget`");
    }

    #[test]
    fn test_doc_info() {
        let converter = converter();
        let info = converter
            .doc_info("Gtk.Widget.show", Some("Gtk.Widget"), Some("Gtk.Widget.show"))
            .unwrap();
        assert_eq!(info.desc, "Shows `self`.");
        assert_eq!(info.to_rest(), "Shows `self`.\n\n.. versionadded:: 3.0");
        assert!(!info.deprecated);

        let old = converter.doc_info("Gtk.Widget.old", None, None).unwrap();
        assert!(old.deprecated);
        assert_eq!(
            old.to_rest(),
            "Old.\n\n.. deprecated:: 3.10\n\n    Use :obj:`Gtk.Window`."
        );

        assert!(converter.doc_info("Gtk.Widget.missing", None, None).is_none());
    }

    #[test]
    fn test_deprecated_without_version() {
        let info = DocInfo {
            desc: "x".to_string(),
            deprecated: true,
            ..Default::default()
        };
        assert_eq!(info.to_rest(), "x\n\n.. warning:: Deprecated");
    }

    #[test]
    fn test_convert_batch_keeps_order() {
        let converter = converter();
        let requests: Vec<DocRequest> = (0..50)
            .map(|i| DocRequest::new(format!("item {} #GtkWidget", i)))
            .chain(std::iter::once(
                DocRequest::new("@widget").with_func("Gtk.Widget.show"),
            ))
            .collect();

        let results = converter.convert_batch(&requests);
        assert_eq!(results.len(), 51);
        assert_eq!(results[7], "item 7 :obj:`Gtk.Widget`");
        assert_eq!(results[50], "`self`");
    }
}
