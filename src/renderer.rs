//! DocBook to reStructuredText.
//!
//! The renderer walks the tree built by [`DocbookParser`], producing a list
//! of output chunks. Text nodes go through the [`ReferenceResolver`]; block
//! elements get their own layout. Chunks are joined at the end, applying the
//! same spacing rules around inline markup as the resolver does inside a
//! single text node.

use crate::config::ConverterConfig;
use crate::escape::{escape_rest, force_unindent, indent, is_rest_special, unindent};
use crate::parser::{DocbookNode, DocbookParser, Element};
use crate::resolver::{needs_separator, ReferenceResolver, Resolved};
use crate::stats::ReferenceStats;
use crate::symbols::{docref_to_target, SymbolLookup};
use log::warn;

/// The documented entity a fragment belongs to.
#[derive(Debug, Clone, Copy, Default)]
struct Scope<'s> {
    current_type: Option<&'s str>,
    current_func: Option<&'s str>,
}

/// One piece of output and whether its ends are inline markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Chunk {
    text: String,
    leading_markup: bool,
    trailing_markup: bool,
}

impl Chunk {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn markup(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            leading_markup: true,
            trailing_markup: true,
        }
    }
}

impl From<Resolved> for Chunk {
    fn from(resolved: Resolved) -> Self {
        Self {
            text: resolved.text,
            leading_markup: resolved.leading_markup,
            trailing_markup: resolved.trailing_markup,
        }
    }
}

pub struct RestRenderer<'a> {
    resolver: ReferenceResolver<'a>,
    lookup: &'a dyn SymbolLookup,
    stats: &'a ReferenceStats,
    config: &'a ConverterConfig,
    parser: DocbookParser,
}

impl<'a> RestRenderer<'a> {
    pub fn new(
        lookup: &'a dyn SymbolLookup,
        stats: &'a ReferenceStats,
        config: &'a ConverterConfig,
    ) -> Self {
        Self {
            resolver: ReferenceResolver::new(lookup, stats, config),
            lookup,
            stats,
            config,
            parser: DocbookParser::default(),
        }
    }

    /// Render a DocBook fragment.
    pub fn render(
        &self,
        docbook: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> String {
        let root = self.parser.parse(docbook);
        let scope = Scope {
            current_type,
            current_func,
        };

        let mut out = Vec::new();
        for node in &root.children {
            self.render_node(node, scope, &mut out);
        }
        join_chunks(out)
    }

    fn resolve(&self, text: &str, scope: Scope<'_>) -> String {
        self.resolver
            .resolve(text, scope.current_type, scope.current_func)
    }

    fn render_node(&self, node: &DocbookNode, scope: Scope<'_>, out: &mut Vec<Chunk>) {
        match node {
            DocbookNode::Text(text) => {
                // text continuing a line keeps its first line's indentation
                let continues_line = out.last().is_some_and(|last| !last.text.ends_with('\n'));
                let text = force_unindent(text, continues_line);
                out.push(
                    self.resolver
                        .resolve_spans(&text, scope.current_type, scope.current_func)
                        .into(),
                );
            }
            DocbookNode::Element(element) => self.render_element(element, scope, out),
        }
    }

    fn render_children(&self, element: &Element, scope: Scope<'_>, out: &mut Vec<Chunk>) {
        for child in &element.children {
            self.render_node(child, scope, out);
        }
    }

    fn render_element(&self, element: &Element, scope: Scope<'_>, out: &mut Vec<Chunk>) {
        match element.name.as_str() {
            "literal" | "type" => out.push(inline_literal(&element.text())),
            "itemizedlist" => out.push(Chunk::plain(self.render_list(element, "* ", scope))),
            "orderedlist" => out.push(Chunk::plain(self.render_list(element, "#. ", scope))),
            "ulink" => out.push(Chunk::markup(format!(
                "`{} <{}>`__",
                escape_rest(&element.text()),
                element.attribute("url").unwrap_or("")
            ))),
            "link" => out.push(self.render_link(element)),
            "programlisting" | "screen" => out.push(self.render_code(element)),
            "para" => {
                // every paragraph starts after a blank line
                if let Some(newlines) = trailing_newlines(out) {
                    if newlines < 2 {
                        out.push(Chunk::plain("\n".repeat(2 - newlines)));
                    }
                }
                self.render_children(element, scope, out);
                out.push(Chunk::plain("\n"));
            }
            "title" => {
                // a definition list with an empty body looks like a heading
                // and, unlike a real section title, is allowed anywhere
                let resolved = self.resolve(&element.text(), scope);
                let title = resolved.lines().collect::<Vec<_>>().join(" ");
                out.push(Chunk::plain(format!("\n{}\n    ..\n        .\n\n", title)));
            }
            "keycombo" => {
                let keys: Vec<String> = element
                    .child_elements()
                    .map(|key| self.resolve(&key.text(), scope))
                    .collect();
                out.push(Chunk::plain(keys.join(" + ")));
            }
            "varlistentry" => self.render_varlistentry(element, scope, out),
            _ => self.render_children(element, scope, out),
        }
    }

    fn render_list(&self, list: &Element, marker: &str, scope: Scope<'_>) -> String {
        let continuation = " ".repeat(marker.len());
        let mut items = Vec::new();

        for item in list.child_elements() {
            let mut item_out = Vec::new();
            self.render_element(item, scope, &mut item_out);
            let item_text = join_chunks(item_out);

            let mut lines: Vec<String> = Vec::new();
            for (i, line) in item_text.trim().lines().enumerate() {
                if line.trim().is_empty() {
                    if lines.last().is_some_and(|last| !last.is_empty()) {
                        lines.push(String::new());
                    }
                } else if i == 0 {
                    lines.push(format!("{}{}", marker, line));
                } else {
                    lines.push(format!("{}{}", continuation, line));
                }
            }
            items.push(lines.join("\n"));
        }

        format!("\n{}\n", items.join("\n"))
    }

    fn render_link(&self, link: &Element) -> Chunk {
        let text = link.text();
        let linkend = link.attribute("linkend").unwrap_or("");
        if linkend.is_empty() {
            return Chunk::plain(escape_rest(&text));
        }

        if let Some(target) = docref_to_target(self.lookup, linkend) {
            return Chunk::markup(format!(":obj:`{}`", target));
        }
        if let Some(url) = self.lookup.lookup_gtkdoc_url(linkend) {
            return Chunk::markup(format!("`{} <{}>`__", escape_rest(&text), url));
        }

        self.stats.record_missed_link(linkend);
        Chunk::plain(format!("'{} [{}]'", escape_rest(&text), escape_rest(linkend)))
    }

    fn render_code(&self, listing: &Element) -> Chunk {
        let text = listing.text();
        if !text.contains('\n') {
            return inline_literal(&text);
        }

        // a listing starting on the line of its tag keeps that line as is
        let starts_on_tag_line = !text
            .split('\n')
            .next()
            .is_some_and(|first| first.trim().is_empty());
        let code = trim_blank_lines(&text);
        if code.is_empty() {
            return Chunk::default();
        }

        let language = listing
            .attribute("language")
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.config.default_code_language.clone());
        Chunk::plain(format!(
            "\n.. code-block:: {}\n\n{}\n",
            language,
            indent(&unindent(code, starts_on_tag_line), 4)
        ))
    }

    fn render_varlistentry(&self, entry: &Element, scope: Scope<'_>, out: &mut Vec<Chunk>) {
        let mut terms = Vec::new();
        let mut body = String::new();

        for child in entry.child_elements() {
            match child.name.as_str() {
                "term" => terms.push(self.resolve(&child.text(), scope)),
                "listitem" => body = child.text(),
                other => warn!("ignoring <{}> inside <varlistentry>", other),
            }
        }
        if terms.is_empty() {
            warn!("<varlistentry> without <term>");
        }

        let body = force_unindent(&body, true);
        out.push(Chunk::plain("\n"));
        out.push(Chunk::plain(format!("{}\n", terms.join(", "))));
        out.push(Chunk::plain(format!("{}\n", indent(&self.resolve(&body, scope), 4))));
    }
}

fn inline_literal(text: &str) -> Chunk {
    let text = text.trim();
    if text.is_empty() {
        Chunk::default()
    } else {
        Chunk::markup(format!("``{}``", text))
    }
}

/// Newlines ending the output so far, ignoring other whitespace. `None`
/// while nothing visible has been rendered.
fn trailing_newlines(out: &[Chunk]) -> Option<usize> {
    let mut newlines = 0;
    for chunk in out.iter().rev() {
        for c in chunk.text.chars().rev() {
            if c == '\n' {
                newlines += 1;
            } else if !c.is_whitespace() {
                return Some(newlines);
            }
        }
    }
    None
}

/// Drop leading and trailing blank lines, keeping indentation.
fn trim_blank_lines(text: &str) -> &str {
    let start = text
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .filter(|(_, c)| *c == '\n')
        .last()
        .map_or(0, |(i, _)| i + 1);
    text[start..].trim_end()
}

/// Concatenate chunks. Inline markup is kept apart from neighbouring words,
/// and two markup-special characters never touch across a boundary.
fn join_chunks(chunks: Vec<Chunk>) -> String {
    let mut rst = String::new();
    let mut after_markup = false;
    for chunk in chunks {
        let Some(first) = chunk.text.chars().next() else {
            continue;
        };
        if let Some(last) = rst.chars().last() {
            if needs_separator(last, after_markup, first, chunk.leading_markup)
                || (is_rest_special(last) && is_rest_special(first))
            {
                rst.push(' ');
            }
        }
        rst.push_str(&chunk.text);
        after_markup = chunk.trailing_markup;
    }
    rst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Repository;
    use pretty_assertions::assert_eq;

    fn repo() -> Repository {
        let mut repo = Repository::new();
        repo.add_symbol("GtkWidget", "Gtk.Widget")
            .add_symbol("gtk_widget_show", "Gtk.Widget.show")
            .add_doc_reference("gtk-migrating", "https://example.org/migrating.html");
        repo
    }

    fn render_with(docbook: &str) -> (String, ReferenceStats) {
        let repo = repo();
        let stats = ReferenceStats::new();
        let config = ConverterConfig::default();
        let out = RestRenderer::new(&repo, &stats, &config).render(docbook, None, None);
        (out, stats)
    }

    fn render(docbook: &str) -> String {
        render_with(docbook).0
    }

    #[test]
    fn test_para_and_text() {
        assert_eq!(render("<para>a #GtkWidget</para>"), "a :obj:`Gtk.Widget`\n");
    }

    #[test]
    fn test_literal() {
        assert_eq!(render("<para>use <literal>foo_bar</literal></para>"), "use ``foo_bar``\n");
        assert_eq!(render("<literal></literal>"), "");
    }

    #[test]
    fn test_itemizedlist() {
        assert_eq!(
            render(
                "<itemizedlist><listitem><para>a\nb</para></listitem>\
                 <listitem><para>c</para></listitem></itemizedlist>"
            ),
            "\n* a\n  b\n* c\n"
        );
    }

    #[test]
    fn test_orderedlist() {
        assert_eq!(
            render("<orderedlist><listitem><para>x</para></listitem></orderedlist>"),
            "\n#. x\n"
        );
    }

    #[test]
    fn test_list_blank_lines_collapse() {
        assert_eq!(
            render("<itemizedlist><listitem><para>a</para>\n\n<para>b</para></listitem></itemizedlist>"),
            "\n* a\n\n  b\n"
        );
    }

    #[test]
    fn test_ulink() {
        assert_eq!(
            render("<ulink url=\"http://x.org\">X</ulink>"),
            "`X <http://x.org>`__"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render("<link linkend=\"gtk-widget-show\">show</link>"),
            ":obj:`Gtk.Widget.show`"
        );
        assert_eq!(
            render("<link linkend=\"gtk-migrating\">Migrating</link>"),
            "`Migrating <https://example.org/migrating.html>`__"
        );
        assert_eq!(render("<link>plain</link>"), "plain");

        let (out, stats) = render_with("<link linkend=\"nowhere_x\">Somewhere</link>");
        assert_eq!(out, "'Somewhere [nowhere\\_x]'");
        assert_eq!(stats.missed_links(), 1);
    }

    #[test]
    fn test_single_line_listing() {
        assert_eq!(render("<programlisting>foo (x);</programlisting>"), "``foo (x);``");
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            render("<programlisting language=\"C\"><![CDATA[\n  if (a)\n    b ();\n]]></programlisting>"),
            "\n.. code-block:: c\n\n    if (a)\n      b ();\n"
        );
    }

    #[test]
    fn test_code_block_default_language() {
        assert_eq!(
            render("<screen>\n$ make\n$ make install\n</screen>"),
            "\n.. code-block:: none\n\n    $ make\n    $ make install\n"
        );
    }

    #[test]
    fn test_title() {
        assert_eq!(
            render("<title>About #GtkWidget</title>"),
            "\nAbout :obj:`Gtk.Widget`\n    ..\n        .\n\n"
        );
    }

    #[test]
    fn test_keycombo() {
        assert_eq!(
            render("<keycombo><keycap>Control</keycap><keycap>L</keycap></keycombo>"),
            "Control + L"
        );
    }

    #[test]
    fn test_varlistentry() {
        assert_eq!(
            render(
                "<varlistentry><term>first</term><term>second</term>\
                 <listitem>body\n   more</listitem></varlistentry>"
            ),
            "\nfirst, second\n    body\n    more\n"
        );
    }

    #[test]
    fn test_text_continuation_keeps_first_line() {
        assert_eq!(render("<para>a <emphasis>b</emphasis> c\n   d</para>"), "a b c\nd\n");
    }

    #[test]
    fn test_special_chunks_separated() {
        assert_eq!(join_chunks(vec![Chunk::plain("a*"), Chunk::plain("*b")]), "a* *b");
        assert_eq!(join_chunks(vec![Chunk::plain("a"), Chunk::plain("b")]), "ab");
        assert_eq!(
            join_chunks(vec![Chunk::plain("a"), Chunk::markup("``x``"), Chunk::plain("s")]),
            "a ``x`` s"
        );
        assert_eq!(
            join_chunks(vec![Chunk::plain("("), Chunk::markup("``x``"), Chunk::plain(")")]),
            "(``x``)"
        );
        assert_eq!(join_chunks(vec![Chunk::default(), Chunk::plain("a")]), "a");
    }

    #[test]
    fn test_inline_markup_spaced_from_words() {
        assert_eq!(render("<para>a<literal>foo</literal>s here</para>"), "a ``foo`` s here\n");
        assert_eq!(render("x<type>GList</type>"), "x ``GList``");
        assert_eq!(
            render("Use the <link linkend=\"GtkWidget\">widget</link>s here"),
            "Use the :obj:`Gtk.Widget` s here"
        );
        assert_eq!(render("<emphasis>#GtkWidget</emphasis>s"), ":obj:`Gtk.Widget` s");
        assert_eq!(render("(<literal>x</literal>)."), "(``x``).");
    }

    #[test]
    fn test_adjacent_paras_separated() {
        assert_eq!(render("<para>a</para><para>b</para>"), "a\n\nb\n");
        assert_eq!(render("<para>a</para>\n\n<para>b</para>"), "a\n\nb\n");
        assert_eq!(render("text<para>b</para>"), "text\n\nb\n");
        assert_eq!(render("\n<para>a</para>"), "\na\n");
    }

    #[test]
    fn test_ulink_text_escaped() {
        assert_eq!(
            render("<ulink url=\"http://x.org\">gtk_init `x`</ulink>"),
            "`gtk\\_init \\`x\\` <http://x.org>`__"
        );
        assert_eq!(
            render("<link linkend=\"gtk-migrating\">see_this</link>"),
            "`see\\_this <https://example.org/migrating.html>`__"
        );
    }

    #[test]
    fn test_trim_blank_lines() {
        assert_eq!(trim_blank_lines("\n \n  x\n  y\n\n"), "  x\n  y");
        assert_eq!(trim_blank_lines("x"), "x");
        assert_eq!(trim_blank_lines("\n\n"), "");
    }
}
