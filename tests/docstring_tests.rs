//! End-to-end docstring conversion tests.

use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use girdoc::{Converter, ConverterConfig, DocEntry, DocRequest, ReferenceStats, Repository};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gtk_repository() -> Repository {
    let mut repo = Repository::new();
    repo.add_symbol("GtkWidget", "Gtk.Widget")
        .add_symbol("GtkWindow", "Gtk.Window")
        .add_symbol("AtkTextAttribute", "Atk.TextAttribute")
        .add_symbol("GdkFrameTiming", "Gdk.FrameTiming")
        .add_symbol("gtk_widget_show", "Gtk.Widget.show")
        .add_symbol("GtkEntryCompletion", "Gtk.EntryCompletion")
        .add_instance_param("Gtk.Widget.show", "widget")
        .add_type_struct("GtkWidgetClass", "Gtk.Widget")
        .add_doc_reference("gtk-migrating-3", "https://developer.gnome.org/gtk3/migrating.html");
    repo
}

fn setup() -> (Converter, Arc<ReferenceStats>) {
    init_logging();
    let stats = Arc::new(ReferenceStats::new());
    let converter = Converter::new(
        Arc::new(gtk_repository()),
        Arc::clone(&stats),
        ConverterConfig::default(),
    );
    (converter, stats)
}

fn convert(text: &str) -> String {
    setup().0.convert(text, None, None)
}

#[test]
fn test_keyword_and_param_scenario() {
    assert_eq!(
        convert("%TRUE if @page is complete."),
        ":obj:`True` if `page` is complete."
    );
}

#[test]
fn test_unresolved_id_counted_once() {
    let (converter, stats) = setup();
    assert_eq!(
        converter.convert("#FooBar does something", None, None),
        "FooBar does something"
    );
    assert_eq!(stats.missed_references(), 1);
}

#[test]
fn test_resolved_and_unresolved_in_one_call() {
    let (converter, stats) = setup();
    let out = converter.convert(
        "the #AtkTextAttribute to set or #ATK_TEXT_ATTRIBUTE_INVALID",
        None,
        None,
    );
    assert_eq!(
        out,
        "the :obj:`Atk.TextAttribute` to set or ATK\\_TEXT\\_ATTRIBUTE\\_INVALID"
    );
    assert_eq!(stats.missed_references(), 1);
}

#[test]
fn test_plural_reference() {
    assert_eq!(
        convert("foo #GdkFrameTimings"),
        "foo :obj:`Gdk.FrameTimings <Gdk.FrameTiming>`"
    );
}

#[test]
fn test_plain_text_unchanged() {
    let text = "Nothing special here, just words.";
    assert_eq!(convert(text), text);
}

#[test]
fn test_heading_levels_differ() {
    let (converter, _) = setup();
    let level1 = converter.docstring_to_docbook("# Title\nbody").unwrap();
    let level2 = converter.docstring_to_docbook("## Title\nbody").unwrap();
    let setext2 = converter.docstring_to_docbook("Title\n----\nbody").unwrap();

    assert!(level1.starts_with("<refsect2>"));
    assert!(level2.starts_with("<refsect3>"));
    assert_eq!(level2, setext2);

    let rst = converter.convert("# Title\nbody", None, None);
    assert_eq!(rst.trim_start(), "Title\n    ..\n        .\n\nbody");
}

#[test]
fn test_nested_list() {
    let rst = convert("Items:\n\n- one\n  - nested\n- two");
    assert!(rst.starts_with("Items:\n"));
    assert!(rst.ends_with("* one\n\n  * nested\n* two"));
}

#[test]
fn test_code_block_entities() {
    let docstring = "Example:\n|[<!-- language=\"C\" -->\nif (a &amp;&amp; b &lt; c)\n  s = \"&amp;amp;\";\n]|";
    let (converter, _) = setup();

    let docbook = converter.docstring_to_docbook(docstring).unwrap();
    assert!(docbook.contains("<programlisting language=\"C\"><![CDATA[\nif (a && b < c)\n  s = \"&amp;\";\n]]>"));

    let rst = converter.convert(docstring, None, None);
    assert!(rst.starts_with("Example:\n"));
    assert!(rst.ends_with("\n\n.. code-block:: c\n\n    if (a && b < c)\n      s = \"&amp;\";"));
}

#[test]
fn test_inline_code_fence() {
    assert_eq!(
        convert("call |[ gtk_widget_show (w); ]| first"),
        "call ``gtk_widget_show (w);`` first"
    );
}

#[test]
fn test_include_line_stays_literal() {
    assert_eq!(convert("|[ #include <gtk/gtk.h> ]|"), "``#include <gtk/gtk.h>``");
}

#[test]
fn test_links() {
    let (converter, stats) = setup();
    assert_eq!(
        converter.convert(
            "See <link linkend=\"GtkEntryCompletion--inline-selection\">this</link>.",
            None,
            None
        ),
        "See :obj:`Gtk.EntryCompletion.props.inline_selection`."
    );
    assert_eq!(
        converter.convert("Read [the guide][gtk-migrating-3].", None, None),
        "Read `the guide <https://developer.gnome.org/gtk3/migrating.html>`__."
    );
    assert_eq!(
        converter.convert("[Home](https://www.gtk.org)", None, None),
        "`Home <https://www.gtk.org>`__"
    );

    assert_eq!(
        converter.convert("<link linkend=\"unknown\">Gone</link>", None, None),
        "'Gone [unknown]'"
    );
    assert_eq!(stats.missed_links(), 1);
    assert_eq!(stats.missed_references(), 0);
}

#[test]
fn test_context_dependent_references() {
    let (converter, _) = setup();
    assert_eq!(
        converter.convert(
            "Emits ::show after @widget is shown.",
            Some("Gtk.Widget"),
            Some("Gtk.Widget.show")
        ),
        "Emits :py:func:`::show<Gtk.Widget.signals.show>` after `self` is shown."
    );
    assert_eq!(
        converter.convert("Override GtkWidgetClass.show().", None, None),
        "Override :obj:`Gtk.Widget.do_show` ()."
    );
}

#[test]
fn test_non_docbook_tags_escaped() {
    assert_eq!(
        convert("Matches <mime-types>, <child> and <literal>x</literal>."),
        "Matches <mime-types>, <child> and ``x``."
    );
}

#[test]
fn test_inline_markup_kept_apart_from_words() {
    assert_eq!(convert("a<literal>foo</literal>s here"), "a ``foo`` s here");
    assert_eq!(
        convert("Use the <link linkend=\"GtkWidget\">widget</link>s here"),
        "Use the :obj:`Gtk.Widget` s here"
    );
    assert_eq!(convert("x<type>GList</type>"), "x ``GList``");
    assert_eq!(convert("<emphasis>#GtkWidget</emphasis>s"), ":obj:`Gtk.Widget` s");
}

#[test]
fn test_adjacent_docbook_paragraphs() {
    assert_eq!(convert("<para>a</para><para>b</para>"), "a\n\nb");
}

#[test]
fn test_unterminated_cdata_stays_text() {
    assert_eq!(convert("<![CDATA[x"), "<![CDATA[x");
}

#[test]
fn test_printf_formats_not_counted() {
    let (converter, stats) = setup();
    assert_eq!(
        converter.convert("Print with %s and %d.", None, None),
        "Print with %s and %d."
    );
    assert_eq!(stats.missed_references(), 0);
}

#[test]
fn test_trailing_newline_policy() {
    let (converter, _) = setup();
    assert_eq!(converter.convert("a\n\nb\n\n\n", None, None), "a\n\nb\n");
    assert_eq!(converter.convert("a\n\nb", None, None), "a\n\nb");
}

#[test]
fn test_deeply_nested_input_does_not_fail() {
    let (converter, _) = setup();
    let deep = format!("{}#GtkWidget", "> ".repeat(200));
    let out = converter.convert(&deep, None, None);
    assert!(out.ends_with(":obj:`Gtk.Widget`"));
}

#[test]
fn test_batch_and_summary() {
    let (converter, stats) = setup();
    let requests = vec![
        DocRequest::new("#GtkWidget"),
        DocRequest::new("#Missing"),
        DocRequest::new("@widget").with_func("Gtk.Widget.show"),
    ];

    assert_eq!(
        converter.convert_batch(&requests),
        vec![
            ":obj:`Gtk.Widget`".to_string(),
            "Missing".to_string(),
            "`self`".to_string(),
        ]
    );
    assert_eq!(stats.most_common_misses(5), vec![("Missing".to_string(), 1)]);
    stats.log_summary("Gtk");
}

#[test]
fn test_repository_from_files() {
    init_logging();
    let dir = TempDir::new().unwrap();

    let repo_path = dir.path().join("Gtk-3.0.repo.json");
    let mut repo = Repository::new();
    repo.add_symbol("GtkLabel", "Gtk.Label").add_docs(
        "Gtk.Label",
        DocEntry {
            docs: "A #GtkLabel shows text.".to_string(),
            version_added: Some("2.0".to_string()),
            ..Default::default()
        },
    );
    fs::write(&repo_path, repo.to_json_string().unwrap()).unwrap();

    let docref_path = dir.path().join("Gtk-3.0.json");
    fs::write(&docref_path, r#"{"gtk-building": "https://example.org/building.html"}"#).unwrap();

    let mut loaded = Repository::from_json_file(&repo_path).unwrap();
    assert_eq!(loaded.load_doc_references(&docref_path).unwrap(), 1);
    assert_eq!(loaded.load_doc_references(&dir.path().join("absent.json")).unwrap(), 0);

    let converter = Converter::new(
        Arc::new(loaded),
        Arc::new(ReferenceStats::new()),
        ConverterConfig::default(),
    );
    let info = converter.doc_info("Gtk.Label", Some("Gtk.Label"), None).unwrap();
    assert_eq!(
        info.to_rest(),
        "A :obj:`Gtk.Label` shows text.\n\n.. versionadded:: 2.0"
    );
    assert_eq!(
        converter.convert("<link linkend=\"gtk-building\">Building</link>", None, None),
        "`Building <https://example.org/building.html>`__"
    );
}

#[test]
fn test_config_file_changes_output() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("girdoc.json");
    fs::write(
        &path,
        r#"{"self_name": "this", "default_code_language": "text"}"#,
    )
    .unwrap();

    let config = ConverterConfig::load(Some(&path)).unwrap();
    let converter = Converter::new(
        Arc::new(gtk_repository()),
        Arc::new(ReferenceStats::new()),
        config,
    );

    assert_eq!(
        converter.convert("@widget", None, Some("Gtk.Widget.show")),
        "`this`"
    );
    assert_eq!(
        converter.convert("|[\nfoo\nbar\n]|", None, None).trim_start(),
        ".. code-block:: text\n\n    foo\n    bar"
    );
}
