//! Escaping and indentation helpers shared by the markdown parser, the inline
//! resolver and the reST renderer.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Every element name of the DocBook 4 vocabulary. gtk-doc comments may
/// contain any of these; everything else that looks like a tag is text.
const DOCBOOK_TAG_NAMES: &[&str] = &[
    "abbrev", "abstract", "accel", "ackno", "acronym", "action", "address",
    "affiliation", "alt", "anchor", "answer", "appendix", "appendixinfo",
    "application", "area", "areaset", "areaspec", "arg", "article",
    "articleinfo", "artpagenums", "attribution", "audiodata", "audioobject",
    "author", "authorblurb", "authorgroup", "authorinitials", "beginpage",
    "bibliocoverage", "bibliodiv", "biblioentry", "bibliography",
    "bibliographyinfo", "biblioid", "bibliolist", "bibliomisc", "bibliomixed",
    "bibliomset", "biblioref", "bibliorelation", "biblioset", "bibliosource",
    "blockinfo", "blockquote", "book", "bookinfo", "bridgehead", "callout",
    "calloutlist", "caption", "caution", "chapter", "chapterinfo", "citation",
    "citebiblioid", "citerefentry", "citetitle", "city", "classname",
    "classsynopsis", "classsynopsisinfo", "cmdsynopsis", "co", "code", "col",
    "colgroup", "collab", "collabname", "colophon", "colspec", "command",
    "computeroutput", "confdates", "confgroup", "confnum", "confsponsor",
    "conftitle", "constant", "constraint", "constraintdef",
    "constructorsynopsis", "contractnum", "contractsponsor", "contrib",
    "copyright", "coref", "corpauthor", "corpcredit", "corpname", "country",
    "database", "date", "dedication", "destructorsynopsis", "edition",
    "editor", "email", "emphasis", "entry", "entrytbl", "envar", "epigraph",
    "equation", "errorcode", "errorname", "errortext", "errortype", "example",
    "exceptionname", "fax", "fieldsynopsis", "figure", "filename",
    "firstname", "firstterm", "footnote", "footnoteref", "foreignphrase",
    "formalpara", "funcdef", "funcparams", "funcprototype", "funcsynopsis",
    "funcsynopsisinfo", "function", "glossary", "glossaryinfo", "glossdef",
    "glossdiv", "glossentry", "glosslist", "glosssee", "glossseealso",
    "glossterm", "graphic", "graphicco", "group", "guibutton", "guiicon",
    "guilabel", "guimenu", "guimenuitem", "guisubmenu", "hardware",
    "highlights", "holder", "honorific", "html:form", "imagedata",
    "imageobject", "imageobjectco", "important", "index", "indexdiv",
    "indexentry", "indexinfo", "indexterm", "informalequation",
    "informalexample", "informalfigure", "informaltable", "initializer",
    "inlineequation", "inlinegraphic", "inlinemediaobject", "interface",
    "interfacename", "invpartnumber", "isbn", "issn", "issuenum",
    "itemizedlist", "itermset", "jobtitle", "keycap", "keycode", "keycombo",
    "keysym", "keyword", "keywordset", "label", "legalnotice", "lhs",
    "lineage", "lineannotation", "link", "listitem", "literal",
    "literallayout", "lot", "lotentry", "manvolnum", "markup", "mathphrase",
    "medialabel", "mediaobject", "mediaobjectco", "member", "menuchoice",
    "methodname", "methodparam", "methodsynopsis", "mml:math", "modespec",
    "modifier", "mousebutton", "msg", "msgaud", "msgentry", "msgexplan",
    "msginfo", "msglevel", "msgmain", "msgorig", "msgrel", "msgset", "msgsub",
    "msgtext", "nonterminal", "note", "objectinfo", "olink", "ooclass",
    "ooexception", "oointerface", "option", "optional", "orderedlist",
    "orgdiv", "orgname", "otheraddr", "othercredit", "othername", "package",
    "pagenums", "para", "paramdef", "parameter", "part", "partinfo",
    "partintro", "personblurb", "personname", "phone", "phrase", "pob",
    "postcode", "preface", "prefaceinfo", "primary", "primaryie",
    "printhistory", "procedure", "production", "productionrecap",
    "productionset", "productname", "productnumber", "programlisting",
    "programlistingco", "prompt", "property", "pubdate", "publisher",
    "publishername", "pubsnumber", "qandadiv", "qandaentry", "qandaset",
    "question", "quote", "refclass", "refdescriptor", "refentry",
    "refentryinfo", "refentrytitle", "reference", "referenceinfo", "refmeta",
    "refmiscinfo", "refname", "refnamediv", "refpurpose", "refsect1",
    "refsect1info", "refsect2", "refsect2info", "refsect3", "refsect3info",
    "refsection", "refsectioninfo", "refsynopsisdiv", "refsynopsisdivinfo",
    "releaseinfo", "remark", "replaceable", "returnvalue", "revdescription",
    "revhistory", "revision", "revnumber", "revremark", "rhs", "row", "sbr",
    "screen", "screenco", "screeninfo", "screenshot", "secondary",
    "secondaryie", "sect1", "sect1info", "sect2", "sect2info", "sect3",
    "sect3info", "sect4", "sect4info", "sect5", "sect5info", "section",
    "sectioninfo", "see", "seealso", "seealsoie", "seeie", "seg",
    "seglistitem", "segmentedlist", "segtitle", "seriesvolnums", "set",
    "setindex", "setindexinfo", "setinfo", "sgmltag", "shortaffil",
    "shortcut", "sidebar", "sidebarinfo", "simpara", "simplelist",
    "simplemsgentry", "simplesect", "spanspec", "state", "step",
    "stepalternatives", "street", "structfield", "structname", "subject",
    "subjectset", "subjectterm", "subscript", "substeps", "subtitle",
    "superscript", "surname", "svg:svg", "symbol", "synopfragment",
    "synopfragmentref", "synopsis", "systemitem", "table", "task",
    "taskprerequisites", "taskrelated", "tasksummary", "tbody", "td", "term",
    "termdef", "tertiary", "tertiaryie", "textdata", "textobject", "tfoot",
    "tgroup", "th", "thead", "tip", "title", "titleabbrev", "toc", "tocback",
    "tocchap", "tocentry", "tocfront", "toclevel1", "toclevel2", "toclevel3",
    "toclevel4", "toclevel5", "tocpart", "token", "tr", "trademark", "type",
    "ulink", "uri", "userinput", "varargs", "variablelist", "varlistentry",
    "varname", "videodata", "videoobject", "void", "volumenum", "warning",
    "wordasword", "xref", "year",
];

lazy_static! {
    static ref DOCBOOK_TAGS: HashSet<&'static str> = DOCBOOK_TAG_NAMES.iter().copied().collect();

    /// An attribute-less tag: `<name>` or `</name>`.
    static ref BARE_TAG_REGEX: Regex = Regex::new(r"(</?)([^\s]+?)(>)").unwrap();
}

/// Whether `name` is part of the DocBook vocabulary.
pub fn is_docbook_tag(name: &str) -> bool {
    DOCBOOK_TAGS.contains(name)
}

/// Escape tag-like text that is not DocBook.
///
/// gtk-doc accepts things like `<mime-types>` or `<child>` in comments and
/// shows them literally, while real DocBook tags are kept as markup.
pub fn docbook_escape(text: &str) -> String {
    BARE_TAG_REGEX
        .replace_all(text, |caps: &Captures| {
            let tag = &caps[2];
            if is_docbook_tag(tag) {
                caps[0].to_string()
            } else {
                format!(
                    "{}{}{}",
                    html_escape::encode_text(&caps[1]),
                    tag,
                    html_escape::encode_text(&caps[3])
                )
            }
        })
        .into_owned()
}

/// Escape characters with a meaning in reST inline markup.
///
/// `@` is included so docutils does not turn `foo@bar` into a mailto link.
pub fn escape_rest(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if is_rest_special(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Characters [`escape_rest`] escapes.
pub fn is_rest_special(c: char) -> bool {
    matches!(c, '\\' | '*' | '_' | ':' | '`' | '@')
}

/// Prefix every line with `count` spaces.
pub fn indent(text: &str, count: usize) -> String {
    let prefix = " ".repeat(count);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the indentation common to all non-blank lines.
pub fn unindent(text: &str, ignore_first_line: bool) -> String {
    let lines: Vec<&str> = text.lines().collect();

    let common = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !(*i == 0 && ignore_first_line))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            let strip = leading_whitespace(line).min(common);
            skip_chars(line, strip)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip leading whitespace from every line, optionally keeping the first
/// line as is (it continues text that came before it).
pub fn force_unindent(text: &str, ignore_first_line: bool) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 && ignore_first_line {
                line
            } else {
                line.trim_start()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn skip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}
