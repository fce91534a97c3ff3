//! Inline reference resolution.
//!
//! Text is tokenized with [`crate::scanner`] and every reference-shaped token
//! is looked up through a [`SymbolLookup`]. Resolved tokens become
//! reStructuredText roles; everything else is escaped and kept.
//!
//! Substituted markup must stand apart from its neighbours, otherwise
//! docutils reads `:obj:`A`s` or `x:obj:`A`` as broken markup. Before a
//! substitution a space is inserted unless the previous character is
//! whitespace or may legally precede inline markup, and after it unless the
//! next character is whitespace or may legally follow it.

use crate::config::ConverterConfig;
use crate::escape::escape_rest;
use crate::scanner::{tokenize, Token, TokenKind};
use crate::stats::ReferenceStats;
use crate::symbols::SymbolLookup;

/// Characters allowed right before inline markup.
const PRECEDES_MARKUP: &[char] = &['-', ':', '/', '\'', '"', '<', '(', '[', '{'];

/// Characters allowed right after inline markup.
const FOLLOWS_MARKUP: &[char] = &[
    '-', '.', ',', ':', ';', '!', '?', '\\', '/', '\'', '"', ')', ']', '}', '>',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Signal,
    Property,
}

/// Whether a space has to separate two adjacent characters when either side
/// belongs to substituted markup.
pub(crate) fn needs_separator(before: char, before_markup: bool, after: char, after_markup: bool) -> bool {
    (before_markup && !(after.is_whitespace() || FOLLOWS_MARKUP.contains(&after)))
        || (after_markup && !(before.is_whitespace() || PRECEDES_MARKUP.contains(&before)))
}

/// Resolved text, with whether it begins or ends with substituted markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    pub leading_markup: bool,
    pub trailing_markup: bool,
}

/// Output buffer applying the spacing rules around substitutions.
#[derive(Debug, Default)]
struct RestWriter {
    text: String,
    leading_markup: Option<bool>,
    after_markup: bool,
}

impl RestWriter {
    fn push_text(&mut self, text: &str) {
        self.push(text, false);
    }

    fn push_markup(&mut self, markup: &str) {
        self.push(markup, true);
    }

    fn push(&mut self, piece: &str, markup: bool) {
        let Some(first) = piece.chars().next() else {
            return;
        };

        if let Some(last) = self.text.chars().last() {
            if needs_separator(last, self.after_markup, first, markup) {
                self.text.push(' ');
            }
        }

        self.leading_markup.get_or_insert(markup);
        self.text.push_str(piece);
        self.after_markup = markup;
    }

    fn finish(self) -> Resolved {
        Resolved {
            text: self.text,
            leading_markup: self.leading_markup.unwrap_or(false),
            trailing_markup: self.after_markup,
        }
    }
}

/// Resolves gtk-doc references in flowed text for one lookup/stats pair.
pub struct ReferenceResolver<'a> {
    lookup: &'a dyn SymbolLookup,
    stats: &'a ReferenceStats,
    config: &'a ConverterConfig,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        lookup: &'a dyn SymbolLookup,
        stats: &'a ReferenceStats,
        config: &'a ConverterConfig,
    ) -> Self {
        Self {
            lookup,
            stats,
            config,
        }
    }

    /// Rewrite the references in `text`.
    ///
    /// `current_type` and `current_func` are the dotted names of the
    /// documented entity, used for bare `::signal`/`:property` references
    /// and for `self` substitution.
    pub fn resolve(
        &self,
        text: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> String {
        self.resolve_spans(text, current_type, current_func).text
    }

    /// Like [`ReferenceResolver::resolve`], also reporting whether the result
    /// starts or ends with a substitution so callers joining several
    /// fragments can keep the spacing rules across fragment boundaries.
    pub fn resolve_spans(
        &self,
        text: &str,
        current_type: Option<&str>,
        current_func: Option<&str>,
    ) -> Resolved {
        let mut out = RestWriter::default();
        for token in tokenize(text) {
            self.resolve_token(token, current_type, current_func, &mut out);
        }
        out.finish()
    }

    fn resolve_token(
        &self,
        token: Token<'_>,
        current_type: Option<&str>,
        current_func: Option<&str>,
        out: &mut RestWriter,
    ) {
        match token.kind {
            TokenKind::Space | TokenKind::Other => out.push_text(&escape_rest(token.text)),
            TokenKind::Id => self.resolve_id_token(token.text, out),
            TokenKind::Param => self.resolve_param(token.text, current_func, out),
            TokenKind::VFunc => self.resolve_vfunc(token.text, out),
            TokenKind::FullSignal | TokenKind::Signal => {
                self.resolve_member(token.text, Member::Signal, current_type, out)
            }
            TokenKind::FullProperty | TokenKind::Property => {
                self.resolve_member(token.text, Member::Property, current_type, out)
            }
            TokenKind::Field => self.resolve_field(token.text, out),
        }
    }

    fn target_id(&self, c_identifier: &str) -> Option<&str> {
        self.lookup.lookup_target_id(c_identifier)
    }

    /// Markup for an identifier token, `None` when it does not resolve.
    fn id_ref(&self, token: &str) -> Option<String> {
        let (prefix, name) = split_prefix(token);
        let name = name.trim_end_matches('*');

        if let Some(keyword) = keyword_ref(name) {
            return Some(keyword.to_string());
        }
        if let Some(target) = self.target_id(name) {
            return Some(format!(":obj:`{}`", target));
        }
        if prefix.is_some() && self.config.plural_fallback {
            return self.plural_ref(name);
        }
        None
    }

    /// `#GtkWindows` for `GtkWindow`, or `#GdkFrameTiming` for
    /// `GdkFrameTimings`. A type whose real name ends in `s` can resolve to
    /// the wrong target here.
    fn plural_ref(&self, name: &str) -> Option<String> {
        match name.strip_suffix('s') {
            Some(singular) => self
                .target_id(singular)
                .map(|target| format!(":obj:`{}s <{}>`", target, target)),
            None => {
                let plural = format!("{}s", name);
                self.target_id(&plural).map(|target| {
                    let shown = target.strip_suffix('s').unwrap_or(target);
                    format!(":obj:`{} <{}>`", shown, target)
                })
            }
        }
    }

    fn resolve_id_token(&self, token: &str, out: &mut RestWriter) {
        if let Some(markup) = self.id_ref(token) {
            out.push_markup(&markup);
            return;
        }

        match split_prefix(token) {
            (Some(prefix), name) => {
                if !(prefix == '%' && is_printf_conversion(name)) {
                    self.stats
                        .record_missed_reference(name.trim_end_matches('*'));
                }
                // `#` only marks a type, `%` is kept for printf-style text
                if prefix == '#' {
                    out.push_text(&escape_rest(name));
                } else {
                    out.push_text(&escape_rest(token));
                }
            }
            (None, _) => out.push_text(&escape_rest(token)),
        }
    }

    fn resolve_param(&self, token: &str, current_func: Option<&str>, out: &mut RestWriter) {
        let name = token.trim_start_matches('*').trim_start_matches('@');

        // some docs use @CONSTANT for constants
        if name.to_uppercase() == name {
            match self.id_ref(name) {
                Some(markup) => out.push_markup(&markup),
                None => {
                    self.stats.record_missed_reference(name);
                    out.push_text(&escape_rest(name));
                }
            }
            return;
        }

        let instance_param = current_func.and_then(|func| self.lookup.lookup_instance_param(func));
        let shown = match instance_param {
            Some(param) if param == name => self.config.self_name.as_str(),
            _ => name,
        };
        out.push_markup(&format!("`{}`", shown));
    }

    fn resolve_vfunc(&self, token: &str, out: &mut RestWriter) {
        let (_, body) = split_prefix(token);
        let body = body.strip_suffix("()").unwrap_or(body);

        let resolved = body.split_once('.').and_then(|(class, method)| {
            // fall back to the type itself for #GObject.constructed()
            self.lookup
                .lookup_type_struct_owner(class)
                .or_else(|| self.target_id(class))
                .map(|owner| {
                    format!(
                        ":obj:`{}.{}{}` ()",
                        owner, self.config.vfunc_prefix, method
                    )
                })
        });

        match resolved {
            Some(markup) => out.push_markup(&markup),
            None => {
                self.stats.record_missed_reference(body);
                out.push_text(&escape_rest(token));
            }
        }
    }

    fn resolve_member(
        &self,
        token: &str,
        member: Member,
        current_type: Option<&str>,
        out: &mut RestWriter,
    ) {
        let separator = match member {
            Member::Signal => "::",
            Member::Property => ":",
        };
        let Some((owner_token, name)) = token.split_once(separator) else {
            out.push_text(&escape_rest(token));
            return;
        };
        let (prefix, owner) = split_prefix(owner_token);

        // type structs have neither signals nor properties, and property
        // names never contain underscores
        let is_type_struct = !owner.is_empty() && self.lookup.lookup_type_struct_owner(owner).is_some();
        if is_type_struct || (member == Member::Property && name.contains('_')) {
            if !owner_token.is_empty() {
                self.resolve_id_token(owner_token, out);
            }
            out.push_text(&escape_rest(&token[owner_token.len()..]));
            return;
        }

        let target = if owner.is_empty() {
            current_type.map(type_of)
        } else {
            self.target_id(owner).map(str::to_string)
        };

        let Some(target) = target else {
            if member == Member::Signal || prefix.is_some() || owner.is_empty() {
                self.stats.record_missed_reference(&token[prefix.map_or(0, |_| 1)..]);
            }
            let shown = if prefix == Some('#') { &token[1..] } else { token };
            out.push_text(&escape_rest(shown));
            return;
        };

        let shown_name = name.replace('_', "-");
        let attribute = name.replace('-', "_");
        let mut markup = String::new();
        if !owner.is_empty() {
            markup.push_str(&format!(":obj:`{}` ", target));
        }
        match member {
            Member::Signal => markup.push_str(&format!(
                ":py:func:`::{}<{}.signals.{}>`",
                shown_name, target, attribute
            )),
            Member::Property => markup.push_str(&format!(
                ":py:data:`:{}<{}.props.{}>`",
                shown_name, target, attribute
            )),
        }
        out.push_markup(&markup);
    }

    fn resolve_field(&self, token: &str, out: &mut RestWriter) {
        let Some((owner_token, field)) = token.split_once('.') else {
            out.push_text(&escape_rest(token));
            return;
        };
        let (_, owner) = split_prefix(owner_token);

        match self.target_id(owner) {
            Some(target) => out.push_markup(&format!(
                ":obj:`{}` :py:attr:`.{}<{}.fields.{}>`",
                target, field, target, field
            )),
            None => {
                self.resolve_id_token(owner_token, out);
                out.push_text(".");
                self.resolve_id_token(field, out);
            }
        }
    }
}

/// `%s`, `%d`, `%lu`, `%02x`: printf conversions rather than constants.
fn is_printf_conversion(name: &str) -> bool {
    name.len() == 1
        || name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Fixed markup for C boolean and null keywords.
fn keyword_ref(name: &str) -> Option<&'static str> {
    match name {
        "TRUE" => Some(":obj:`True`"),
        "FALSE" => Some(":obj:`False`"),
        "NULL" => Some(":obj:`None`"),
        _ => None,
    }
}

/// Split off a leading `#` or `%` reference marker.
fn split_prefix(token: &str) -> (Option<char>, &str) {
    match token.chars().next() {
        Some(c @ ('#' | '%')) => (Some(c), &token[1..]),
        _ => (None, token),
    }
}

/// `Namespace.Type` part of a dotted entity name.
fn type_of(current: &str) -> String {
    current.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}
