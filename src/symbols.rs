//! Symbol lookup collaborator.
//!
//! The converter never builds symbol data itself. It is handed a
//! [`SymbolLookup`] which answers the handful of questions reference
//! resolution needs:
//! - C identifier to target identifiers
//! - instance parameter of a function (for `self` substitution)
//! - owner of a class struct (for virtual methods)
//! - gtk-doc anchors to external URLs
//! - per-entity documentation
pub mod repository;

pub use repository::Repository;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw documentation of one entity as supplied by the lookup service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocEntry {
    /// Raw gtk-doc text
    pub docs: String,
    /// Version the entity was added in
    pub version_added: Option<String>,
    /// Version the entity was deprecated in
    pub version_deprecated: Option<String>,
    /// Deprecated, with or without a version
    pub deprecated: bool,
    /// Deprecation note, in gtk-doc markup
    pub deprecation_docs: String,
}

impl DocEntry {
    pub fn new(docs: impl Into<String>) -> Self {
        Self {
            docs: docs.into(),
            ..Default::default()
        }
    }
}

/// Read-only queries the converter makes while resolving references.
pub trait SymbolLookup: Send + Sync {
    /// Target identifiers for a C identifier, best candidate first. Empty
    /// when the identifier is unknown.
    fn lookup_target_ids(&self, c_identifier: &str) -> &[String];

    /// Name of the instance parameter of the function with the given
    /// fully qualified target name.
    fn lookup_instance_param(&self, function: &str) -> Option<&str>;

    /// Target type owning the class/interface struct with the given C name.
    fn lookup_type_struct_owner(&self, c_type: &str) -> Option<&str>;

    /// External URL for a gtk-doc anchor.
    fn lookup_gtkdoc_url(&self, linkend: &str) -> Option<&str>;

    /// Documentation of the entity with the given fully qualified name.
    fn lookup_docs(&self, _fullname: &str) -> Option<&DocEntry> {
        None
    }

    /// Best target identifier for a C identifier.
    fn lookup_target_id(&self, c_identifier: &str) -> Option<&str> {
        self.lookup_target_ids(c_identifier)
            .first()
            .map(String::as_str)
    }
}

/// C identifier to target identifiers.
///
/// Candidates are kept ordered by qualification, most `.` separators first,
/// in insertion order for ties, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "IndexMap<String, Vec<String>>",
    into = "IndexMap<String, Vec<String>>"
)]
pub struct SymbolTable {
    entries: IndexMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate target for `c_identifier`.
    pub fn insert(&mut self, c_identifier: impl Into<String>, target: impl Into<String>) {
        let target = target.into();
        let candidates = self.entries.entry(c_identifier.into()).or_default();
        if candidates.contains(&target) {
            return;
        }
        candidates.push(target);
        // stable, so ties keep insertion order
        candidates.sort_by_key(|candidate| std::cmp::Reverse(candidate.matches('.').count()));
    }

    pub fn get(&self, c_identifier: &str) -> &[String] {
        self.entries
            .get(c_identifier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, c_identifier: &str) -> bool {
        !self.get(c_identifier).is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, targets)| (key.as_str(), targets.as_slice()))
    }
}

impl From<IndexMap<String, Vec<String>>> for SymbolTable {
    fn from(map: IndexMap<String, Vec<String>>) -> Self {
        let mut table = SymbolTable::new();
        for (c_identifier, targets) in map {
            for target in targets {
                table.insert(c_identifier.clone(), target);
            }
        }
        table
    }
}

impl From<SymbolTable> for IndexMap<String, Vec<String>> {
    fn from(table: SymbolTable) -> Self {
        table.entries
    }
}

/// Map a gtk-doc anchor to a target identifier.
///
/// Tries the anchor as a C identifier (`GtkEntryCompletion`), then as a
/// function with dashes for underscores (`gtk-assistant-commit`), then as a
/// property anchor (`GtkEntryCompletion--inline-selection` to
/// `Gtk.EntryCompletion.props.inline_selection`).
pub fn docref_to_target(lookup: &dyn SymbolLookup, linkend: &str) -> Option<String> {
    if let Some(target) = lookup.lookup_target_id(linkend) {
        return Some(target.to_string());
    }

    let function = linkend.replace('-', "_");
    if let Some(target) = lookup.lookup_target_id(&function) {
        return Some(target.to_string());
    }

    if let Some((type_name, property)) = linkend.split_once("--") {
        if let Some(target) = lookup.lookup_target_id(type_name) {
            return Some(format!("{}.props.{}", target, property.replace('-', "_")));
        }
    }

    None
}
