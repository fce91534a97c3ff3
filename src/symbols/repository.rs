//! In-memory [`SymbolLookup`] implementation.
//!
//! A `Repository` holds everything one namespace build needs: the symbol
//! table, instance parameters, class-struct owners, gtk-doc URL mappings and
//! per-entity docs. It is filled by whatever extracts the GIR data and then
//! shared read-only.

use super::{DocEntry, SymbolLookup, SymbolTable};
use crate::error::DocError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    /// C identifier to target identifiers
    pub symbols: SymbolTable,
    /// Function target name to the name of its instance parameter
    pub instance_params: IndexMap<String, String>,
    /// Class/interface struct C name to owning target type
    pub type_structs: IndexMap<String, String>,
    /// gtk-doc anchor to external URL
    pub doc_references: IndexMap<String, String>,
    /// Fully qualified entity name to its docs
    pub docs: IndexMap<String, DocEntry>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(&mut self, c_identifier: &str, target: &str) -> &mut Self {
        self.symbols.insert(c_identifier, target);
        self
    }

    pub fn add_instance_param(&mut self, function: &str, param: &str) -> &mut Self {
        self.instance_params
            .insert(function.to_string(), param.to_string());
        self
    }

    /// Register `c_type` (e.g. `GtkWidgetClass`) as the class struct of `owner`.
    pub fn add_type_struct(&mut self, c_type: &str, owner: &str) -> &mut Self {
        self.type_structs
            .insert(c_type.to_string(), owner.to_string());
        self
    }

    pub fn add_doc_reference(&mut self, linkend: &str, url: &str) -> &mut Self {
        self.doc_references
            .insert(linkend.to_string(), url.to_string());
        self
    }

    pub fn add_docs(&mut self, fullname: &str, entry: DocEntry) -> &mut Self {
        self.docs.insert(fullname.to_string(), entry);
        self
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, DocError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> std::result::Result<String, DocError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a repository previously written with [`Repository::to_json_string`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read repository {}", path.display()))?;
        let repo = Self::from_json_str(&content)
            .with_context(|| format!("Invalid repository data in {}", path.display()))?;

        info!(
            "Loaded repository {} ({} symbols, {} docs)",
            path.display(),
            repo.symbols.len(),
            repo.docs.len()
        );
        Ok(repo)
    }

    /// Merge a gtk-doc reference file (a JSON object of anchor to URL).
    ///
    /// A missing file is not an error; the mapping simply stays as it is.
    /// Returns the number of references read.
    pub fn load_doc_references(&mut self, path: &Path) -> Result<usize> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No gtk-doc references at {}", path.display());
                return Ok(0);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read gtk-doc references {}", path.display()))
            }
        };

        let references: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid gtk-doc references in {}", path.display()))?;
        let count = references.len();

        // sorted for a reproducible insertion order
        let mut references: Vec<_> = references.into_iter().collect();
        references.sort();
        self.doc_references.extend(references);

        debug!("Loaded {} gtk-doc references from {}", count, path.display());
        Ok(count)
    }
}

impl SymbolLookup for Repository {
    fn lookup_target_ids(&self, c_identifier: &str) -> &[String] {
        self.symbols.get(c_identifier)
    }

    fn lookup_instance_param(&self, function: &str) -> Option<&str> {
        self.instance_params.get(function).map(String::as_str)
    }

    fn lookup_type_struct_owner(&self, c_type: &str) -> Option<&str> {
        self.type_structs.get(c_type).map(String::as_str)
    }

    fn lookup_gtkdoc_url(&self, linkend: &str) -> Option<&str> {
        self.doc_references.get(linkend).map(String::as_str)
    }

    fn lookup_docs(&self, fullname: &str) -> Option<&DocEntry> {
        self.docs.get(fullname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn sample() -> Repository {
        let mut repo = Repository::new();
        repo.add_symbol("GtkWidget", "Gtk.Widget")
            .add_instance_param("Gtk.Widget.show", "widget")
            .add_type_struct("GtkWidgetClass", "Gtk.Widget")
            .add_doc_reference("gtk-migrating", "https://example.org/migrating.html")
            .add_docs("Gtk.Widget.show", DocEntry::new("Shows @widget."));
        repo
    }

    #[test]
    fn test_lookups() {
        let repo = sample();
        assert_eq!(repo.lookup_target_id("GtkWidget"), Some("Gtk.Widget"));
        assert_eq!(repo.lookup_instance_param("Gtk.Widget.show"), Some("widget"));
        assert_eq!(repo.lookup_type_struct_owner("GtkWidgetClass"), Some("Gtk.Widget"));
        assert_eq!(
            repo.lookup_gtkdoc_url("gtk-migrating"),
            Some("https://example.org/migrating.html")
        );
        assert_eq!(
            repo.lookup_docs("Gtk.Widget.show").map(|e| e.docs.as_str()),
            Some("Shows @widget.")
        );
        assert!(repo.lookup_docs("Gtk.Widget.hide").is_none());
    }

    #[test]
    fn test_json_roundtrip_file() {
        let repo = sample();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(repo.to_json_string().unwrap().as_bytes())
            .unwrap();
        file.flush().unwrap();

        let loaded = Repository::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, repo);
    }

    #[test]
    fn test_from_json_partial() {
        let repo = Repository::from_json_str(r#"{"symbols": {"GtkWindow": ["Gtk.Window"]}}"#).unwrap();
        assert_eq!(repo.lookup_target_id("GtkWindow"), Some("Gtk.Window"));
        assert!(repo.docs.is_empty());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            Repository::from_json_str("[1, 2]"),
            Err(DocError::Json(_))
        ));
    }

    #[test]
    fn test_load_doc_references() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Gtk-3.0.json");
        fs::write(&path, r#"{"gtk-x": "https://x", "gtk-y": "https://y"}"#).unwrap();

        let mut repo = Repository::new();
        assert_eq!(repo.load_doc_references(&path).unwrap(), 2);
        assert_eq!(repo.lookup_gtkdoc_url("gtk-y"), Some("https://y"));
    }

    #[test]
    fn test_load_doc_references_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::new();
        assert_eq!(
            repo.load_doc_references(&dir.path().join("missing.json"))
                .unwrap(),
            0
        );
        assert!(repo.doc_references.is_empty());
    }

    #[test]
    fn test_load_doc_references_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "not json").unwrap();

        let mut repo = Repository::new();
        let err = repo.load_doc_references(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid gtk-doc references"));
    }
}
