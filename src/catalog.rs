//! Device catalog built from a tree of patch documents
//!
//! Groups every successfully parsed patch document by its
//! `manufacturer|model` key, attaches the manufacturer's SysEx ID when the
//! index knows the name, and records a file reference per source document.
//! Per-file parse failures and identity misses do not abort the scan; they
//! come back as diagnostics alongside the catalog.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::{extract_identity, DeviceKind};
use crate::manufacturers::{ManufacturerIndex, ScanDiagnostic};
use crate::scanner::{scan_suffix, FileInfo};
use crate::xml::parse_document;

/// Suffix of patch-document files
pub const PATCH_DOCUMENT_SUFFIX: &str = ".midnam";

/// Separator joining manufacturer and model into a catalog key.
/// Not expected to occur in either field.
pub const KEY_SEPARATOR: char = '|';

/// One source file contributing to a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub path: String,
    pub size_bytes: u64,
    /// Epoch seconds
    pub modified_at: i64,
}

impl From<&FileInfo> for FileRef {
    fn from(info: &FileInfo) -> Self {
        FileRef {
            path: info.path.display().to_string(),
            size_bytes: info.size_bytes,
            modified_at: info.modified_at,
        }
    }
}

/// One logical device: every scanned file sharing a `(manufacturer, model)`
/// pair. Identity metadata comes from the first-seen file for the key and is
/// never merged or reconciled across later files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub manufacturer: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub kind: DeviceKind,
    /// Never empty: every entry arose from at least one scanned file
    pub files: Vec<FileRef>,
}

/// The aggregated device index.
///
/// Iteration order is not guaranteed stable across filesystem orderings;
/// callers must not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }
}

/// Catalog plus the per-file problems encountered while building it
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub catalog: Catalog,
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Compose the grouping key for a device.
pub fn device_key(manufacturer: &str, model: &str) -> String {
    format!("{manufacturer}{KEY_SEPARATOR}{model}")
}

/// Rebuild the catalog from the file tree under `root`.
///
/// Runs the manufacturer index over the capability descriptors first, then
/// walks the tree for patch documents. Rebuilding from an unchanged tree is
/// idempotent up to file-list ordering.
pub fn build_catalog(root: &Path) -> Result<BuildOutcome> {
    let (index, mut diagnostics) = ManufacturerIndex::build(root)?;

    let files = scan_suffix(root, PATCH_DOCUMENT_SUFFIX)?;
    let mut catalog = Catalog::default();

    for file in &files {
        match load_identity(file, &mut diagnostics) {
            Some(identity) => {
                let key = device_key(&identity.manufacturer, &identity.model);
                let entry = catalog.entries.entry(key).or_insert_with(|| CatalogEntry {
                    manufacturer_id: index.get(&identity.manufacturer).map(str::to_string),
                    manufacturer: identity.manufacturer,
                    model: identity.model,
                    family_id: identity.family_id,
                    device_id: identity.device_id,
                    kind: identity.kind,
                    files: Vec::new(),
                });
                entry.files.push(FileRef::from(file));
            }
            None => continue,
        }
    }

    tracing::info!(
        "Catalog built: {} devices from {} patch documents ({} diagnostics)",
        catalog.len(),
        files.len(),
        diagnostics.len()
    );
    Ok(BuildOutcome {
        catalog,
        diagnostics,
    })
}

fn load_identity(
    file: &FileInfo,
    diagnostics: &mut Vec<ScanDiagnostic>,
) -> Option<crate::identity::DeviceIdentity> {
    let contents = match std::fs::read_to_string(&file.path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Skipping unreadable document {}: {}", file.path.display(), e);
            diagnostics.push(ScanDiagnostic::new(&file.path, format!("read failed: {e}")));
            return None;
        }
    };
    let document = match parse_document(&contents) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Skipping malformed document {}: {}", file.path.display(), e);
            diagnostics.push(ScanDiagnostic::new(&file.path, format!("parse failed: {e}")));
            return None;
        }
    };
    match extract_identity(&document) {
        Some(identity) => Some(identity),
        None => {
            tracing::debug!("No device identity in {}", file.path.display());
            diagnostics.push(ScanDiagnostic::new(&file.path, "no device identity"));
            None
        }
    }
}
