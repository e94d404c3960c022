//! Manufacturer-ID index built from capability descriptors
//!
//! A `.middev` capability descriptor declares device types with the
//! manufacturer's SysEx identity inquiry response. This module scans a tree
//! of descriptors and maps manufacturer display names to a canonical
//! three-group hexadecimal ID. Files that fail to parse and IDs that are not
//! a single hex byte are skipped with a diagnostic; the scan itself never
//! fails over bad input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::scanner::scan_suffix;
use crate::xml::{parse_document, Element};

/// Suffix of capability-descriptor files
pub const DESCRIPTOR_SUFFIX: &str = ".middev";

const DEVICE_TYPE: &str = "DeviceType";
const INQUIRY_RESPONSE: &str = "InquiryResponse";

/// One per-file or per-entry problem encountered during a scan.
///
/// Diagnostics are data, not errors: a scan over a large, possibly
/// inconsistent corpus is best-effort by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanDiagnostic {
    pub path: PathBuf,
    pub message: String,
}

impl ScanDiagnostic {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ScanDiagnostic {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Mapping from manufacturer display name to canonical SysEx manufacturer ID
#[derive(Debug, Clone, Default)]
pub struct ManufacturerIndex {
    ids: HashMap<String, String>,
}

impl ManufacturerIndex {
    /// Exact-name lookup.
    pub fn get(&self, manufacturer: &str) -> Option<&str> {
        self.ids.get(manufacturer).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Build the index by scanning `root` for capability descriptors.
    ///
    /// Last write wins when multiple descriptors disagree on a name; file
    /// scan order is not deterministic across platforms, so callers must not
    /// rely on which file prevails.
    pub fn build(root: &Path) -> Result<(Self, Vec<ScanDiagnostic>)> {
        let mut index = ManufacturerIndex::default();
        let mut diagnostics = Vec::new();

        for file in scan_suffix(root, DESCRIPTOR_SUFFIX)? {
            let contents = match std::fs::read_to_string(&file.path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Skipping unreadable descriptor {}: {}", file.path.display(), e);
                    diagnostics.push(ScanDiagnostic::new(&file.path, format!("read failed: {e}")));
                    continue;
                }
            };
            let document = match parse_document(&contents) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Skipping malformed descriptor {}: {}", file.path.display(), e);
                    diagnostics.push(ScanDiagnostic::new(&file.path, format!("parse failed: {e}")));
                    continue;
                }
            };
            index.absorb_descriptor(&document, &file.path, &mut diagnostics);
        }

        tracing::debug!("Manufacturer index built: {} entries", index.len());
        Ok((index, diagnostics))
    }

    fn absorb_descriptor(
        &mut self,
        document: &Element,
        path: &Path,
        diagnostics: &mut Vec<ScanDiagnostic>,
    ) {
        let mut device_types = Vec::new();
        document.descendants_named(DEVICE_TYPE, &mut device_types);

        for device_type in device_types {
            let Some(manufacturer) = device_type.attr("Manufacturer") else {
                continue;
            };
            let Some(inquiry) = device_type.child(INQUIRY_RESPONSE) else {
                continue;
            };
            let Some(raw_id) = inquiry.attr("ManufacturerID") else {
                continue;
            };
            match normalize_manufacturer_id(raw_id) {
                Some(normalized) => {
                    self.ids.insert(manufacturer.to_string(), normalized);
                }
                None => {
                    tracing::warn!(
                        "Unparseable manufacturer ID {:?} for {} in {}",
                        raw_id,
                        manufacturer,
                        path.display()
                    );
                    diagnostics.push(ScanDiagnostic::new(
                        path,
                        format!("unparseable manufacturer ID {raw_id:?} for {manufacturer}"),
                    ));
                }
            }
        }
    }
}

/// Normalize a single hexadecimal byte to the three-group SysEx form:
/// two placeholder groups followed by the byte, zero-padded, uppercase.
/// `"6"` becomes `"00 00 06"`, `"A3"` becomes `"00 00 A3"`.
pub fn normalize_manufacturer_id(raw: &str) -> Option<String> {
    let byte = u8::from_str_radix(raw.trim(), 16).ok()?;
    Some(format!("00 00 {byte:02X}"))
}
