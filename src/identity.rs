//! Device identity extraction from parsed patch documents
//!
//! A `.midnam` document describes either a master device (one physical
//! device, directly) or an extending device (additions applicable to one or
//! more other devices' definitions). The two sections are mutually exclusive
//! in the source format; master is checked first. A document carrying
//! neither yields no identity, which is a miss rather than an error: such
//! files are simply excluded from the catalog.

use serde::{Deserialize, Serialize};

use crate::xml::Element;

/// Expected root element of a patch document
pub const PATCH_DOCUMENT_ROOT: &str = "MIDINameDocument";

const MASTER_SECTION: &str = "MasterDeviceNames";
const EXTENDING_SECTION: &str = "ExtendingDeviceNames";

/// Which section of the document the identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Document describes a single physical device directly
    Master,
    /// Document extends one or more other devices' definitions
    Extending,
}

/// Structured identity extracted from a single patch document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub manufacturer: String,
    /// For extending documents this is the first declared model.
    pub model: String,
    /// SysEx device family, master documents with a DeviceID element only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub kind: DeviceKind,
    /// Every declared model name, populated for extending documents only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_models: Vec<String>,
}

/// Extract the device identity from a parsed patch document.
///
/// Returns `None` when the document is not a patch document, when the
/// required manufacturer/model elements are missing, or when neither a
/// master nor an extending section is present.
pub fn extract_identity(document: &Element) -> Option<DeviceIdentity> {
    if document.name != PATCH_DOCUMENT_ROOT {
        return None;
    }

    if let Some(master) = document.find_first(MASTER_SECTION) {
        return extract_master(master);
    }
    if let Some(extending) = document.find_first(EXTENDING_SECTION) {
        return extract_extending(extending);
    }
    None
}

fn extract_master(section: &Element) -> Option<DeviceIdentity> {
    let manufacturer = non_empty_text(section.child("Manufacturer")?)?;
    let model = non_empty_text(section.child("Model")?)?;

    let (family_id, device_id) = match section.child("DeviceID") {
        Some(device_id) => (
            device_id.attr("Family").map(str::to_string),
            device_id.attr("Member").map(str::to_string),
        ),
        None => (None, None),
    };

    Some(DeviceIdentity {
        manufacturer,
        model,
        family_id,
        device_id,
        kind: DeviceKind::Master,
        all_models: Vec::new(),
    })
}

fn extract_extending(section: &Element) -> Option<DeviceIdentity> {
    let manufacturer = non_empty_text(section.child("Manufacturer")?)?;

    let all_models: Vec<String> = section
        .children_named("Model")
        .map(|m| m.text())
        .filter(|m| !m.is_empty())
        .collect();
    let model = all_models.first()?.clone();

    Some(DeviceIdentity {
        manufacturer,
        model,
        family_id: None,
        device_id: None,
        kind: DeviceKind::Extending,
        all_models,
    })
}

fn non_empty_text(element: &Element) -> Option<String> {
    let text = element.text();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
