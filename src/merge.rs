//! Structural union of patch banks across patch documents
//!
//! The first document is the base; every other document is merged into it.
//! Banks match by exact name, patches match by exact number. A bank missing
//! from the base is appended whole, preserving source order; a patch missing
//! from a matched bank is appended; a patch already present in the base is
//! left untouched (first-source-wins, silent, counted as shadowed). All
//! non-bank content comes from the base unmodified. The merge builds a new
//! output tree from the base, so the source trees are never aliased by the
//! result.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::xml::{parse_document, to_xml_string, Element, Node};

const PATCH_BANK: &str = "PatchBank";
const PATCH_NAME_LIST: &str = "PatchNameList";
const PATCH: &str = "Patch";
const CHANNEL_NAME_SET: &str = "ChannelNameSet";

/// Counts describing what the merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Banks appended to the base because no name matched
    pub banks_appended: usize,
    /// Patches appended into banks that matched by name
    pub patches_appended: usize,
    /// Incoming patches dropped because the base already had the number
    pub patches_shadowed: usize,
}

/// Result of merging a sequence of documents
#[derive(Debug, Clone)]
pub struct MergedDocument {
    /// The merged tree, derived from the base
    pub document: Element,
    /// Serialized form with XML declaration, ready to persist
    pub xml: String,
    pub report: MergeReport,
}

/// Merge the documents at `paths` (first is the base) and serialize the
/// result. Any unreadable or malformed document is fatal: every path here
/// was referenced explicitly by the caller.
pub fn merge_documents(paths: &[PathBuf]) -> Result<MergedDocument> {
    let (base_path, rest) = paths
        .split_first()
        .ok_or_else(|| Error::Merge("no documents to merge".to_string()))?;

    let base = load_document(base_path)?;
    let mut others = Vec::with_capacity(rest.len());
    for path in rest {
        others.push(load_document(path)?);
    }

    let (document, report) = merge_trees(&base, &others)?;
    let xml = to_xml_string(&document);
    tracing::info!(
        "Merged {} documents into {}: +{} banks, +{} patches, {} shadowed",
        paths.len(),
        base_path.display(),
        report.banks_appended,
        report.patches_appended,
        report.patches_shadowed
    );
    Ok(MergedDocument {
        document,
        xml,
        report,
    })
}

fn load_document(path: &Path) -> Result<Element> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    parse_document(&contents).map_err(|e| Error::xml(path, e))
}

/// Merge parsed documents in memory. The base's full tree is cloned into the
/// output; the sources are left untouched.
pub fn merge_trees(base: &Element, others: &[Element]) -> Result<(Element, MergeReport)> {
    let mut merged = base.clone();
    let mut report = MergeReport::default();

    if find_bank_container_mut(&mut merged).is_none() {
        return Err(Error::Merge(
            "base document has no patch bank container".to_string(),
        ));
    }

    for other in others {
        let Some(incoming_container) = find_bank_container(other) else {
            // Nothing to take from a document without banks.
            continue;
        };
        let incoming_banks: Vec<&Element> =
            incoming_container.children_named(PATCH_BANK).collect();

        let container = find_bank_container_mut(&mut merged)
            .ok_or_else(|| Error::Internal("bank container vanished during merge".to_string()))?;

        for incoming_bank in incoming_banks {
            let Some(bank_name) = incoming_bank.attr("Name").map(str::to_string) else {
                continue;
            };
            match find_bank_mut(container, &bank_name) {
                Some(existing) => merge_bank(existing, incoming_bank, &mut report),
                None => {
                    container.push_element(incoming_bank.clone());
                    report.banks_appended += 1;
                }
            }
        }
    }

    Ok((merged, report))
}

/// Append every patch the base bank does not already have, by exact number.
fn merge_bank(base_bank: &mut Element, incoming_bank: &Element, report: &mut MergeReport) {
    let existing_numbers: Vec<String> = collect_patches(base_bank)
        .iter()
        .filter_map(|p| p.attr("Number").map(str::to_string))
        .collect();

    let additions: Vec<Element> = collect_patches(incoming_bank)
        .iter()
        .filter(|patch| match patch.attr("Number") {
            Some(number) => {
                if existing_numbers.iter().any(|n| n == number) {
                    report.patches_shadowed += 1;
                    false
                } else {
                    true
                }
            }
            None => false,
        })
        .map(|patch| (*patch).clone())
        .collect();

    if additions.is_empty() {
        return;
    }
    report.patches_appended += additions.len();

    // Patches live in the bank's name list when one exists, else directly
    // under the bank.
    let target = match base_bank
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if e.name == PATCH_NAME_LIST))
    {
        Some(index) => match &mut base_bank.children[index] {
            Node::Element(list) => list,
            Node::Text(_) => unreachable!("position matched an element"),
        },
        None => base_bank,
    };
    for patch in additions {
        target.push_element(patch);
    }
}

/// Patches of a bank, whether nested in a name list or direct children.
fn collect_patches(bank: &Element) -> Vec<&Element> {
    let mut patches = Vec::new();
    for child in bank.child_elements() {
        if child.name == PATCH {
            patches.push(child);
        } else if child.name == PATCH_NAME_LIST {
            patches.extend(child.children_named(PATCH));
        }
    }
    patches
}

/// The bank container is the first element (depth-first) holding at least
/// one `PatchBank` child; a document with an empty `ChannelNameSet` still
/// counts, so a base without any banks yet can be merged into.
fn find_bank_container(root: &Element) -> Option<&Element> {
    fn walk<'a>(element: &'a Element) -> Option<&'a Element> {
        if element.children_named(PATCH_BANK).next().is_some() {
            return Some(element);
        }
        for child in element.child_elements() {
            if let Some(found) = walk(child) {
                return Some(found);
            }
        }
        None
    }
    walk(root).or_else(|| root.find_first(CHANNEL_NAME_SET))
}

fn find_bank_container_mut(root: &mut Element) -> Option<&mut Element> {
    fn has_bank(element: &Element) -> bool {
        element.children_named(PATCH_BANK).next().is_some()
    }
    fn walk(element: &mut Element) -> Option<&mut Element> {
        if has_bank(element) {
            return Some(element);
        }
        for child in element.children.iter_mut() {
            if let Node::Element(child) = child {
                if let Some(found) = walk(child) {
                    return Some(found);
                }
            }
        }
        None
    }
    // Two passes keep the borrow checker happy: locate first, then descend.
    if find_bank_container_probe(root) {
        walk(root)
    } else {
        find_channel_name_set_mut(root)
    }
}

fn find_bank_container_probe(root: &Element) -> bool {
    fn walk(element: &Element) -> bool {
        if element.children_named(PATCH_BANK).next().is_some() {
            return true;
        }
        element.child_elements().any(walk)
    }
    walk(root)
}

fn find_channel_name_set_mut(root: &mut Element) -> Option<&mut Element> {
    if root.name == CHANNEL_NAME_SET {
        return Some(root);
    }
    for child in root.children.iter_mut() {
        if let Node::Element(child) = child {
            if let Some(found) = find_channel_name_set_mut(child) {
                return Some(found);
            }
        }
    }
    None
}

fn find_bank_mut<'a>(container: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    container.children.iter_mut().find_map(|node| match node {
        Node::Element(e) if e.name == PATCH_BANK && e.attr("Name") == Some(name) => Some(e),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(banks: &str) -> Element {
        parse_document(&format!(
            r#"<MIDINameDocument>
                <Author>Test</Author>
                <MasterDeviceNames>
                    <Manufacturer>Alesis</Manufacturer>
                    <Model>D4</Model>
                    <ChannelNameSet Name="Drums">{banks}</ChannelNameSet>
                </MasterDeviceNames>
            </MIDINameDocument>"#
        ))
        .unwrap()
    }

    fn bank_names(document: &Element) -> Vec<String> {
        let container = find_bank_container(document).unwrap();
        container
            .children_named(PATCH_BANK)
            .filter_map(|b| b.attr("Name").map(str::to_string))
            .collect()
    }

    fn patches_of<'a>(document: &'a Element, bank: &str) -> Vec<(String, String)> {
        let container = find_bank_container(document).unwrap();
        let bank = container
            .children_named(PATCH_BANK)
            .find(|b| b.attr("Name") == Some(bank))
            .unwrap();
        collect_patches(bank)
            .iter()
            .map(|p| {
                (
                    p.attr("Number").unwrap_or_default().to_string(),
                    p.attr("Name").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn base_wins_on_conflicting_patch_number() {
        let base = doc(
            r#"<PatchBank Name="Bank 1"><PatchNameList>
                <Patch Number="0" Name="Patch 1"/>
            </PatchNameList></PatchBank>"#,
        );
        let incoming = doc(
            r#"<PatchBank Name="Bank 1"><PatchNameList>
                <Patch Number="0" Name="DIFFERENT"/>
                <Patch Number="1" Name="Patch 2"/>
            </PatchNameList></PatchBank>"#,
        );

        let (merged, report) = merge_trees(&base, &[incoming]).unwrap();
        let patches = patches_of(&merged, "Bank 1");
        assert_eq!(
            patches,
            vec![
                ("0".to_string(), "Patch 1".to_string()),
                ("1".to_string(), "Patch 2".to_string()),
            ]
        );
        assert_eq!(report.patches_appended, 1);
        assert_eq!(report.patches_shadowed, 1);
        assert_eq!(report.banks_appended, 0);
    }

    #[test]
    fn missing_bank_is_appended_whole_after_existing_banks() {
        let base = doc(
            r#"<PatchBank Name="Bank 1"><PatchNameList>
                <Patch Number="0" Name="Patch 1"/>
            </PatchNameList></PatchBank>"#,
        );
        let incoming = doc(
            r#"<PatchBank Name="Bank 2"><PatchNameList>
                <Patch Number="0" Name="Kick"/>
                <Patch Number="1" Name="Snare"/>
            </PatchNameList></PatchBank>"#,
        );

        let (merged, report) = merge_trees(&base, &[incoming]).unwrap();
        assert_eq!(bank_names(&merged), vec!["Bank 1", "Bank 2"]);
        assert_eq!(patches_of(&merged, "Bank 2").len(), 2);
        assert_eq!(report.banks_appended, 1);
        assert_eq!(report.patches_appended, 0);
    }

    #[test]
    fn merging_identical_content_is_a_no_op() {
        let base = doc(
            r#"<PatchBank Name="Bank 1"><PatchNameList>
                <Patch Number="0" Name="Patch 1"/>
                <Patch Number="1" Name="Patch 2"/>
            </PatchNameList></PatchBank>"#,
        );
        let (merged, report) = merge_trees(&base, &[base.clone()]).unwrap();
        assert_eq!(merged, base);
        assert_eq!(report.patches_appended, 0);
        assert_eq!(report.banks_appended, 0);
        assert_eq!(report.patches_shadowed, 2);
    }

    #[test]
    fn base_without_bank_container_is_fatal() {
        let base = parse_document(
            r#"<MIDINameDocument>
                <MasterDeviceNames>
                    <Manufacturer>Alesis</Manufacturer>
                    <Model>D4</Model>
                </MasterDeviceNames>
            </MIDINameDocument>"#,
        )
        .unwrap();
        let incoming = doc(r#"<PatchBank Name="Bank 1"/>"#);
        assert!(matches!(
            merge_trees(&base, &[incoming]),
            Err(Error::Merge(_))
        ));
    }

    #[test]
    fn base_with_empty_channel_name_set_accepts_banks() {
        let base = doc("");
        let incoming = doc(
            r#"<PatchBank Name="Bank 1"><PatchNameList>
                <Patch Number="0" Name="Kick"/>
            </PatchNameList></PatchBank>"#,
        );
        let (merged, report) = merge_trees(&base, &[incoming]).unwrap();
        assert_eq!(bank_names(&merged), vec!["Bank 1"]);
        assert_eq!(report.banks_appended, 1);
    }

    #[test]
    fn incoming_without_banks_contributes_nothing() {
        let base = doc(r#"<PatchBank Name="Bank 1"/>"#);
        let incoming = parse_document("<MIDINameDocument><Author>X</Author></MIDINameDocument>")
            .unwrap();
        let (merged, report) = merge_trees(&base, &[incoming]).unwrap();
        assert_eq!(bank_names(&merged), vec!["Bank 1"]);
        assert_eq!(report, MergeReport::default());
    }

    #[test]
    fn non_bank_content_comes_from_the_base() {
        let base = doc(r#"<PatchBank Name="Bank 1"/>"#);
        let incoming = doc(r#"<PatchBank Name="Bank 2"/>"#);
        let (merged, _) = merge_trees(&base, &[incoming]).unwrap();
        assert_eq!(merged.child("Author").unwrap().text(), "Test");
        let master = merged.child("MasterDeviceNames").unwrap();
        assert_eq!(master.child("Manufacturer").unwrap().text(), "Alesis");
    }

    #[test]
    fn merge_order_is_first_source_wins_across_documents() {
        let base = doc(r#"<PatchBank Name="Bank 1"><PatchNameList><Patch Number="0" Name="Base"/></PatchNameList></PatchBank>"#);
        let second = doc(r#"<PatchBank Name="Bank 1"><PatchNameList><Patch Number="1" Name="Second"/></PatchNameList></PatchBank>"#);
        let third = doc(r#"<PatchBank Name="Bank 1"><PatchNameList><Patch Number="1" Name="Third"/><Patch Number="2" Name="AlsoThird"/></PatchNameList></PatchBank>"#);

        let (merged, report) = merge_trees(&base, &[second, third]).unwrap();
        assert_eq!(
            patches_of(&merged, "Bank 1"),
            vec![
                ("0".to_string(), "Base".to_string()),
                ("1".to_string(), "Second".to_string()),
                ("2".to_string(), "AlsoThird".to_string()),
            ]
        );
        assert_eq!(report.patches_shadowed, 1);
        assert_eq!(report.patches_appended, 2);
    }
}
