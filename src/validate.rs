//! Structural validation of patch documents
//!
//! Checks the duplicate-key rules the editor relies on: note numbers must be
//! unique within a `NoteNameList` and patch numbers unique within a bank,
//! and every note must carry both `Number` and `Name`. Problems are returned
//! as a structured report, never raised as a hard failure; even a document
//! that fails to parse produces a report with the parse error as its single
//! entry.

use serde::Serialize;

use crate::xml::{parse_document, Element};

/// Validation outcome: an overall flag plus human-readable messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate raw XML text. A parse failure is reported, not returned as Err.
pub fn validate_text(input: &str) -> ValidationReport {
    match parse_document(input) {
        Ok(document) => validate_document(&document),
        Err(e) => ValidationReport {
            valid: false,
            errors: vec![format!("XML parse error: {e}")],
        },
    }
}

/// Validate a parsed document.
pub fn validate_document(document: &Element) -> ValidationReport {
    let mut errors = Vec::new();

    let mut note_lists = Vec::new();
    document.descendants_named("NoteNameList", &mut note_lists);
    for note_list in note_lists {
        let list_name = note_list.attr("Name").unwrap_or("(unnamed)");
        let mut numbers: Vec<&str> = Vec::new();
        for note in note_list.children_named("Note") {
            let number = note.attr("Number");
            let name = note.attr("Name");
            if number.is_none() || name.is_none() {
                errors.push(format!("Missing number or name in {list_name}"));
            }
            if let Some(number) = number {
                if numbers.contains(&number) {
                    errors.push(format!("Duplicate note number {number} in {list_name}"));
                }
                numbers.push(number);
            }
        }
    }

    let mut banks = Vec::new();
    document.descendants_named("PatchBank", &mut banks);
    for bank in banks {
        let bank_name = bank.attr("Name").unwrap_or("(unnamed)");
        let mut numbers: Vec<&str> = Vec::new();
        let mut patches = Vec::new();
        bank.descendants_named("Patch", &mut patches);
        for patch in patches {
            if let Some(number) = patch.attr("Number") {
                if numbers.contains(&number) {
                    errors.push(format!("Duplicate patch number {number} in {bank_name}"));
                }
                numbers.push(number);
            }
        }
    }

    ValidationReport::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_note_numbers_are_reported() {
        let report = validate_text(
            r#"<MIDINameDocument>
                <NoteNameList Name="Drum Set 1">
                    <Note Number="10" Name="Kick"/>
                    <Note Number="10" Name="Snare"/>
                </NoteNameList>
            </MIDINameDocument>"#,
        );
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Duplicate note number 10")));
    }

    #[test]
    fn missing_note_attributes_are_reported() {
        let report = validate_text(
            r#"<MIDINameDocument>
                <NoteNameList Name="Drum Set 1">
                    <Note Number="10"/>
                </NoteNameList>
            </MIDINameDocument>"#,
        );
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Missing number or name in Drum Set 1"]);
    }

    #[test]
    fn duplicate_patch_numbers_are_reported() {
        let report = validate_text(
            r#"<MIDINameDocument>
                <PatchBank Name="Bank 1"><PatchNameList>
                    <Patch Number="0" Name="A"/>
                    <Patch Number="0" Name="B"/>
                </PatchNameList></PatchBank>
            </MIDINameDocument>"#,
        );
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Duplicate patch number 0 in Bank 1")));
    }

    #[test]
    fn clean_document_is_valid() {
        let report = validate_text(
            r#"<MIDINameDocument>
                <NoteNameList Name="Drum Set 1">
                    <Note Number="10" Name="Kick"/>
                    <Note Number="11" Name="Snare"/>
                </NoteNameList>
            </MIDINameDocument>"#,
        );
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn parse_failure_becomes_a_report_entry() {
        let report = validate_text("<broken");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("XML parse error:"));
    }
}
