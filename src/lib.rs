//! # MIDI Name Document Catalog
//!
//! Core library for indexing a directory tree of MIDI name description
//! files:
//! - parses the two related XML dialects (`.midnam` patch documents,
//!   `.middev` capability descriptors),
//! - extracts device identity and manufacturer SysEx IDs,
//! - groups files by logical device into a catalog with a time-windowed
//!   JSON cache,
//! - merges patch documents by structural union of their patch banks,
//! - validates documents for duplicate note and patch numbers.
//!
//! HTTP routing and file serving are the embedding application's concern;
//! this crate exposes [`service::CatalogService`] as the boundary.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod manufacturers;
pub mod merge;
pub mod scanner;
pub mod service;
pub mod validate;
pub mod xml;

pub use crate::error::{Error, Result};
pub use crate::identity::{extract_identity, DeviceIdentity, DeviceKind};
pub use crate::service::{CatalogResult, CatalogService};
