//! The WBS document: project attributes, node tree, and bundle history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::node::{NodeTag, WbsNode};

/// Newest document format revision this engine understands.
pub const SUPPORTED_FORMAT: u32 = 2;

/// Errors raised while turning raw bytes into a usable document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The byte stream was not a well-formed document.
    #[error("malformed WBS document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document declares a format newer than this engine supports.
    #[error("unsupported WBS document format {0} (newest supported is {SUPPORTED_FORMAT})")]
    UnsupportedFormat(u32),

    /// The document was well-formed but structurally unusable.
    #[error("invalid WBS document: {0}")]
    Invalid(String),
}

/// A record that an ID renumbering happened when two forks of the document
/// were merged. Maps old official node IDs to their replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    #[serde(rename = "idMap")]
    pub id_map: BTreeMap<String, String>,
}

/// One revision in the document's bundle lineage, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRevision {
    /// Opaque token naming this revision.
    pub bundle: String,
    /// Present when this revision was produced by merging forks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeRecord>,
}

impl BundleRevision {
    /// A plain (non-merge) revision.
    #[must_use]
    pub fn plain(bundle: impl Into<String>) -> Self {
        Self { bundle: bundle.into(), merge: None }
    }

    /// A merge revision carrying an old-to-new ID map.
    #[must_use]
    pub fn merged(bundle: impl Into<String>, id_map: BTreeMap<String, String>) -> Self {
        Self { bundle: bundle.into(), merge: Some(MergeRecord { id_map }) }
    }
}

/// A parsed team WBS document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WbsDocument {
    #[serde(rename = "formatVersion", default = "default_format")]
    pub format_version: u32,
    /// The project's official ID, shared by every task ID it issues.
    #[serde(rename = "projectID")]
    pub project_id: String,
    /// When the authoring tool exported this document. Used as the source
    /// timestamp for three-way value merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<DateTime<Utc>>,
    pub root: WbsNode,
    /// Bundle lineage, oldest revision first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<BundleRevision>,
}

fn default_format() -> u32 {
    1
}

impl WbsDocument {
    /// Parses and validates a document from its wire form.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_slice(bytes)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serializes the document back to its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The bundle token of the newest revision, if a lineage is present.
    #[must_use]
    pub fn head_bundle(&self) -> Option<&str> {
        self.history.last().map(|r| r.bundle.as_str())
    }

    fn validate(&self) -> Result<(), DocumentError> {
        if self.format_version > SUPPORTED_FORMAT {
            return Err(DocumentError::UnsupportedFormat(self.format_version));
        }
        if self.project_id.trim().is_empty() {
            return Err(DocumentError::Invalid("projectID is empty".into()));
        }
        if self.root.tag != NodeTag::Project {
            return Err(DocumentError::Invalid(format!(
                "root element has tag {:?}, expected a project",
                self.root.tag.as_str()
            )));
        }
        Ok(())
    }
}
