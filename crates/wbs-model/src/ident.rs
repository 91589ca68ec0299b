//! Node identity schemes.
//!
//! A document node can be matched against the local hierarchy through three
//! schemes, tried in order of strength:
//!
//! 1. **Official ID** — assigned centrally by the document's authoring tool.
//! 2. **Client ID** — minted locally for nodes created on this machine and
//!    echoed back by the document once the authoring tool has seen them.
//! 3. **Pseudo ID** — positional: the official ID of the nearest identified
//!    ancestor plus the relative name path below it. Survives only while
//!    names and positions are stable, so it is the fallback of last resort.

use serde::{Deserialize, Serialize};

/// One identity claim for a node, strongest scheme first in match order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeIdent {
    /// Centrally assigned ID.
    Official(String),
    /// Locally minted `owner-dataset:sequence` ID.
    Client(String),
    /// Positional `ancestorID:relative/name/path` ID.
    Pseudo(String),
}

impl NodeIdent {
    /// The raw identity string, without the scheme.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Official(v) | Self::Client(v) | Self::Pseudo(v) => v,
        }
    }
}

impl std::fmt::Display for NodeIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Official(v) => write!(f, "id:{v}"),
            Self::Client(v) => write!(f, "cid:{v}"),
            Self::Pseudo(v) => write!(f, "pseudo:{v}"),
        }
    }
}

/// Builds the pseudo ID for a node `rel_names` below an identified ancestor.
///
/// The relative name path joins segment names with `/`; the result is
/// `"{ancestor_id}:{a/b/c}"`.
#[must_use]
pub fn pseudo_ident<S: AsRef<str>>(ancestor_id: &str, rel_names: &[S]) -> String {
    let mut out = String::with_capacity(ancestor_id.len() + 16);
    out.push_str(ancestor_id);
    out.push(':');
    for (i, name) in rel_names.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(name.as_ref());
    }
    out
}

/// Builds a client ID from the local dataset identity and a sequence number.
#[must_use]
pub fn client_ident(owner: &str, dataset: &str, sequence: u64) -> String {
    format!("{owner}-{dataset}:{sequence}")
}

/// Splits a comma-separated task-ID list attribute.
#[must_use]
pub fn parse_task_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins task IDs back into the comma-separated attribute form.
#[must_use]
pub fn join_task_ids(ids: &[String]) -> String {
    ids.join(",")
}

/// The node-ID portion of a `project:node` task ID.
///
/// Returns the whole string when no separator is present.
#[must_use]
pub fn task_id_node_part(task_id: &str) -> &str {
    task_id.rsplit(':').next().unwrap_or(task_id)
}
