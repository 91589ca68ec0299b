//! Phase name resolution against the project's workflow definitions.
//!
//! Task nodes carry a raw phase name chosen in the authoring tool. The name
//! must land on one of the project's canonical process phases before it can
//! be written as the effective phase. Workflow elements in the document
//! define the canonical list; projects without one fall back to the classic
//! legacy phase set.

use thiserror::Error;
use wbs_model::{NodeTag, WbsNode};

/// The classic legacy process phases.
pub const CLASSIC_PHASES: &[&str] = &[
    "Planning",
    "Design",
    "Design Review",
    "Code",
    "Code Review",
    "Compile",
    "Test",
    "Postmortem",
];

/// Phase resolution failures. Neither aborts a sync; both surface as
/// change-list warnings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// No canonical phase matches the requested name.
    #[error("no process phase matches '{0}'")]
    NotFound(String),
    /// The requested name matches more than one canonical phase.
    #[error("phase name '{name}' is ambiguous: matches '{first}' and '{second}'")]
    Ambiguous {
        name: String,
        first: String,
        second: String,
    },
}

/// Resolves raw phase names to canonical process phases.
#[derive(Debug, Clone)]
pub struct PhaseResolver {
    phases: Vec<String>,
}

impl PhaseResolver {
    /// Builds the canonical list from the document's workflow elements. A
    /// document without workflow definitions resolves against
    /// [`PhaseResolver::classic`].
    #[must_use]
    pub fn from_document(root: &WbsNode) -> Self {
        let mut phases: Vec<String> = Vec::new();
        for workflow in root.children.iter().filter(|c| c.tag == NodeTag::Workflow) {
            for step in &workflow.children {
                if step.name.is_empty() {
                    continue;
                }
                let phase = step.phase_name.as_deref().unwrap_or(&step.name);
                if !phases.iter().any(|p| p.eq_ignore_ascii_case(phase)) {
                    phases.push(phase.to_string());
                }
            }
        }
        if phases.is_empty() {
            Self::classic()
        } else {
            Self { phases }
        }
    }

    /// The classic legacy phase set.
    #[must_use]
    pub fn classic() -> Self {
        Self { phases: CLASSIC_PHASES.iter().map(ToString::to_string).collect() }
    }

    /// The canonical phases, in definition order.
    #[must_use]
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// True when `name` is exactly one of the canonical phases. The legacy
    /// task handler uses this to keep literal phase children alive.
    #[must_use]
    pub fn is_phase_name(&self, name: &str) -> bool {
        self.phases.iter().any(|p| p.eq_ignore_ascii_case(name))
    }

    /// Resolves `name` to a canonical phase: an exact case-insensitive match
    /// first, then a unique containment match in either direction.
    pub fn resolve(&self, name: &str) -> Result<&str, PhaseError> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return Err(PhaseError::NotFound(name.to_string()));
        }
        if let Some(hit) = self.phases.iter().find(|p| p.eq_ignore_ascii_case(wanted)) {
            return Ok(hit);
        }
        let lowered = wanted.to_lowercase();
        let mut hits = self.phases.iter().filter(|p| {
            let phase = p.to_lowercase();
            phase.contains(&lowered) || lowered.contains(&phase)
        });
        match (hits.next(), hits.next()) {
            (Some(only), None) => Ok(only),
            (Some(first), Some(second)) => Err(PhaseError::Ambiguous {
                name: wanted.to_string(),
                first: first.clone(),
                second: second.clone(),
            }),
            (None, _) => Err(PhaseError::NotFound(wanted.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver() -> PhaseResolver {
        let root = WbsNode::new(NodeTag::Project, "P").with_child(
            WbsNode::new(NodeTag::Workflow, "Dev Process").with_children(vec![
                WbsNode::new(NodeTag::Task, "Requirements"),
                WbsNode::new(NodeTag::Task, "Implementation"),
                WbsNode::new(NodeTag::Task, "Integration Test"),
                WbsNode::new(NodeTag::Task, "System Test"),
            ]),
        );
        PhaseResolver::from_document(&root)
    }

    #[test]
    fn exact_match_ignores_case() {
        assert_eq!(resolver().resolve("implementation").unwrap(), "Implementation");
    }

    #[test]
    fn unique_containment_matches() {
        assert_eq!(resolver().resolve("Impl").unwrap(), "Implementation");
        // Containment works in the other direction too.
        assert_eq!(resolver().resolve("Requirements Phase").unwrap(), "Requirements");
    }

    #[test]
    fn ambiguous_names_are_rejected() {
        let err = resolver().resolve("Test").unwrap_err();
        assert!(matches!(err, PhaseError::Ambiguous { .. }));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = resolver().resolve("Deploy").unwrap_err();
        assert_eq!(err, PhaseError::NotFound("Deploy".to_string()));
    }

    #[test]
    fn documents_without_workflows_use_the_classic_set() {
        let root = WbsNode::new(NodeTag::Project, "P");
        let resolver = PhaseResolver::from_document(&root);
        assert!(resolver.is_phase_name("Postmortem"));
        assert_eq!(resolver.resolve("Post").unwrap(), "Postmortem");
        // An exact match wins even when a longer phase would also contain it.
        assert_eq!(resolver.resolve("Design").unwrap(), "Design");
    }
}
