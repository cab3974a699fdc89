//! Verification engine
//!
//! [`node`] checks one concrete node against one candidate format node;
//! [`tree`] drives a whole document through a schema. Neither ever returns
//! an error: the outcome is a [`Verification`] holding a pass flag and one
//! diagnostic per failed check.

pub mod node;
pub mod tree;

pub use node::{verify_node, Expectation, RequestSpec, VerificationRequest};
pub use tree::verify_tree;

use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};

/// Outcome of a verification pass
#[derive(Debug, Clone)]
pub struct Verification {
    passed: bool,
    diagnostics: Diagnostics,
}

impl Verification {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Record a failed check
    pub fn record(&mut self, subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) {
        self.passed = false;
        self.diagnostics.error(subject, code, message);
    }

    pub fn record_item(&mut self, item: DiagnosticItem) {
        self.passed = false;
        self.diagnostics.push(item);
    }

    /// Conjunction of two outcomes, keeping every diagnostic
    pub fn and(mut self, other: Verification) -> Self {
        self.passed = self.passed && other.passed;
        self.diagnostics.merge(other.diagnostics);
        self
    }

    /// One-line summary of every failure, for nesting in another diagnostic
    pub fn summary(&self) -> String {
        self.diagnostics
            .all()
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjunction_keeps_diagnostics() {
        let mut failed = Verification::pass();
        failed.record("x", DiagnosticCode::LevelMismatch, "level 2 expected, found 1");

        let combined = Verification::pass().and(failed);
        assert!(!combined.passed());
        assert_eq!(combined.diagnostics().len(), 1);
        assert_eq!(combined.summary(), "level 2 expected, found 1");

        assert!(Verification::pass().and(Verification::pass()).passed());
    }
}
