use std::path::Path;

use notestore_core::StorageMode;

/// Findings of a storage location check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Mode-specific checks for a candidate storage location.
///
/// When installed, replaces the built-in writability and free-space checks.
/// Path syntax is checked regardless.
pub trait StorageValidator: Send + Sync {
    fn validate(&self, path: &Path, mode: StorageMode) -> ValidationReport;
}
