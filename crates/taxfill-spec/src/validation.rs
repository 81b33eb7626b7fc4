use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single manifest problem, addressed by a dotted path into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestIssue {
    pub path: String,
    pub message: String,
}

impl ManifestIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found in one validation pass.
#[derive(Debug, Clone, Error)]
pub struct ValidationError {
    issues: Vec<ManifestIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ManifestIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ManifestIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ManifestIssue> {
        self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest validation failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}
