//! Project detection for working copies.

use std::path::Path;

use tracing::debug;

use mnemo_core::{MnemoError, ProjectId};

use crate::vcs::VersionControl;

/// Decides which project a working copy belongs to.
pub trait ProjectDetector {
    /// `Ok(None)` means the copy has no detectable project.
    ///
    /// # Errors
    ///
    /// Implementations may fail on unexpected I/O errors.
    fn detect(&self, working_copy: &Path) -> Result<Option<ProjectId>, MnemoError>;
}

/// Derives the project from the `origin` remote (`owner__repo`).
pub struct GitRemoteDetector<'a> {
    vcs: &'a dyn VersionControl,
}

impl<'a> GitRemoteDetector<'a> {
    pub fn new(vcs: &'a dyn VersionControl) -> Self {
        Self { vcs }
    }
}

impl ProjectDetector for GitRemoteDetector<'_> {
    fn detect(&self, working_copy: &Path) -> Result<Option<ProjectId>, MnemoError> {
        match self.vcs.remote_url(working_copy) {
            Ok(Some(url)) => Ok(ProjectId::from_remote_url(&url)),
            Ok(None) => Ok(None),
            Err(e) => {
                debug!(path = %working_copy.display(), error = %e, "no git remote");
                Ok(None)
            }
        }
    }
}

/// A detector that always answers the same.
#[derive(Debug, Clone, Default)]
pub struct FixedProject(pub Option<ProjectId>);

impl ProjectDetector for FixedProject {
    fn detect(&self, _working_copy: &Path) -> Result<Option<ProjectId>, MnemoError> {
        Ok(self.0.clone())
    }
}

/// The project of a working copy: the configured override if any,
/// otherwise whatever `detector` finds.
///
/// # Errors
///
/// Returns [`MnemoError::Config`] if the override is not a valid project
/// id, or propagates detector failures.
pub fn resolve_project(
    configured: Option<&str>,
    detector: &dyn ProjectDetector,
    working_copy: &Path,
) -> Result<Option<ProjectId>, MnemoError> {
    match configured {
        Some(raw) => ProjectId::new(raw)
            .map(Some)
            .map_err(|e| MnemoError::Config(format!("project override: {e}"))),
        None => detector.detect(working_copy),
    }
}
