//! Test helpers for the luminosity calibration workspace
//!
//! Locates the workspace root, provides a scratch directory for figures
//! written by tests and builds canned, seeded surveys.

use once_cell::sync::Lazy;
use parallax_surveys::{Catalogue, ParallaxSurvey, SurveyConfig, UniformSpaceSingleLuminosity};
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find workspace root: {0}")]
    WorkspaceRootNotFound(String),
}

/// Locate the workspace root
///
/// Searches this crate's manifest directory and its ancestors for the
/// Cargo.toml carrying the `[workspace]` table, so the result does not
/// depend on where the test binary runs from.
///
/// # Returns
///
/// The directory holding the workspace manifest
pub fn find_workspace_root() -> Result<PathBuf, TestHelperError> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for dir in manifest_dir.ancestors() {
        let manifest = dir.join("Cargo.toml");
        let Ok(content) = std::fs::read_to_string(&manifest) else {
            continue;
        };
        if content.lines().any(|line| line.trim() == "[workspace]") {
            return Ok(dir.to_path_buf());
        }
    }
    Err(TestHelperError::WorkspaceRootNotFound(format!(
        "no workspace manifest above {}",
        manifest_dir.display()
    )))
}

static WORKSPACE_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_workspace_root().expect("Failed to find workspace root directory"));

/// Scratch directory `test_output/` at the workspace root, created on first use
pub fn output_dir() -> PathBuf {
    let dir = WORKSPACE_ROOT.join("test_output");
    std::fs::create_dir_all(&dir).expect("Failed to create test output directory");
    dir
}

/// Path of a file inside the test output directory
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    output_dir().join(path)
}

/// Survey of the default population (M = 9.0 +- 0.7 between 1 and 100 pc)
pub fn seeded_survey(
    catalogue: Catalogue,
    number_of_stars: usize,
    survey_limit: Option<f64>,
    seed: u64,
) -> ParallaxSurvey {
    survey_from(
        SurveyConfig {
            number_of_stars,
            survey_limit,
            catalogue,
            ..SurveyConfig::default()
        },
        seed,
    )
}

/// Survey from an explicit configuration
pub fn survey_from(config: SurveyConfig, seed: u64) -> ParallaxSurvey {
    UniformSpaceSingleLuminosity::new(config)
        .expect("Invalid survey configuration in test")
        .generate_with_seed(Some(seed))
        .expect("Survey generation failed in test")
}
