//! Driver configuration loaded from a TOML file.
//!
//! ```toml
//! [inference]
//! verify_stacks = true
//! max_generics_depth = 4
//! extra_categories = ["demo.Shout"]
//! ```

use std::path::Path;

use gravy_infer::InferenceOptions;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub inference: InferenceOptions,
}

impl DriverConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// The config at `path`, or defaults when no path was given.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
