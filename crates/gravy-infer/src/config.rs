//! Options controlling one inference run.

use serde::Deserialize;

/// Tunables for [`crate::InferenceEngine`].
///
/// Deserializable so drivers can read them from the `[inference]` table of a
/// TOML file; every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Report unbalanced scope/context stacks at the end of a run as an error
    /// instead of silently repairing them.
    pub verify_stacks: bool,
    /// Nesting level beyond which generic arguments are left unsubstituted.
    pub max_generics_depth: usize,
    /// Extension (category) types in scope everywhere, after the two defaults.
    pub extra_categories: Vec<String>,
    /// Seed closure parameter types from the call the closure is passed to.
    pub infer_closure_params: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        InferenceOptions {
            verify_stacks: false,
            max_generics_depth: 10,
            extra_categories: Vec::new(),
            infer_closure_params: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = InferenceOptions::default();
        assert!(!opts.verify_stacks);
        assert_eq!(opts.max_generics_depth, 10);
        assert!(opts.infer_closure_params);
        assert!(opts.extra_categories.is_empty());
    }
}
