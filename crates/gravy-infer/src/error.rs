//! Error types for the inference engine.
//!
//! None of these reach a requestor. A `LookupError` is raised inside one
//! resolver and swallowed by the chain (the resolver simply has no opinion),
//! and an `InferError` is only produced when stack verification is enabled.

use std::fmt;

/// A failure inside a single resolver's lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// A type named in a signature or hierarchy is not in the class table.
    MissingClass { name: String },
    /// Parameter-distance scoring was asked to compare an argument type
    /// against a parameter type it cannot be assigned to.
    IncomparableTypes { from: String, to: String },
    /// Generics substitution nested deeper than the configured cap.
    GenericsDepthExceeded { ty: String, depth: usize },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::MissingClass { name } => {
                write!(f, "class `{}` is not known", name)
            }
            LookupError::IncomparableTypes { from, to } => {
                write!(f, "cannot score `{}` against parameter type `{}`", from, to)
            }
            LookupError::GenericsDepthExceeded { ty, depth } => {
                write!(
                    f,
                    "generic arguments of `{}` nest deeper than {} levels",
                    ty, depth
                )
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// A failure of a whole inference run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InferError {
    /// Scope or context stacks were not empty when the traversal finished.
    UnbalancedStacks {
        scope_depth: usize,
        context_depth: usize,
    },
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::UnbalancedStacks {
                scope_depth,
                context_depth,
            } => write!(
                f,
                "traversal finished with {} open scope(s) and {} open expression context(s)",
                scope_depth, context_depth
            ),
        }
    }
}

impl std::error::Error for InferError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_messages() {
        let err = LookupError::IncomparableTypes {
            from: "java.lang.String".into(),
            to: "java.lang.Integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot score `java.lang.String` against parameter type `java.lang.Integer`"
        );
        let err = LookupError::MissingClass { name: "a.B".into() };
        assert_eq!(err.to_string(), "class `a.B` is not known");
    }

    #[test]
    fn unbalanced_stacks_message() {
        let err = InferError::UnbalancedStacks {
            scope_depth: 2,
            context_depth: 0,
        };
        assert_eq!(
            err.to_string(),
            "traversal finished with 2 open scope(s) and 0 open expression context(s)"
        );
    }
}
