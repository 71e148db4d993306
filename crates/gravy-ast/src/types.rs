//! Type references as written in declarations.
//!
//! The upstream parser has already resolved simple names against imports, so
//! a `TypeRef` carries a fully-qualified name (or the bare name of a generic
//! type parameter, marked as a placeholder).

use std::fmt;

use gravy_common::Span;
use serde::{Deserialize, Serialize};

/// A reference to a type in source: `java.util.List<java.lang.String>`,
/// `int[]`, or a type parameter such as `T`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<TypeRef>,
    #[serde(default)]
    pub array_dims: u8,
    /// True when `name` is a type parameter (`T`, `E`) rather than a class.
    #[serde(default)]
    pub placeholder: bool,
    #[serde(default)]
    pub span: Option<Span>,
}

impl TypeRef {
    /// A plain class reference with no type arguments.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            args: Vec::new(),
            array_dims: 0,
            placeholder: false,
            span: None,
        }
    }

    /// A parameterized class reference.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef {
            args,
            ..TypeRef::named(name)
        }
    }

    /// A reference to a type parameter in scope.
    pub fn placeholder(name: impl Into<String>) -> Self {
        TypeRef {
            placeholder: true,
            ..TypeRef::named(name)
        }
    }

    /// Wrap this reference in one more array dimension.
    pub fn array(mut self) -> Self {
        self.array_dims += 1;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        for _ in 0..self.array_dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// A declared generic type parameter: `T` or `T extends Number`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    #[serde(default)]
    pub upper_bound: Option<TypeRef>,
}

impl GenericParam {
    pub fn new(name: impl Into<String>) -> Self {
        GenericParam {
            name: name.into(),
            upper_bound: None,
        }
    }

    pub fn bounded(name: impl Into<String>, bound: TypeRef) -> Self {
        GenericParam {
            name: name.into(),
            upper_bound: Some(bound),
        }
    }
}
