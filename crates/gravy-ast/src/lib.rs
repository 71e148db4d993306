//! The parsed tree consumed by the gravy inference engine.
//!
//! Parsing itself happens upstream; this crate only defines the node types,
//! a builder for constructing trees in code, and JSON loading for trees
//! produced by an external parser.
//!
//! # Architecture
//!
//! - [`decl`]: modules, imports, classes, fields, properties, methods, parameters
//! - [`stmt`]: blocks and statements
//! - [`expr`]: expressions, operators, literals
//! - [`types`]: type references and generic parameter declarations
//! - [`builder`]: [`AstBuilder`] for programmatic construction

pub mod builder;
pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;
mod walk;

use std::fmt;

pub use builder::AstBuilder;
pub use decl::{
    ClassNode, FieldNode, ImportKind, ImportNode, Initializer, MethodNode, Modifiers, ModuleNode,
    Parameter, PropertyNode, SCRIPT_RUN_METHOD,
};
pub use expr::{
    BinaryOp, ClosureExpr, Declaration, Expr, ExprId, ExprKind, Literal, MapEntry, NumberKind,
    UnaryOp, VarDecl,
};
pub use gravy_common::Span;
pub use stmt::{Block, CaseClause, CatchClause, Stmt};
pub use types::{GenericParam, TypeRef};

/// Failure to load a tree from its serialized form.
#[derive(Debug)]
pub enum AstError {
    Json(serde_json::Error),
}

impl fmt::Display for AstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstError::Json(err) => write!(f, "malformed syntax tree: {}", err),
        }
    }
}

impl std::error::Error for AstError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AstError::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for AstError {
    fn from(err: serde_json::Error) -> Self {
        AstError::Json(err)
    }
}

/// Load a module from JSON and assign expression ids.
///
/// Ids present in the input are ignored; every expression is renumbered in
/// pre-order so ids are unique within the module.
pub fn from_json(text: &str) -> Result<ModuleNode, AstError> {
    let mut module: ModuleNode = serde_json::from_str(text)?;
    module.renumber();
    Ok(module)
}

/// Serialize a module to pretty-printed JSON.
pub fn to_json(module: &ModuleNode) -> Result<String, AstError> {
    Ok(serde_json::to_string_pretty(module)?)
}
