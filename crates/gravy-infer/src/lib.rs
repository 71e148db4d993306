//! Gravy inference engine: best-effort expression typing for Groovy-like trees.
//!
//! A single traversal computes the most precise known type of every
//! expression, declaration and reference in a module, using:
//!
//! - a chain of pluggable resolvers with confidence arbitration
//! - lexical scopes that understand closures, delegates and `use` blocks
//! - generic substitution along a type's supertype chain
//! - flow-insensitive narrowing of untyped locals on assignment
//!
//! Every node is handed to a [`TypeRequestor`], which may cancel the current
//! branch, the current member, or the whole run.
//!
//! # Architecture
//!
//! - [`ty`]: type descriptors and well-known names
//! - [`signature`]: compact signature syntax for declaring library types
//! - [`decl`]: member declarations (methods, fields, properties, variables)
//! - [`class_table`]: the type universe, layered library/module tables
//! - [`builtins`]: the built-in JDK and Groovy runtime types
//! - [`generics`]: substitution of type parameters across a hierarchy
//! - [`scope`]: the scope arena, closure frames, categories, call stack
//! - [`lookup`]: the resolver SPI, the chain, and the built-in resolvers
//! - [`operators`]: fixed operator typing and operator methods
//! - [`closure`]: element types and closure parameter seeding
//! - [`assign`]: scope updates for declarations, assignments and imports
//! - [`requestor`]: the consumer protocol and stock requestors
//! - [`visitor`]: the traversal engine
//! - [`diagnostics`]: ariadne rendering of unresolved references
//! - [`config`], [`error`]: run options and error types

pub mod assign;
pub mod builtins;
pub mod class_table;
pub mod closure;
pub mod config;
pub mod decl;
pub mod diagnostics;
pub mod error;
pub mod generics;
pub mod lookup;
pub mod operators;
pub mod requestor;
pub mod scope;
pub mod signature;
pub mod ty;
pub mod visitor;

use std::sync::Arc;

use gravy_ast::ModuleNode;
use tracing::debug;

pub use class_table::{ClassInfo, ClassTable};
pub use config::InferenceOptions;
pub use decl::Declaration;
pub use error::{InferError, LookupError};
pub use lookup::{
    CompilationContext, Confidence, ExprQuery, LookupContext, LookupResult, ResolverChain, TypeLookup,
    TypeLookupResult,
};
pub use requestor::{
    CollectingRequestor, CompositeRequestor, EnclosingElement, InferredNode, TypeRequestor, VisitStatus,
    VisitedNode,
};
pub use scope::{ScopeId, ScopeOwner, ScopeTree};
pub use ty::TypeDescriptor;
pub use visitor::InferenceOutcome;

use crate::visitor::Visitor;

/// Runs inference over modules against a shared library of types.
///
/// The library is shared read-only between runs; each run layers the
/// module's own classes on top of it and owns its scopes outright.
pub struct InferenceEngine {
    library: Arc<ClassTable>,
    chain: ResolverChain,
    options: InferenceOptions,
}

impl InferenceEngine {
    /// An engine over the built-in library with the standard resolvers.
    pub fn new() -> Self {
        Self::with_library(builtins::library())
    }

    /// An engine over `library`, which should include the built-ins.
    pub fn with_library(library: ClassTable) -> Self {
        InferenceEngine {
            library: Arc::new(library),
            chain: ResolverChain::default(),
            options: InferenceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InferenceOptions) -> Self {
        self.options = options;
        self
    }

    /// Put `custom` resolvers, in order, ahead of the built-in ones.
    pub fn with_resolvers(mut self, custom: Vec<Box<dyn TypeLookup>>) -> Self {
        self.chain = ResolverChain::new(custom);
        self
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    pub fn library(&self) -> &ClassTable {
        &self.library
    }

    pub fn resolver_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Infer every node of `module`, handing each to `requestor`.
    pub fn infer(
        &mut self,
        module: &ModuleNode,
        requestor: &mut dyn TypeRequestor,
    ) -> Result<InferenceOutcome, InferError> {
        let mut table = ClassTable::layered(Arc::clone(&self.library));
        table.add_module(module);

        let mut scopes = ScopeTree::new(&self.options.extra_categories);
        let top = scopes.push(
            ScopeOwner::Module {
                name: module.name.clone(),
            },
            false,
        );
        let ctx = CompilationContext {
            module,
            table: &table,
            options: &self.options,
        };
        self.chain.initialize(&ctx, top);
        debug!(module = %module.name, resolvers = ?self.chain.names(), "inference run");

        Visitor::new(module, &table, &self.chain, &self.options, requestor, scopes, top).run()
    }

    /// Infer `module` and return every delivered node alongside the outcome.
    pub fn collect(&mut self, module: &ModuleNode) -> Result<(InferenceOutcome, Vec<InferredNode>), InferError> {
        let mut collector = CollectingRequestor::new();
        let outcome = self.infer(module, &mut collector)?;
        Ok((outcome, collector.nodes))
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}
