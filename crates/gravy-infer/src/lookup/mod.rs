//! The resolver chain.
//!
//! Each [`TypeLookup`] is one strategy for classifying a node. The
//! [`ResolverChain`] asks them in order, keeps the most precise answer, and
//! stops as soon as one is at least [`Confidence::Inferred`]. The chain
//! always ends with [`SimpleTypeLookup`], which answers every node, so the
//! engine gets a result for each node it visits.

mod category;
mod members;
mod simple;

use std::fmt;

use gravy_ast::{ClassNode, Expr, ExprId, FieldNode, MethodNode, ModuleNode, Parameter, PropertyNode};
use tracing::{trace, warn};

use crate::class_table::ClassTable;
use crate::config::InferenceOptions;
use crate::decl::Declaration;
use crate::error::LookupError;
use crate::scope::{ScopeId, ScopeTree};
use crate::ty::TypeDescriptor;

pub use category::CategoryTypeLookup;
pub use members::{accessor_names, select_overload};
pub use simple::SimpleTypeLookup;
pub(crate) use simple::{implicit_receiver, literal_type};

/// How sure a resolver is. Declared most precise first, so the derived
/// ordering sorts better answers lower.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Exact,
    Inferred,
    LooselyInferred,
    Unknown,
}

impl Confidence {
    /// An answer this good ends the chain.
    pub fn terminates_chain(self) -> bool {
        self <= Confidence::Inferred
    }

    /// The more precise of the two; `self` on a tie.
    pub fn better(self, other: Confidence) -> Confidence {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Exact => "exact",
            Confidence::Inferred => "inferred",
            Confidence::LooselyInferred => "loosely-inferred",
            Confidence::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The answer for one node. Never mutated once produced; derive a new one
/// with the `with_*` methods.
#[derive(Clone, Debug)]
pub struct TypeLookupResult {
    pub ty: TypeDescriptor,
    pub declaring_type: Option<TypeDescriptor>,
    pub declaration: Option<Declaration>,
    pub confidence: Confidence,
    /// The scope the node was resolved in.
    pub scope: ScopeId,
    pub extra_doc: Option<String>,
    /// Resolved to a category (extension) method.
    pub is_extension: bool,
    /// The assignment this node is the target of.
    pub enclosing_assignment: Option<ExprId>,
}

impl TypeLookupResult {
    pub fn new(ty: TypeDescriptor, confidence: Confidence, scope: ScopeId) -> Self {
        TypeLookupResult {
            ty,
            declaring_type: None,
            declaration: None,
            confidence,
            scope,
            extra_doc: None,
            is_extension: false,
            enclosing_assignment: None,
        }
    }

    /// `Object` with `Unknown` confidence: the answer for anything unresolvable.
    pub fn unknown(scope: ScopeId) -> Self {
        Self::new(TypeDescriptor::object(), Confidence::Unknown, scope)
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        if self.declaring_type.is_none() {
            self.declaring_type = declaration.declaring_type().cloned();
        }
        self.declaration = Some(declaration);
        self
    }

    pub fn with_declaring_type(mut self, ty: TypeDescriptor) -> Self {
        self.declaring_type = Some(ty);
        self
    }

    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.extra_doc = Some(doc.into());
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.is_extension = true;
        self
    }

    pub fn with_enclosing_assignment(mut self, id: Option<ExprId>) -> Self {
        self.enclosing_assignment = id;
        self
    }
}

/// Run-wide inputs handed to every resolver once before traversal.
pub struct CompilationContext<'a> {
    pub module: &'a ModuleNode,
    pub table: &'a ClassTable,
    pub options: &'a InferenceOptions,
}

/// Where a lookup happens.
pub struct LookupContext<'a> {
    pub scopes: &'a ScopeTree,
    pub scope: ScopeId,
    pub table: &'a ClassTable,
    pub options: &'a InferenceOptions,
}

impl LookupContext<'_> {
    pub fn max_depth(&self) -> usize {
        self.options.max_generics_depth
    }
}

/// What the engine knows about an expression's surroundings when asking
/// about it.
#[derive(Clone, Debug, Default)]
pub struct ExprQuery {
    /// Type of the object expression a member name is looked up on.
    pub object_type: Option<TypeDescriptor>,
    /// The object expression is a class rather than an instance.
    pub is_static_receiver: bool,
    /// `object_type` was found by searching the implicit receivers in scope
    /// rather than written in the source.
    pub implicit_receiver: bool,
    /// Set when the node names (or is) a method call: the argument types.
    pub call_args: Option<Vec<TypeDescriptor>>,
    /// Types of already-visited children, in source order.
    pub child_types: Vec<TypeDescriptor>,
    /// The node is the target of an assignment.
    pub is_lhs: bool,
    pub enclosing_assignment: Option<ExprId>,
}

impl ExprQuery {
    pub fn on(object_type: TypeDescriptor, is_static_receiver: bool) -> Self {
        ExprQuery {
            object_type: Some(object_type),
            is_static_receiver,
            ..ExprQuery::default()
        }
    }

    pub fn with_call_args(mut self, args: Vec<TypeDescriptor>) -> Self {
        self.call_args = Some(args);
        self
    }

    pub fn with_children(mut self, child_types: Vec<TypeDescriptor>) -> Self {
        self.child_types = child_types;
        self
    }

    pub fn child(&self, index: usize) -> TypeDescriptor {
        self.child_types
            .get(index)
            .cloned()
            .unwrap_or_else(TypeDescriptor::object)
    }
}

pub type LookupResult = Result<Option<TypeLookupResult>, LookupError>;

/// One resolution strategy. Only `lookup_expr` is required; the
/// declaration lookups default to "no opinion".
pub trait TypeLookup {
    fn name(&self) -> &str;

    /// Called once per run before traversal starts.
    fn initialize(&mut self, _ctx: &CompilationContext<'_>, _top: ScopeId) {}

    fn lookup_expr(&self, node: &Expr, query: &ExprQuery, ctx: &LookupContext<'_>) -> LookupResult;

    fn lookup_class(&self, _node: &ClassNode, _ctx: &LookupContext<'_>) -> LookupResult {
        Ok(None)
    }

    fn lookup_field(&self, _node: &FieldNode, _ctx: &LookupContext<'_>) -> LookupResult {
        Ok(None)
    }

    fn lookup_property(&self, _node: &PropertyNode, _ctx: &LookupContext<'_>) -> LookupResult {
        Ok(None)
    }

    fn lookup_method(&self, _node: &MethodNode, _ctx: &LookupContext<'_>) -> LookupResult {
        Ok(None)
    }

    fn lookup_parameter(&self, _node: &Parameter, _ctx: &LookupContext<'_>) -> LookupResult {
        Ok(None)
    }
}

pub struct ResolverChain {
    resolvers: Vec<Box<dyn TypeLookup>>,
}

impl ResolverChain {
    /// `custom` resolvers in the caller's order, then the category
    /// resolver, then the catch-all.
    pub fn new(custom: Vec<Box<dyn TypeLookup>>) -> Self {
        let mut resolvers = custom;
        resolvers.push(Box::new(CategoryTypeLookup));
        resolvers.push(Box::new(SimpleTypeLookup));
        ResolverChain { resolvers }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn initialize(&mut self, ctx: &CompilationContext<'_>, top: ScopeId) {
        for resolver in &mut self.resolvers {
            resolver.initialize(ctx, top);
        }
    }

    /// Ask each resolver in turn. Errors are logged and count as no
    /// answer. Ties keep the earlier answer.
    fn arbitrate<F>(&self, what: &str, scope: ScopeId, ask: F) -> TypeLookupResult
    where
        F: Fn(&dyn TypeLookup) -> LookupResult,
    {
        let mut best: Option<TypeLookupResult> = None;
        for resolver in &self.resolvers {
            match ask(resolver.as_ref()) {
                Ok(Some(result)) => {
                    trace!(
                        resolver = resolver.name(),
                        node = what,
                        ty = %result.ty,
                        confidence = %result.confidence,
                        "candidate"
                    );
                    best = Some(match best {
                        Some(current) if current.confidence <= result.confidence => current,
                        _ => result,
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(resolver = resolver.name(), node = what, %err, "resolver failed");
                }
            }
            if best.as_ref().is_some_and(|b| b.confidence.terminates_chain()) {
                break;
            }
        }
        best.unwrap_or_else(|| TypeLookupResult::unknown(scope))
    }

    pub fn lookup_expr(&self, node: &Expr, query: &ExprQuery, ctx: &LookupContext<'_>) -> TypeLookupResult {
        let what = node.describe();
        self.arbitrate(&what, ctx.scope, |r| r.lookup_expr(node, query, ctx))
    }

    pub fn lookup_class(&self, node: &ClassNode, ctx: &LookupContext<'_>) -> TypeLookupResult {
        self.arbitrate(&node.name, ctx.scope, |r| r.lookup_class(node, ctx))
    }

    pub fn lookup_field(&self, node: &FieldNode, ctx: &LookupContext<'_>) -> TypeLookupResult {
        self.arbitrate(&node.name, ctx.scope, |r| r.lookup_field(node, ctx))
    }

    pub fn lookup_property(&self, node: &PropertyNode, ctx: &LookupContext<'_>) -> TypeLookupResult {
        self.arbitrate(&node.name, ctx.scope, |r| r.lookup_property(node, ctx))
    }

    pub fn lookup_method(&self, node: &MethodNode, ctx: &LookupContext<'_>) -> TypeLookupResult {
        self.arbitrate(&node.name, ctx.scope, |r| r.lookup_method(node, ctx))
    }

    pub fn lookup_parameter(&self, node: &Parameter, ctx: &LookupContext<'_>) -> TypeLookupResult {
        self.arbitrate(&node.name, ctx.scope, |r| r.lookup_parameter(node, ctx))
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
