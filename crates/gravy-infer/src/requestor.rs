//! The consumer side of a run.
//!
//! The engine hands every inferred node to a [`TypeRequestor`] and obeys
//! the [`VisitStatus`] it returns.

use gravy_ast::{ClassNode, Expr, ExprId, FieldNode, MethodNode, Parameter, PropertyNode, Span};
use serde::Serialize;

use crate::lookup::TypeLookupResult;
use crate::ty::TypeDescriptor;

/// What the engine should do after delivering a node. Ordered by
/// severity; merging keeps the most severe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisitStatus {
    Continue,
    /// Skip the node's descendants and carry on with its siblings.
    CancelBranch,
    /// Abandon the rest of the enclosing member.
    CancelMember,
    /// Abandon the whole run.
    StopVisit,
}

impl VisitStatus {
    pub fn merge(self, other: VisitStatus) -> VisitStatus {
        self.max(other)
    }
}

/// The node a result belongs to.
#[derive(Copy, Clone, Debug)]
pub enum VisitedNode<'a> {
    Class(&'a ClassNode),
    Field(&'a FieldNode),
    Property(&'a PropertyNode),
    /// A method or constructor.
    Method(&'a MethodNode),
    Parameter(&'a Parameter),
    Expr(&'a Expr),
}

impl VisitedNode<'_> {
    pub fn span(&self) -> Option<Span> {
        match self {
            VisitedNode::Class(n) => n.span,
            VisitedNode::Field(n) => n.span,
            VisitedNode::Property(n) => n.span,
            VisitedNode::Method(n) => n.span,
            VisitedNode::Parameter(n) => n.span,
            VisitedNode::Expr(e) => e.span,
        }
        .filter(|s| s.is_valid())
    }

    pub fn expr_id(&self) -> Option<ExprId> {
        match self {
            VisitedNode::Expr(e) => Some(e.id),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VisitedNode::Class(_) => "class",
            VisitedNode::Field(_) => "field",
            VisitedNode::Property(_) => "property",
            VisitedNode::Method(_) => "method",
            VisitedNode::Parameter(_) => "parameter",
            VisitedNode::Expr(_) => "expr",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            VisitedNode::Class(n) => n.name.clone(),
            VisitedNode::Field(n) => n.name.clone(),
            VisitedNode::Property(n) => n.name.clone(),
            VisitedNode::Method(n) => n.name.clone(),
            VisitedNode::Parameter(n) => n.name.clone(),
            VisitedNode::Expr(e) => e.describe(),
        }
    }
}

/// The member (or type) a node sits in.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnclosingElement {
    Module { name: String },
    Type { name: String },
    Method { declaring: String, name: String },
    Field { declaring: String, name: String },
    Initializer { declaring: String },
}

impl EnclosingElement {
    pub fn label(&self) -> String {
        match self {
            EnclosingElement::Module { name } | EnclosingElement::Type { name } => name.clone(),
            EnclosingElement::Method { declaring, name } | EnclosingElement::Field { declaring, name } => {
                format!("{}.{}", declaring, name)
            }
            EnclosingElement::Initializer { declaring } => format!("{}.<init>", declaring),
        }
    }
}

pub trait TypeRequestor {
    fn accept(
        &mut self,
        node: VisitedNode<'_>,
        result: &TypeLookupResult,
        enclosing: &EnclosingElement,
    ) -> VisitStatus;
}

impl<F> TypeRequestor for F
where
    F: FnMut(VisitedNode<'_>, &TypeLookupResult, &EnclosingElement) -> VisitStatus,
{
    fn accept(
        &mut self,
        node: VisitedNode<'_>,
        result: &TypeLookupResult,
        enclosing: &EnclosingElement,
    ) -> VisitStatus {
        self(node, result, enclosing)
    }
}

/// Forwards every node to each requestor in turn; the most severe status
/// wins.
#[derive(Default)]
pub struct CompositeRequestor<'r> {
    requestors: Vec<Box<dyn TypeRequestor + 'r>>,
}

impl<'r> CompositeRequestor<'r> {
    pub fn new() -> Self {
        CompositeRequestor {
            requestors: Vec::new(),
        }
    }

    pub fn with(mut self, requestor: impl TypeRequestor + 'r) -> Self {
        self.requestors.push(Box::new(requestor));
        self
    }
}

impl TypeRequestor for CompositeRequestor<'_> {
    fn accept(
        &mut self,
        node: VisitedNode<'_>,
        result: &TypeLookupResult,
        enclosing: &EnclosingElement,
    ) -> VisitStatus {
        self.requestors
            .iter_mut()
            .fold(VisitStatus::Continue, |status, r| {
                status.merge(r.accept(node, result, enclosing))
            })
    }
}

/// One delivered node, flattened for output.
#[derive(Clone, Debug, Serialize)]
pub struct InferredNode {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(rename = "type")]
    pub ty: String,
    pub confidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub extension: bool,
    pub enclosing: String,
}

impl InferredNode {
    pub fn new(node: VisitedNode<'_>, result: &TypeLookupResult, enclosing: &EnclosingElement) -> Self {
        InferredNode {
            kind: node.kind(),
            id: node.expr_id().map(|id| id.0),
            label: node.describe(),
            span: node.span(),
            ty: result.ty.to_string(),
            confidence: result.confidence.to_string(),
            declaring_type: result.declaring_type.as_ref().map(TypeDescriptor::to_string),
            declaration: result.declaration.as_ref().map(|d| d.to_string()),
            extension: result.is_extension,
            enclosing: enclosing.label(),
        }
    }
}

/// Records everything and never cancels.
#[derive(Debug, Default)]
pub struct CollectingRequestor {
    pub nodes: Vec<InferredNode>,
}

impl CollectingRequestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first recorded expression with this id.
    pub fn expr(&self, id: ExprId) -> Option<&InferredNode> {
        self.nodes.iter().find(|n| n.id == Some(id.0))
    }
}

impl TypeRequestor for CollectingRequestor {
    fn accept(
        &mut self,
        node: VisitedNode<'_>,
        result: &TypeLookupResult,
        enclosing: &EnclosingElement,
    ) -> VisitStatus {
        self.nodes.push(InferredNode::new(node, result, enclosing));
        VisitStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::Confidence;
    use crate::scope::{ScopeOwner, ScopeTree};
    use gravy_ast::AstBuilder;

    #[test]
    fn severity_order() {
        assert!(VisitStatus::Continue < VisitStatus::CancelBranch);
        assert!(VisitStatus::CancelBranch < VisitStatus::CancelMember);
        assert!(VisitStatus::CancelMember < VisitStatus::StopVisit);
        assert_eq!(
            VisitStatus::CancelBranch.merge(VisitStatus::Continue),
            VisitStatus::CancelBranch
        );
        assert_eq!(
            VisitStatus::CancelMember.merge(VisitStatus::StopVisit),
            VisitStatus::StopVisit
        );
    }

    #[test]
    fn composite_calls_everyone_and_keeps_the_worst() {
        let mut scopes = ScopeTree::new(&[]);
        let scope = scopes.push(ScopeOwner::Block, false);
        let b = AstBuilder::new();
        let expr = b.int(1);
        let result = TypeLookupResult::new(TypeDescriptor::int(), Confidence::Exact, scope);
        let enclosing = EnclosingElement::Module { name: "m".into() };

        let mut seen = 0;
        let mut collected = CollectingRequestor::new();
        {
            let mut composite = CompositeRequestor::new()
                .with(|_: VisitedNode<'_>, _: &TypeLookupResult, _: &EnclosingElement| {
                    seen += 1;
                    VisitStatus::CancelBranch
                })
                .with(|n: VisitedNode<'_>, r: &TypeLookupResult, e: &EnclosingElement| {
                    collected.accept(n, r, e)
                });
            let status = composite.accept(VisitedNode::Expr(&expr), &result, &enclosing);
            assert_eq!(status, VisitStatus::CancelBranch);
        }
        assert_eq!(seen, 1);
        assert_eq!(collected.nodes.len(), 1);
        assert_eq!(collected.nodes[0].ty, "int");
        assert_eq!(collected.nodes[0].confidence, "exact");
        assert_eq!(collected.nodes[0].enclosing, "m");
    }
}
