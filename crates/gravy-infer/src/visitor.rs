//! The traversal engine.
//!
//! Declarations are visited top-down: module, then each type, then the
//! type's members in source order. Every node is resolved through the
//! [`ResolverChain`] and handed to the requestor.
//!
//! Expressions need their children's types before they can be resolved, but
//! the requestor must see a parent before its children so that
//! `CancelBranch` can suppress a subtree. Each statement-level expression is
//! therefore resolved completely first, with one slot per node reserved in
//! pre-order, and the slots are delivered once the statement is done. A
//! cancelled slot skips every slot reserved beneath it. Inferred types are
//! recorded regardless of cancellation, so parents always see their
//! children's types.
//!
//! Binding changes made while a statement is resolved are journaled against
//! the slot of the node that made them. When the statement is flushed, the
//! changes of every slot that was skipped or never reached are undone, so a
//! cancelled subtree leaves no trace in later statements.
//!
//! Cancellation that leaves a member or the whole run travels back up as
//! `Err(Unwind)`; every frame pushed on the way down is popped on the way
//! out.

use std::mem;

use gravy_ast::{
    BinaryOp, Block, ClassNode, ClosureExpr, Declaration, Expr, ExprId, ExprKind, FieldNode, Initializer, Literal,
    MethodNode, ModuleNode, Parameter, PropertyNode, Span, Stmt, SCRIPT_RUN_METHOD,
};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::assign::{record_assignment, record_declaration, record_import};
use crate::class_table::{ClassInfo, ClassTable};
use crate::closure::{delegation, element_type, seed_params};
use crate::config::InferenceOptions;
use crate::error::InferError;
use crate::lookup::{implicit_receiver, literal_type, Confidence, ExprQuery, LookupContext, ResolverChain, TypeLookupResult};
use crate::requestor::{EnclosingElement, TypeRequestor, VisitStatus, VisitedNode};
use crate::scope::{CallAndType, ClosureFrame, ResolveStrategy, ScopeId, ScopeOwner, ScopeTree, VariableInfo};
use crate::ty::{names, TypeDescriptor};

/// Why a traversal is unwinding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Unwind {
    /// Abandon the current member and carry on with the next.
    Member,
    /// Abandon the run.
    Stop,
}

pub(crate) type Visit<T = ()> = Result<T, Unwind>;

/// What a finished run produced.
#[derive(Clone, Debug)]
pub struct InferenceOutcome {
    /// The most severe status any requestor returned.
    pub status: VisitStatus,
    /// The inferred type of every expression that was visited.
    pub types: FxHashMap<ExprId, TypeDescriptor>,
}

impl InferenceOutcome {
    pub fn type_of(&self, id: ExprId) -> Option<&TypeDescriptor> {
        self.types.get(&id)
    }

    /// Whether a requestor cut the run short.
    pub fn stopped(&self) -> bool {
        self.status == VisitStatus::StopVisit
    }
}

/// A reserved delivery slot. `end` is the index just past the slots
/// reserved for the node's descendants.
struct Pending<'a> {
    node: VisitedNode<'a>,
    result: Option<TypeLookupResult>,
    end: usize,
}

/// An enclosing composite expression.
struct ExprContext {
    id: ExprId,
    assignment: bool,
}

/// A closure literal about to be visited as argument `position` of the
/// innermost open call.
struct ClosureSite {
    position: usize,
    prior_args: Vec<TypeDescriptor>,
}

/// A type member, for ordering.
#[derive(Copy, Clone)]
enum Member<'a> {
    Field(&'a FieldNode),
    Property(&'a PropertyNode),
    Method(&'a MethodNode),
    Initializer(&'a Initializer),
}

impl Member<'_> {
    fn span(&self) -> Option<Span> {
        match self {
            Member::Field(n) => n.span,
            Member::Property(n) => n.span,
            Member::Method(n) => n.span,
            Member::Initializer(n) => n.span,
        }
        .filter(|s| s.is_valid())
    }
}

/// Members in source order; members without a usable position keep their
/// relative order and come last.
fn members_in_order(class: &ClassNode) -> Vec<Member<'_>> {
    let mut members: Vec<Member<'_>> = class
        .fields
        .iter()
        .map(Member::Field)
        .chain(class.properties.iter().map(Member::Property))
        .chain(class.constructors.iter().map(Member::Method))
        .chain(class.methods.iter().map(Member::Method))
        .chain(class.initializers.iter().map(Member::Initializer))
        .collect();
    members.sort_by_key(|m| match m.span() {
        Some(span) => (false, span.start),
        None => (true, 0),
    });
    members
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Constant(Literal::Null))
}

/// Argument types assumed before the arguments themselves are visited.
fn provisional_arg(arg: &Expr) -> TypeDescriptor {
    match &arg.kind {
        ExprKind::Closure(_) => TypeDescriptor::class(names::CLOSURE),
        ExprKind::Constant(lit) => literal_type(lit),
        ExprKind::GString { .. } => TypeDescriptor::string(),
        _ => TypeDescriptor::object(),
    }
}

/// Expressions whose children are classified relative to them.
fn composite(kind: &ExprKind) -> Option<bool> {
    match kind {
        ExprKind::Binary { op, .. } => Some(op.is_assignment()),
        ExprKind::Declaration(_) => Some(true),
        ExprKind::Property { .. }
        | ExprKind::Attribute { .. }
        | ExprKind::MethodCall { .. }
        | ExprKind::StaticMethodCall { .. }
        | ExprKind::ConstructorCall { .. }
        | ExprKind::Ternary { .. }
        | ExprKind::Elvis { .. }
        | ExprKind::List(_)
        | ExprKind::Map(_)
        | ExprKind::Range { .. } => Some(false),
        _ => None,
    }
}

pub(crate) struct Visitor<'a, 'r> {
    module: &'a ModuleNode,
    table: &'a ClassTable,
    chain: &'a ResolverChain,
    options: &'a InferenceOptions,
    requestor: &'r mut dyn TypeRequestor,
    scopes: ScopeTree,
    top: ScopeId,
    enclosing: EnclosingElement,
    pending: Vec<Pending<'a>>,
    /// Expression nesting below the current statement.
    depth: usize,
    contexts: Vec<ExprContext>,
    closure_site: Option<ClosureSite>,
    /// Types of `return` statements, one entry per open closure.
    returns: Vec<Vec<TypeDescriptor>>,
    types: FxHashMap<ExprId, TypeDescriptor>,
    status: VisitStatus,
}

impl<'a, 'r> Visitor<'a, 'r> {
    /// `scopes` must already have the module frame `top` open.
    pub(crate) fn new(
        module: &'a ModuleNode,
        table: &'a ClassTable,
        chain: &'a ResolverChain,
        options: &'a InferenceOptions,
        requestor: &'r mut dyn TypeRequestor,
        scopes: ScopeTree,
        top: ScopeId,
    ) -> Self {
        Visitor {
            module,
            table,
            chain,
            options,
            requestor,
            scopes,
            top,
            enclosing: EnclosingElement::Module {
                name: module.name.clone(),
            },
            pending: Vec::new(),
            depth: 0,
            contexts: Vec::new(),
            closure_site: None,
            returns: Vec::new(),
            types: FxHashMap::default(),
            status: VisitStatus::Continue,
        }
    }

    pub(crate) fn run(mut self) -> Result<InferenceOutcome, InferError> {
        if let Err(unwind) = self.module_body() {
            debug!(?unwind, "traversal cut short");
        }
        self.scopes.pop();

        let scope_depth = self.scopes.open_frames();
        let context_depth = self.contexts.len() + self.scopes.open_calls();
        if scope_depth > 0 || context_depth > 0 {
            if self.options.verify_stacks {
                return Err(InferError::UnbalancedStacks {
                    scope_depth,
                    context_depth,
                });
            }
            warn!(scope_depth, context_depth, "unbalanced stacks at end of run");
            while self.scopes.pop().is_some() {}
            while self.scopes.pop_call().is_some() {}
            self.contexts.clear();
        }

        Ok(InferenceOutcome {
            status: self.status,
            types: self.types,
        })
    }

    // ── Plumbing ─────────────────────────────────────────────────────

    fn scope(&self) -> ScopeId {
        self.scopes.current().unwrap_or(self.top)
    }

    fn ctx(&self) -> LookupContext<'_> {
        LookupContext {
            scopes: &self.scopes,
            scope: self.scope(),
            table: self.table,
            options: self.options,
        }
    }

    fn max_depth(&self) -> usize {
        self.options.max_generics_depth
    }

    fn lookup(&self, node: &Expr, query: &ExprQuery) -> TypeLookupResult {
        let ctx = self.ctx();
        self.chain.lookup_expr(node, query, &ctx)
    }

    fn deliver(&mut self, node: VisitedNode<'_>, result: &TypeLookupResult) -> Visit<VisitStatus> {
        let status = self.requestor.accept(node, result, &self.enclosing);
        trace!(node = %node.describe(), ty = %result.ty, confidence = %result.confidence, ?status, "deliver");
        self.status = self.status.merge(status);
        match status {
            VisitStatus::Continue | VisitStatus::CancelBranch => Ok(status),
            VisitStatus::CancelMember => Err(Unwind::Member),
            VisitStatus::StopVisit => Err(Unwind::Stop),
        }
    }

    fn reserve(&mut self, node: VisitedNode<'a>) -> usize {
        self.pending.push(Pending {
            node,
            result: None,
            end: 0,
        });
        self.pending.len() - 1
    }

    /// Fill a slot whose descendants are everything reserved since.
    fn fill(&mut self, slot: usize, result: TypeLookupResult) {
        let end = self.pending.len();
        if let Some(p) = self.pending.get_mut(slot) {
            p.result = Some(result);
            p.end = end;
        }
    }

    /// Fill a slot that has no descendants.
    fn fill_leaf(&mut self, slot: usize, result: TypeLookupResult) {
        if let Some(p) = self.pending.get_mut(slot) {
            p.result = Some(result);
            p.end = slot + 1;
        }
    }

    /// A node without children: buffered inside an expression, delivered
    /// straight away otherwise.
    fn leaf(&mut self, node: VisitedNode<'a>, result: TypeLookupResult) -> Visit {
        if self.depth > 0 {
            let slot = self.reserve(node);
            self.fill_leaf(slot, result);
            Ok(())
        } else {
            self.deliver(node, &result).map(drop)
        }
    }

    /// Deliver the buffered slots of a statement, then undo the binding
    /// changes of every slot that was not delivered.
    fn flush(&mut self) -> Visit {
        let pending = mem::take(&mut self.pending);
        let mut delivered = vec![false; pending.len()];
        let mut outcome = Ok(());
        let mut i = 0;
        while i < pending.len() {
            let p = &pending[i];
            let Some(result) = &p.result else {
                delivered[i] = true;
                i += 1;
                continue;
            };
            match self.deliver(p.node, result) {
                Ok(status) => {
                    delivered[i] = true;
                    i = match status {
                        VisitStatus::CancelBranch => p.end.max(i + 1),
                        _ => i + 1,
                    };
                }
                Err(unwind) => {
                    delivered[i] = true;
                    for rest in &pending[i + 1..] {
                        if let VisitedNode::Expr(e) = rest.node {
                            self.types.remove(&e.id);
                        }
                    }
                    outcome = Err(unwind);
                    break;
                }
            }
        }
        let changes = self.scopes.close_journal();
        self.scopes
            .revert(&changes, |slot| delivered.get(slot).copied().unwrap_or(true));
        outcome
    }

    fn innermost_assignment(&self) -> Option<ExprId> {
        self.contexts.iter().rev().find(|c| c.assignment).map(|c| c.id)
    }

    fn is_static_expr(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Class(_) => true,
            ExprKind::Variable(name) => self
                .scopes
                .lookup(self.scope(), name)
                .is_some_and(|info| info.type_alias),
            _ => false,
        }
    }

    fn this_type(&self) -> TypeDescriptor {
        self.scopes
            .this_type(self.scope())
            .cloned()
            .unwrap_or_else(TypeDescriptor::object)
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn module_body(&mut self) -> Visit {
        let module = self.module;
        for import in &module.imports {
            record_import(&mut self.scopes, self.table, self.top, import);
        }
        for class in &module.classes {
            match self.class(class) {
                Ok(()) => {}
                Err(Unwind::Member) => debug!(class = %class.name, "class abandoned"),
                Err(Unwind::Stop) => return Err(Unwind::Stop),
            }
        }
        Ok(())
    }

    fn class(&mut self, class: &'a ClassNode) -> Visit {
        let ty = self
            .table
            .get(&class.name)
            .map(ClassInfo::generic_type)
            .unwrap_or_else(|| TypeDescriptor::class(class.name.clone()));
        let saved = mem::replace(
            &mut self.enclosing,
            EnclosingElement::Type {
                name: class.name.clone(),
            },
        );
        self.scopes.push(
            ScopeOwner::Type {
                ty,
                is_script: class.is_script,
            },
            false,
        );
        let r = self.class_body(class);
        self.scopes.pop();
        self.enclosing = saved;
        r
    }

    fn class_body(&mut self, class: &'a ClassNode) -> Visit {
        let result = {
            let ctx = self.ctx();
            self.chain.lookup_class(class, &ctx)
        };
        if self.deliver(VisitedNode::Class(class), &result)? == VisitStatus::CancelBranch {
            return Ok(());
        }
        for member in members_in_order(class) {
            match self.member(class, member) {
                Ok(()) => {}
                Err(Unwind::Member) => debug!(class = %class.name, "member abandoned"),
                Err(Unwind::Stop) => return Err(Unwind::Stop),
            }
        }
        for inner in &class.inner_classes {
            match self.class(inner) {
                Ok(()) => {}
                Err(Unwind::Member) => debug!(class = %inner.name, "class abandoned"),
                Err(Unwind::Stop) => return Err(Unwind::Stop),
            }
        }
        Ok(())
    }

    fn member(&mut self, class: &'a ClassNode, member: Member<'a>) -> Visit {
        let declaring = self.this_type();
        let (owner, is_static, enclosing) = match member {
            Member::Field(f) => (
                ScopeOwner::Field {
                    declaring,
                    name: f.name.clone(),
                },
                f.modifiers.is_static,
                EnclosingElement::Field {
                    declaring: class.name.clone(),
                    name: f.name.clone(),
                },
            ),
            Member::Property(p) => (
                ScopeOwner::Field {
                    declaring,
                    name: p.name.clone(),
                },
                p.modifiers.is_static,
                EnclosingElement::Field {
                    declaring: class.name.clone(),
                    name: p.name.clone(),
                },
            ),
            Member::Method(m) => (
                ScopeOwner::Method {
                    declaring,
                    name: m.name.clone(),
                    is_script_body: class.is_script && m.name == SCRIPT_RUN_METHOD,
                },
                m.modifiers.is_static,
                EnclosingElement::Method {
                    declaring: class.name.clone(),
                    name: m.name.clone(),
                },
            ),
            Member::Initializer(init) => (
                ScopeOwner::Initializer { declaring },
                init.is_static,
                EnclosingElement::Initializer {
                    declaring: class.name.clone(),
                },
            ),
        };

        let saved = mem::replace(&mut self.enclosing, enclosing);
        self.scopes.push(owner, is_static);
        let r = match member {
            Member::Field(f) => self.field(f),
            Member::Property(p) => self.property(p),
            Member::Method(m) => self.method(m),
            Member::Initializer(init) => self.stmts(&init.body.stmts),
        };
        self.scopes.pop();
        self.enclosing = saved;
        r
    }

    fn field(&mut self, field: &'a FieldNode) -> Visit {
        let result = {
            let ctx = self.ctx();
            self.chain.lookup_field(field, &ctx)
        };
        if self.deliver(VisitedNode::Field(field), &result)? == VisitStatus::CancelBranch {
            return Ok(());
        }
        if let Some(init) = &field.initializer {
            self.root(init)?;
        }
        Ok(())
    }

    fn property(&mut self, property: &'a PropertyNode) -> Visit {
        let result = {
            let ctx = self.ctx();
            self.chain.lookup_property(property, &ctx)
        };
        if self.deliver(VisitedNode::Property(property), &result)? == VisitStatus::CancelBranch {
            return Ok(());
        }
        if let Some(init) = &property.initializer {
            self.root(init)?;
        }
        Ok(())
    }

    fn method(&mut self, method: &'a MethodNode) -> Visit {
        let result = {
            let ctx = self.ctx();
            self.chain.lookup_method(method, &ctx)
        };
        if self.deliver(VisitedNode::Method(method), &result)? == VisitStatus::CancelBranch {
            return Ok(());
        }
        let scope = self.scope();
        let declaring = self.scopes.this_type(scope).cloned();
        for param in &method.params {
            let info = match &param.ty {
                Some(ty) => VariableInfo::new(TypeDescriptor::from(ty), declaring.clone()).explicit(),
                None => VariableInfo::new(TypeDescriptor::object(), declaring.clone()),
            };
            self.scopes.bind(scope, param.name.clone(), info.with_span(param.span));
            self.parameter(param)?;
            if let Some(default) = &param.default_value {
                self.root(default)?;
            }
        }
        match &method.body {
            Some(body) => self.stmts(&body.stmts),
            None => Ok(()),
        }
    }

    /// Report a parameter already bound in the current frame.
    fn parameter(&mut self, param: &'a Parameter) -> Visit {
        let result = {
            let ctx = self.ctx();
            self.chain.lookup_parameter(param, &ctx)
        };
        self.leaf(VisitedNode::Parameter(param), result)
    }

    // ── Statements ───────────────────────────────────────────────────

    fn stmts(&mut self, stmts: &'a [Stmt]) -> Visit {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn scoped_block(&mut self, block: &'a Block) -> Visit {
        self.scopes.push(ScopeOwner::Block, false);
        let r = self.stmts(&block.stmts);
        self.scopes.pop();
        r
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> Visit {
        match stmt {
            Stmt::Expr(expr) => self.root(expr).map(drop),
            Stmt::Block(block) => self.scoped_block(block),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                self.root(condition)?;
                self.scoped_block(then_block)?;
                match else_block {
                    Some(block) => self.scoped_block(block),
                    None => Ok(()),
                }
            }
            Stmt::While { condition, body } => {
                self.root(condition)?;
                self.scoped_block(body)
            }
            Stmt::ForIn {
                var,
                collection,
                body,
            } => {
                let collection_ty = self.root(collection)?;
                let scope = self.scopes.push(ScopeOwner::Block, false);
                let r = self.for_in(scope, var, &collection_ty, body);
                self.scopes.pop();
                r
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push(ScopeOwner::Block, false);
                let r = self.classic_for(init.as_ref(), condition.as_ref(), update.as_ref(), body);
                self.scopes.pop();
                r
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.scoped_block(body)?;
                for catch in catches {
                    let scope = self.scopes.push(ScopeOwner::Block, false);
                    let r = self.catch(scope, &catch.param, &catch.body);
                    self.scopes.pop();
                    r?;
                }
                match finally {
                    Some(block) => self.scoped_block(block),
                    None => Ok(()),
                }
            }
            Stmt::Switch {
                subject,
                cases,
                default,
            } => {
                self.root(subject)?;
                for case in cases {
                    self.root(&case.value)?;
                    self.scoped_block(&case.body)?;
                }
                match default {
                    Some(block) => self.scoped_block(block),
                    None => Ok(()),
                }
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    let ty = self.root(value)?;
                    if let Some(returns) = self.returns.last_mut() {
                        returns.push(ty);
                    }
                }
                Ok(())
            }
            Stmt::Throw(expr) => self.root(expr).map(drop),
            Stmt::Assert { condition, message } => {
                self.root(condition)?;
                match message {
                    Some(message) => self.root(message).map(drop),
                    None => Ok(()),
                }
            }
            Stmt::Break | Stmt::Continue => Ok(()),
        }
    }

    fn for_in(&mut self, scope: ScopeId, var: &'a Parameter, collection: &TypeDescriptor, body: &'a Block) -> Visit {
        let declaring = self.scopes.this_type(scope).cloned();
        let info = match &var.ty {
            Some(ty) => VariableInfo::new(TypeDescriptor::from(ty), declaring).explicit(),
            None => {
                let element = element_type(self.table, collection, self.max_depth());
                VariableInfo::new(element, declaring)
            }
        };
        self.scopes.bind(scope, var.name.clone(), info.with_span(var.span));
        self.parameter(var)?;
        self.stmts(&body.stmts)
    }

    fn classic_for(
        &mut self,
        init: Option<&'a Expr>,
        condition: Option<&'a Expr>,
        update: Option<&'a Expr>,
        body: &'a Block,
    ) -> Visit {
        for expr in [init, condition, update].into_iter().flatten() {
            self.root(expr)?;
        }
        self.stmts(&body.stmts)
    }

    fn catch(&mut self, scope: ScopeId, param: &'a Parameter, body: &'a Block) -> Visit {
        let declaring = self.scopes.this_type(scope).cloned();
        let ty = param
            .ty
            .as_ref()
            .map(TypeDescriptor::from)
            .unwrap_or_else(|| TypeDescriptor::class("java.lang.Exception"));
        self.scopes
            .bind(scope, param.name.clone(), VariableInfo::new(ty, declaring).explicit().with_span(param.span));
        self.parameter(param)?;
        self.stmts(&body.stmts)
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Resolve a statement-level expression and, outside any enclosing
    /// expression, deliver everything it produced.
    fn root(&mut self, expr: &'a Expr) -> Visit<TypeDescriptor> {
        if self.depth > 0 {
            return self.expr(expr, false);
        }
        self.scopes.open_journal();
        let ty = match self.expr(expr, false) {
            Ok(ty) => ty,
            Err(unwind) => {
                self.pending.clear();
                self.scopes.close_journal();
                return Err(unwind);
            }
        };
        self.flush()?;
        Ok(ty)
    }

    fn expr(&mut self, expr: &'a Expr, lhs: bool) -> Visit<TypeDescriptor> {
        self.depth += 1;
        let slot = self.reserve(VisitedNode::Expr(expr));
        let outer_tag = self.scopes.set_journal_tag(Some(slot));
        let context = composite(&expr.kind);
        if let Some(assignment) = context {
            self.contexts.push(ExprContext {
                id: expr.id,
                assignment,
            });
        }
        let r = self.expr_kind(expr, lhs);
        if context.is_some() {
            self.contexts.pop();
        }
        self.scopes.set_journal_tag(outer_tag);
        self.depth -= 1;

        let result = r?;
        let ty = result.ty.clone();
        trace!(id = expr.id.0, node = %expr.describe(), ty = %ty, "inferred");
        self.types.insert(expr.id, ty.clone());
        self.fill(slot, result);
        Ok(ty)
    }

    /// Resolve a method or property name against the query of its parent.
    fn member_name(&mut self, name: &'a Expr, query: &ExprQuery) {
        let slot = self.reserve(VisitedNode::Expr(name));
        let result = self.lookup(name, query);
        self.types.insert(name.id, result.ty.clone());
        self.fill_leaf(slot, result);
    }

    fn children(&mut self, exprs: impl IntoIterator<Item = &'a Expr>) -> Visit<Vec<TypeDescriptor>> {
        exprs.into_iter().map(|e| self.expr(e, false)).collect()
    }

    fn expr_kind(&mut self, expr: &'a Expr, lhs: bool) -> Visit<TypeLookupResult> {
        let plain = |children: Vec<TypeDescriptor>| ExprQuery::default().with_children(children);
        let result = match &expr.kind {
            ExprKind::Constant(_) | ExprKind::Class(_) => self.lookup(expr, &ExprQuery::default()),
            ExprKind::GString { values, .. } => {
                let types = self.children(values)?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Variable(name) => self.variable(expr, name, lhs),
            ExprKind::Property {
                object,
                property,
                spread,
                ..
            } => self.property_access(expr, object, property, *spread, lhs)?,
            ExprKind::Attribute { object, attribute } => {
                self.property_access(expr, object, attribute, false, lhs)?
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
                implicit_this,
                spread,
                ..
            } => self.method_call(expr, receiver, method, args, *implicit_this, *spread)?,
            ExprKind::StaticMethodCall { owner, method, args } => {
                let owner = TypeDescriptor::from(owner);
                let call = self.call_frame(expr, method, owner.clone(), owner.clone(), None, args);
                let types = self.call_args(call, args)?;
                let query = ExprQuery::on(owner, true).with_call_args(types);
                self.lookup(expr, &query)
            }
            ExprKind::ConstructorCall { ty, args } => {
                let ty = TypeDescriptor::from(ty);
                let call = self.call_frame(expr, "<init>", ty.clone(), ty.erasure(), None, args);
                let types = self.call_args(call, args)?;
                self.lookup(expr, &ExprQuery::default().with_call_args(types))
            }
            ExprKind::MethodPointer { object, method } => {
                let object_ty = self.expr(object, false)?;
                let query = ExprQuery::on(object_ty.clone(), self.is_static_expr(object)).with_children(vec![object_ty]);
                self.member_name(method, &query);
                self.lookup(expr, &query)
            }
            ExprKind::Binary { op, left, right } => self.binary(expr, *op, left, right)?,
            ExprKind::Unary { operand, .. } => {
                let types = self.children([operand.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let types = self.children([condition.as_ref(), then_expr.as_ref(), else_expr.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Elvis { value, fallback } => {
                let types = self.children([value.as_ref(), fallback.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Cast { expr: inner, .. } => {
                let types = self.children([inner.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::List(items) => {
                let types = self.children(items)?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Map(entries) => {
                let types = self.children(entries.iter().flat_map(|e| [&e.key, &e.value]))?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Range { from, to, .. } => {
                let types = self.children([from.as_ref(), to.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Spread(inner) => {
                let types = self.children([inner.as_ref()])?;
                self.lookup(expr, &plain(types))
            }
            ExprKind::Declaration(decl) => self.declaration(expr, decl)?,
            ExprKind::Closure(closure) => {
                let returns = self.closure(expr, closure)?;
                self.lookup(expr, &ExprQuery::default())
                    .with_type(TypeDescriptor::closure_of(returns))
            }
        };
        Ok(result)
    }

    fn variable(&mut self, expr: &Expr, name: &str, lhs: bool) -> TypeLookupResult {
        let scope = self.scope();
        let mut query = ExprQuery {
            is_lhs: lhs,
            enclosing_assignment: if lhs { self.innermost_assignment() } else { None },
            ..ExprQuery::default()
        };
        if name != "this" && name != "super" && self.scopes.lookup(scope, name).is_none() {
            let ctx = self.ctx();
            query.object_type = implicit_receiver(&ctx, name, false);
            query.is_static_receiver = self.scopes.is_static(scope);
            query.implicit_receiver = true;
        }
        self.lookup(expr, &query)
    }

    fn property_access(
        &mut self,
        expr: &'a Expr,
        object: &'a Expr,
        name: &'a Expr,
        spread: bool,
        lhs: bool,
    ) -> Visit<TypeLookupResult> {
        let object_ty = self.expr(object, false)?;
        let receiver = if spread {
            element_type(self.table, &object_ty, self.max_depth())
        } else {
            object_ty.clone()
        };
        let query = ExprQuery {
            object_type: Some(receiver),
            is_static_receiver: self.is_static_expr(object),
            child_types: vec![object_ty],
            is_lhs: lhs,
            enclosing_assignment: if lhs { self.innermost_assignment() } else { None },
            ..ExprQuery::default()
        };
        self.member_name(name, &query);
        Ok(self.lookup(expr, &query))
    }

    fn call_frame(
        &self,
        call: &Expr,
        method: &str,
        receiver: TypeDescriptor,
        declaring_type: TypeDescriptor,
        provisional: Option<&TypeLookupResult>,
        args: &[Expr],
    ) -> CallAndType {
        CallAndType {
            call: call.id,
            method: method.to_string(),
            receiver,
            declaring_type: provisional
                .and_then(|r| r.declaring_type.clone())
                .unwrap_or(declaring_type),
            declaration: provisional.and_then(|r| r.declaration.clone()),
            arg_ids: args.iter().map(|a| a.id).collect(),
        }
    }

    /// Visit the arguments of `call` with the call open, so that closure
    /// arguments can see what they are passed to.
    fn call_args(&mut self, call: CallAndType, args: &'a [Expr]) -> Visit<Vec<TypeDescriptor>> {
        self.scopes.push_call(call);
        let r = self.visit_args(args);
        self.closure_site = None;
        self.scopes.pop_call();
        r
    }

    fn visit_args(&mut self, args: &'a [Expr]) -> Visit<Vec<TypeDescriptor>> {
        let mut types = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            if arg.is_closure() {
                self.closure_site = Some(ClosureSite {
                    position,
                    prior_args: types.clone(),
                });
            }
            types.push(self.expr(arg, false)?);
        }
        Ok(types)
    }

    fn method_call(
        &mut self,
        expr: &'a Expr,
        receiver: &'a Expr,
        method: &'a Expr,
        args: &'a [Expr],
        implicit_this: bool,
        spread: bool,
    ) -> Visit<TypeLookupResult> {
        let name = method.name().unwrap_or_default();
        let scope = self.scope();
        let (object_ty, is_static) = if implicit_this {
            let found = {
                let ctx = self.ctx();
                implicit_receiver(&ctx, name, true)
            };
            (found.unwrap_or_else(|| self.this_type()), self.scopes.is_static(scope))
        } else {
            let receiver_ty = self.expr(receiver, false)?;
            let object_ty = if spread {
                element_type(self.table, &receiver_ty, self.max_depth())
            } else {
                receiver_ty
            };
            (object_ty, self.is_static_expr(receiver))
        };

        let provisional = {
            let query = ExprQuery {
                implicit_receiver: implicit_this,
                ..ExprQuery::on(object_ty.clone(), is_static).with_call_args(args.iter().map(provisional_arg).collect())
            };
            self.lookup(method, &query)
        };
        let call = self.call_frame(expr, name, object_ty.clone(), object_ty.clone(), Some(&provisional), args);

        let name_slot = self.reserve(VisitedNode::Expr(method));
        let category = (name == "use")
            .then(|| {
                args.iter().find_map(|a| match &a.kind {
                    ExprKind::Class(ty) => Some(TypeDescriptor::from(ty)),
                    _ => None,
                })
            })
            .flatten();
        let declares_category = category.is_some();
        if declares_category {
            self.scopes.set_category_being_declared(scope, category);
        }
        let types = self.call_args(call, args);
        if declares_category {
            self.scopes.set_category_being_declared(scope, None);
        }
        let types = types?;

        let mut children = vec![object_ty.clone()];
        children.extend(types.iter().cloned());
        let query = ExprQuery {
            object_type: Some(object_ty),
            is_static_receiver: is_static,
            implicit_receiver: implicit_this,
            call_args: Some(types),
            child_types: children,
            ..ExprQuery::default()
        };
        let name_result = self.lookup(method, &query);
        self.types.insert(method.id, name_result.ty.clone());
        self.fill_leaf(name_slot, name_result);
        Ok(self.lookup(expr, &query))
    }

    fn binary(
        &mut self,
        expr: &'a Expr,
        op: BinaryOp,
        left: &'a Expr,
        right: &'a Expr,
    ) -> Visit<TypeLookupResult> {
        let scope = self.scope();
        match op {
            BinaryOp::Assign => {
                let right_ty = self.expr(right, false)?;
                if let ExprKind::Variable(name) = &left.kind {
                    if !is_null(right) {
                        let outcome = record_assignment(&mut self.scopes, self.table, scope, name, &right_ty);
                        trace!(name = %name, ?outcome, "assignment");
                    }
                }
                let left_ty = self.expr(left, true)?;
                Ok(self.lookup(expr, &ExprQuery::default().with_children(vec![left_ty, right_ty])))
            }
            _ if op.is_assignment() => {
                let left_ty = self.expr(left, true)?;
                let right_ty = self.expr(right, false)?;
                let result = self.lookup(expr, &ExprQuery::default().with_children(vec![left_ty, right_ty]));
                if let ExprKind::Variable(name) = &left.kind {
                    if result.confidence != Confidence::Unknown {
                        record_assignment(&mut self.scopes, self.table, scope, name, &result.ty);
                    }
                }
                Ok(result)
            }
            _ => {
                let left_ty = self.expr(left, false)?;
                let right_ty = self.expr(right, false)?;
                Ok(self.lookup(expr, &ExprQuery::default().with_children(vec![left_ty, right_ty])))
            }
        }
    }

    fn declaration(&mut self, expr: &'a Expr, decl: &'a Declaration) -> Visit<TypeLookupResult> {
        let scope = self.scope();
        let slots: Vec<usize> = decl
            .vars
            .iter()
            .map(|v| self.reserve(VisitedNode::Expr(&v.var)))
            .collect();
        let init_ty = match &decl.init {
            Some(init) => Some(self.expr(init, false)?),
            None => None,
        };

        let mut first = None;
        for (index, (var, slot)) in decl.vars.iter().zip(slots).enumerate() {
            let rhs = match (&decl.init, &init_ty) {
                (Some(init), Some(ty)) if decl.tuple => Some(self.tuple_element(init, ty, index)),
                _ => init_ty.clone(),
            };
            let declared = var.ty.as_ref().map(TypeDescriptor::from);
            let ty = record_declaration(&mut self.scopes, scope, var.name(), declared, rhs.as_ref(), var.var.span);
            let query = ExprQuery {
                is_lhs: true,
                enclosing_assignment: Some(expr.id),
                ..ExprQuery::default()
            };
            let result = self.lookup(&var.var, &query);
            self.types.insert(var.var.id, result.ty.clone());
            self.fill_leaf(slot, result);
            first.get_or_insert(ty);
        }

        let first = first.unwrap_or_else(TypeDescriptor::object);
        Ok(self.lookup(expr, &ExprQuery::default().with_children(vec![first])))
    }

    /// The value `def (a, b) = init` binds to position `index`.
    fn tuple_element(&self, init: &Expr, init_ty: &TypeDescriptor, index: usize) -> TypeDescriptor {
        if let ExprKind::List(items) = &init.kind {
            if let Some(ty) = items.get(index).and_then(|item| self.types.get(&item.id)) {
                return ty.clone();
            }
        }
        element_type(self.table, init_ty, self.max_depth())
    }

    /// Visit a closure body in its own frame and return the type the
    /// closure yields.
    fn closure(&mut self, expr: &'a Expr, closure: &'a ClosureExpr) -> Visit<TypeDescriptor> {
        let site = self.closure_site.take();
        let parent = self.scope();
        let this_type = self.this_type();
        let owner = if self.scopes.enclosing_closure(parent).is_some() {
            TypeDescriptor::class(names::CLOSURE)
        } else {
            this_type.clone()
        };
        let call = site.as_ref().and_then(|_| self.scopes.current_call().cloned());
        let (delegate, strategy) = call
            .as_ref()
            .and_then(|c| delegation(&c.method, &c.receiver))
            .unwrap_or_else(|| (owner.clone(), ResolveStrategy::OwnerFirst));

        let scope = self.scopes.push(ScopeOwner::Closure { id: expr.id }, false);
        self.scopes.set_closure(
            scope,
            ClosureFrame {
                owner,
                delegate,
                this_type: this_type.clone(),
                strategy,
            },
        );
        if let Some(category) = self.scopes.category_being_declared(scope).cloned() {
            self.scopes.add_category(scope, category);
        }

        let seeded = match (&site, &call) {
            (Some(site), Some(call)) if self.options.infer_closure_params => seed_params(
                self.table,
                &call.method,
                &call.receiver,
                &site.prior_args,
                site.position,
                closure.params.as_ref().map_or(0, Vec::len),
                self.max_depth(),
            ),
            _ => None,
        }
        .unwrap_or_default();

        self.returns.push(Vec::new());
        let r = self.closure_body(scope, closure, &seeded, &this_type);
        let returns = self.returns.pop().unwrap_or_default();
        self.scopes.pop();
        r?;

        let last = match closure.body.stmts.last() {
            Some(Stmt::Expr(e)) => self.types.get(&e.id).cloned(),
            _ => None,
        };
        let yielded = returns
            .into_iter()
            .chain(last)
            .filter(|t| !t.is_void())
            .reduce(|a, b| self.table.common_supertype(&a, &b))
            .map(|t| t.boxed())
            .unwrap_or_else(TypeDescriptor::object);
        Ok(yielded)
    }

    fn closure_body(
        &mut self,
        scope: ScopeId,
        closure: &'a ClosureExpr,
        seeded: &[TypeDescriptor],
        this_type: &TypeDescriptor,
    ) -> Visit {
        let seeded_at = |i: usize| seeded.get(i).cloned().unwrap_or_else(TypeDescriptor::object);
        match &closure.params {
            None => {
                let info = VariableInfo::new(seeded_at(0), Some(this_type.clone()));
                self.scopes.bind(scope, "it", info);
            }
            Some(params) => {
                for (i, param) in params.iter().enumerate() {
                    let info = match &param.ty {
                        Some(ty) => VariableInfo::new(TypeDescriptor::from(ty), Some(this_type.clone())).explicit(),
                        None => VariableInfo::new(seeded_at(i), Some(this_type.clone())),
                    };
                    self.scopes.bind(scope, param.name.clone(), info.with_span(param.span));
                    self.parameter(param)?;
                    if let Some(default) = &param.default_value {
                        self.expr(default, false)?;
                    }
                }
            }
        }
        self.stmts(&closure.body.stmts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravy_ast::AstBuilder;

    #[test]
    fn members_sorted_by_position_with_spanless_last() {
        let b = AstBuilder::new();
        let class = ClassNode::new("demo.Order")
            .with_method(MethodNode::new("synthetic", vec![], b.block(vec![])))
            .with_method(MethodNode::new("late", vec![], b.block(vec![])).with_span(Span::new(50, 60)))
            .with_field(FieldNode::new("early", None).with_span(Span::new(10, 20)))
            .with_property(PropertyNode::new("middle", None).with_span(Span::new(30, 40)));
        let names: Vec<String> = members_in_order(&class)
            .into_iter()
            .map(|m| match m {
                Member::Field(f) => f.name.clone(),
                Member::Property(p) => p.name.clone(),
                Member::Method(m) => m.name.clone(),
                Member::Initializer(_) => "<init>".to_string(),
            })
            .collect();
        assert_eq!(names, vec!["early", "middle", "late", "synthetic"]);
    }

    #[test]
    fn provisional_args_use_literal_types() {
        let b = AstBuilder::new();
        assert_eq!(provisional_arg(&b.int(3)).name(), "int");
        assert_eq!(provisional_arg(&b.closure_it(vec![])).name(), names::CLOSURE);
        assert!(provisional_arg(&b.var("x")).is_object());
    }
}
