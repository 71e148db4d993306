//! The catch-all resolver.
//!
//! Literals and structural expressions get fixed-rule types; names and
//! member references are looked up against the class table. Every query
//! gets an answer, `Object` with `Unknown` confidence at worst.

use std::sync::Arc;

use gravy_ast::{
    BinaryOp, ClassNode, Expr, ExprKind, FieldNode, Literal, MethodNode, NumberKind, Parameter,
    PropertyNode, TypeRef, UnaryOp,
};

use super::category::{choose_extension, extension_candidates, extension_result};
use super::members::{accessor_names, first_with_arity, member_type, method_return, select_overload};
use super::{Confidence, ExprQuery, LookupContext, LookupResult, TypeLookup, TypeLookupResult};
use crate::closure::element_type;
use crate::decl::{Declaration, MethodDecl, VariableDecl};
use crate::generics::GenericsMapper;
use crate::operators;
use crate::ty::{names, TypeDescriptor};

pub struct SimpleTypeLookup;

/// The first implicit receiver in scope that has a member (or extension)
/// called `name`.
pub(crate) fn implicit_receiver(ctx: &LookupContext<'_>, name: &str, is_call: bool) -> Option<TypeDescriptor> {
    ctx.scopes
        .implicit_receivers(ctx.scope)
        .into_iter()
        .find(|receiver| has_member(ctx, receiver, name, is_call))
}

fn has_member(ctx: &LookupContext<'_>, receiver: &TypeDescriptor, name: &str, is_call: bool) -> bool {
    let table = ctx.table;
    let has_extension = |n: &str| extension_candidates(ctx, receiver, n).is_ok_and(|c| !c.is_empty());
    if is_call {
        return !table.methods_named(receiver, name).is_empty() || has_extension(name);
    }
    table.property_named(receiver, name).is_some()
        || table.field_named(receiver, name).is_some()
        || table.constant_named(receiver, name).is_some()
        || accessor_names(name, false)
            .iter()
            .any(|a| !table.methods_named(receiver, a).is_empty() || has_extension(a))
        || is_map(ctx, receiver)
}

fn is_map(ctx: &LookupContext<'_>, ty: &TypeDescriptor) -> bool {
    !ty.is_object() && ctx.table.is_assignable(ty, &TypeDescriptor::class(names::MAP))
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Constant(Literal::Null))
}

pub(crate) fn literal_type(lit: &Literal) -> TypeDescriptor {
    match lit {
        Literal::Null => TypeDescriptor::object(),
        Literal::Bool(_) => TypeDescriptor::class(names::BOOLEAN),
        Literal::String(_) => TypeDescriptor::string(),
        Literal::Number { kind, .. } => match kind {
            NumberKind::Int => TypeDescriptor::int(),
            NumberKind::Long => TypeDescriptor::class("long"),
            NumberKind::Float => TypeDescriptor::class("float"),
            NumberKind::Double => TypeDescriptor::class("double"),
            NumberKind::BigInteger => TypeDescriptor::class(names::BIG_INTEGER),
            NumberKind::BigDecimal => TypeDescriptor::class(names::BIG_DECIMAL),
        },
    }
}

fn declared_or_object(ty: &Option<TypeRef>) -> (TypeDescriptor, Confidence) {
    match ty {
        Some(t) => (TypeDescriptor::from(t), Confidence::Exact),
        None => (TypeDescriptor::object(), Confidence::Inferred),
    }
}

impl SimpleTypeLookup {
    fn classify(&self, node: &Expr, query: &ExprQuery, ctx: &LookupContext<'_>) -> TypeLookupResult {
        let scope = ctx.scope;
        let exact = |ty: TypeDescriptor| TypeLookupResult::new(ty, Confidence::Exact, scope);
        let inferred = |ty: TypeDescriptor| TypeLookupResult::new(ty, Confidence::Inferred, scope);

        match &node.kind {
            ExprKind::Constant(Literal::String(name)) if query.object_type.is_some() => {
                self.member_or_unknown(name, query, ctx)
            }
            ExprKind::Constant(lit) => exact(literal_type(lit)),
            ExprKind::GString { .. } => exact(TypeDescriptor::string()),
            ExprKind::Variable(name) => self.variable(name, query, ctx),
            ExprKind::Class(ty) => {
                let ty = TypeDescriptor::from(ty);
                exact(ty.clone()).with_declaring_type(ty)
            }
            ExprKind::Property {
                property, spread, ..
            } => {
                let result = match property.name() {
                    Some(name) if query.object_type.is_some() => self.member_or_unknown(name, query, ctx),
                    _ => TypeLookupResult::unknown(scope),
                };
                spread_over(result, *spread)
            }
            ExprKind::Attribute { attribute, .. } => {
                match (attribute.name(), &query.object_type) {
                    (Some(name), Some(receiver)) => self
                        .field(name, receiver, ctx)
                        .map(|found| check_static(found, query))
                        .unwrap_or_else(|| TypeLookupResult::unknown(scope)),
                    _ => TypeLookupResult::unknown(scope),
                }
            }
            ExprKind::MethodCall {
                method,
                implicit_this,
                spread,
                ..
            } => {
                let Some(name) = method.name() else {
                    return TypeLookupResult::unknown(scope);
                };
                if *implicit_this {
                    if let Some(result) = self.closure_variable_call(name, ctx) {
                        return result;
                    }
                }
                let result = query
                    .object_type
                    .as_ref()
                    .and_then(|receiver| self.member(name, receiver, query, ctx))
                    .or_else(|| implicit_this.then(|| self.static_import(name, query, ctx)).flatten())
                    .unwrap_or_else(|| TypeLookupResult::unknown(scope));
                spread_over(result, *spread)
            }
            ExprKind::StaticMethodCall { owner, method, .. } => {
                let owner = TypeDescriptor::from(owner);
                let query = ExprQuery {
                    object_type: Some(owner.clone()),
                    is_static_receiver: true,
                    ..query.clone()
                };
                self.member(method, &owner, &query, ctx)
                    .unwrap_or_else(|| TypeLookupResult::unknown(scope))
            }
            ExprKind::ConstructorCall { ty, .. } => {
                let ty = TypeDescriptor::from(ty);
                let mut result = exact(ty.clone()).with_declaring_type(ty.erasure());
                let constructors = ctx.table.constructors(&ty);
                if let Some(args) = &query.call_args {
                    let picked = select_overload(ctx.table, &constructors, Some(args))
                        .unwrap_or_else(|_| first_with_arity(&constructors, args));
                    if let Some(ctor) = picked {
                        result = result.with_declaration(Declaration::Method(ctor));
                    }
                }
                result
            }
            ExprKind::MethodPointer { method, .. } => {
                let (Some(name), Some(receiver)) = (method.name(), &query.object_type) else {
                    return inferred(TypeDescriptor::class(names::CLOSURE));
                };
                let pointed = ctx.table.methods_named(receiver, name);
                match pointed.first() {
                    Some(m) => {
                        let (ret, _) = method_return(ctx.table, receiver, m, &[], false, ctx.max_depth());
                        inferred(TypeDescriptor::closure_of(ret.boxed()))
                            .with_declaration(Declaration::Method(Arc::clone(m)))
                    }
                    None => inferred(TypeDescriptor::class(names::CLOSURE)),
                }
            }
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, query, ctx),
            ExprKind::Unary { op, .. } => self.unary(*op, query, ctx),
            ExprKind::Ternary {
                then_expr,
                else_expr,
                ..
            } => inferred(self.common(&[(then_expr, query.child(1)), (else_expr, query.child(2))], ctx)),
            ExprKind::Elvis { value, fallback } => {
                inferred(self.common(&[(value, query.child(0)), (fallback, query.child(1))], ctx))
            }
            ExprKind::Cast { ty, .. } => exact(TypeDescriptor::from(ty)),
            ExprKind::List(items) => {
                let typed: Vec<(&Expr, TypeDescriptor)> =
                    items.iter().enumerate().map(|(i, e)| (e, query.child(i))).collect();
                inferred(TypeDescriptor::list_of(self.common(&typed, ctx).boxed()))
            }
            ExprKind::Map(entries) => {
                let keys: Vec<(&Expr, TypeDescriptor)> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (&e.key, query.child(2 * i)))
                    .collect();
                let values: Vec<(&Expr, TypeDescriptor)> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (&e.value, query.child(2 * i + 1)))
                    .collect();
                inferred(TypeDescriptor::map_of(
                    self.common(&keys, ctx).boxed(),
                    self.common(&values, ctx).boxed(),
                ))
            }
            ExprKind::Range { .. } => inferred(TypeDescriptor::parameterized(
                names::RANGE,
                vec![query.child(0).boxed()],
            )),
            ExprKind::Closure(_) => exact(TypeDescriptor::class(names::CLOSURE)),
            ExprKind::Declaration(decl) => {
                let ty = query.child(0);
                let confidence = if decl.vars.first().is_some_and(|v| v.ty.is_some()) {
                    Confidence::Exact
                } else {
                    Confidence::Inferred
                };
                let mut result = TypeLookupResult::new(ty.clone(), confidence, scope);
                if let Some(var) = decl.vars.first() {
                    result = result.with_declaration(Declaration::Variable(VariableDecl {
                        name: var.name().to_string(),
                        ty,
                        span: var.var.span,
                    }));
                }
                result
            }
            ExprKind::Spread(_) => inferred(element_type(ctx.table, &query.child(0), ctx.max_depth())),
        }
    }

    /// Common supertype of the non-`null` operands; `Object` when there are none.
    fn common(&self, typed: &[(&Expr, TypeDescriptor)], ctx: &LookupContext<'_>) -> TypeDescriptor {
        typed
            .iter()
            .filter(|(expr, _)| !is_null(expr))
            .map(|(_, ty)| ty.clone())
            .reduce(|a, b| ctx.table.common_supertype(&a, &b))
            .unwrap_or_else(TypeDescriptor::object)
    }

    fn variable(&self, name: &str, query: &ExprQuery, ctx: &LookupContext<'_>) -> TypeLookupResult {
        let scope = ctx.scope;
        let this_type = ctx.scopes.this_type(scope).cloned();
        match name {
            "this" => {
                let ty = this_type.unwrap_or_else(TypeDescriptor::object);
                return TypeLookupResult::new(ty.clone(), Confidence::Exact, scope).with_declaring_type(ty);
            }
            "super" => {
                let sup = this_type
                    .as_ref()
                    .and_then(|t| ctx.table.get(t.name()))
                    .and_then(|info| info.super_class.clone())
                    .unwrap_or_else(TypeDescriptor::object);
                return TypeLookupResult::new(sup.clone(), Confidence::Exact, scope).with_declaring_type(sup);
            }
            _ => {}
        }

        if let Some(info) = ctx.scopes.lookup(scope, name) {
            if info.type_alias {
                return TypeLookupResult::new(info.ty.clone(), Confidence::Exact, scope)
                    .with_declaring_type(info.ty.clone());
            }
            let confidence = if info.explicit {
                Confidence::Exact
            } else {
                Confidence::Inferred
            };
            let mut result = TypeLookupResult::new(info.ty.clone(), confidence, scope)
                .with_declaration(Declaration::Variable(VariableDecl {
                    name: name.to_string(),
                    ty: info.ty.clone(),
                    span: info.span,
                }))
                .with_enclosing_assignment(query.enclosing_assignment);
            if let Some(declaring) = &info.declaring_type {
                result = result.with_declaring_type(declaring.clone());
            }
            return result;
        }

        if let Some(closure_scope) = ctx.scopes.enclosing_closure(scope) {
            if let Some(frame) = ctx.scopes.closure(closure_scope) {
                let implicit = match name {
                    "delegate" => Some(frame.delegate.clone()),
                    "owner" => Some(frame.owner.clone()),
                    "thisObject" => Some(frame.this_type.clone()),
                    _ => None,
                };
                if let Some(ty) = implicit {
                    return TypeLookupResult::new(ty, Confidence::Inferred, scope);
                }
            }
        }

        if let Some(receiver) = &query.object_type {
            if let Some(result) = self.member(name, receiver, query, ctx) {
                return result.with_enclosing_assignment(query.enclosing_assignment);
            }
        }
        self.static_import(name, query, ctx)
            .unwrap_or_else(|| TypeLookupResult::unknown(scope))
    }

    /// `c()` where `c` is a local closure.
    fn closure_variable_call(&self, name: &str, ctx: &LookupContext<'_>) -> Option<TypeLookupResult> {
        let info = ctx.scopes.lookup(ctx.scope, name)?;
        if info.ty.name() != names::CLOSURE {
            return None;
        }
        let ret = info.ty.arg(0).cloned().unwrap_or_else(TypeDescriptor::object);
        Some(
            TypeLookupResult::new(ret, Confidence::Inferred, ctx.scope).with_declaration(Declaration::Variable(
                VariableDecl {
                    name: name.to_string(),
                    ty: info.ty.clone(),
                    span: info.span,
                },
            )),
        )
    }

    fn static_import(&self, name: &str, query: &ExprQuery, ctx: &LookupContext<'_>) -> Option<TypeLookupResult> {
        ctx.scopes.static_imports().iter().find_map(|import| {
            let member = import.member_for(name)?;
            let query = ExprQuery {
                object_type: Some(import.owner.clone()),
                is_static_receiver: true,
                ..query.clone()
            };
            self.member(&member, &import.owner, &query, ctx)
                .filter(|r| r.confidence != Confidence::Unknown)
        })
    }

    fn member_or_unknown(&self, name: &str, query: &ExprQuery, ctx: &LookupContext<'_>) -> TypeLookupResult {
        query
            .object_type
            .as_ref()
            .and_then(|receiver| self.member(name, receiver, query, ctx))
            .unwrap_or_else(|| TypeLookupResult::unknown(ctx.scope))
    }

    /// Member lookup on `receiver`. In a call only methods are searched;
    /// otherwise properties, accessors, fields, inherited constants and
    /// finally methods by bare name. A static receiver also sees the
    /// members of `java.lang.Class`.
    fn member(
        &self,
        name: &str,
        receiver: &TypeDescriptor,
        query: &ExprQuery,
        ctx: &LookupContext<'_>,
    ) -> Option<TypeLookupResult> {
        let is_static = query.is_static_receiver;
        let found = match &query.call_args {
            Some(args) => self
                .method(name, receiver, args, ctx)
                .or_else(|| is_static.then(|| self.method(name, &TypeDescriptor::class_of(receiver.clone()), args, ctx)).flatten()),
            None => self
                .property_like(name, receiver, query.is_lhs, ctx)
                .or_else(|| {
                    is_static
                        .then(|| self.property_like(name, &TypeDescriptor::class_of(receiver.clone()), false, ctx))
                        .flatten()
                }),
        };
        let found = match found {
            Some(result) => Some(result),
            None if query.call_args.is_none() && is_map(ctx, receiver) => {
                let mapper = GenericsMapper::from_hierarchy(
                    ctx.table,
                    receiver,
                    &TypeDescriptor::class(names::MAP),
                    ctx.max_depth(),
                );
                let value = mapper.resolve(&TypeDescriptor::placeholder("V"));
                let ty = if value.is_placeholder() {
                    TypeDescriptor::object()
                } else {
                    value
                };
                Some(TypeLookupResult::new(ty, Confidence::Inferred, ctx.scope).with_declaring_type(receiver.erasure()))
            }
            None => None,
        }?;
        Some(check_static(found, query))
    }

    fn method(
        &self,
        name: &str,
        receiver: &TypeDescriptor,
        args: &[TypeDescriptor],
        ctx: &LookupContext<'_>,
    ) -> Option<TypeLookupResult> {
        let candidates = ctx.table.methods_named(receiver, name);
        let (picked, loose) = match select_overload(ctx.table, &candidates, Some(args)) {
            Ok(Some(m)) => (m, false),
            Ok(None) => (Arc::clone(candidates.first()?), true),
            Err(_) => (first_with_arity(&candidates, args)?, true),
        };
        Some(self.method_result(&picked, receiver, args, loose, ctx))
    }

    fn method_result(
        &self,
        method: &Arc<MethodDecl>,
        receiver: &TypeDescriptor,
        args: &[TypeDescriptor],
        loose: bool,
        ctx: &LookupContext<'_>,
    ) -> TypeLookupResult {
        let (ty, escaped) = method_return(ctx.table, receiver, method, args, false, ctx.max_depth());
        let confidence = if escaped {
            Confidence::Unknown
        } else if loose {
            Confidence::LooselyInferred
        } else {
            Confidence::Exact
        };
        TypeLookupResult::new(ty, confidence, ctx.scope)
            .with_declaration(Declaration::Method(Arc::clone(method)))
            .with_doc(method.signature())
    }

    fn property_like(
        &self,
        name: &str,
        receiver: &TypeDescriptor,
        is_lhs: bool,
        ctx: &LookupContext<'_>,
    ) -> Option<TypeLookupResult> {
        let table = ctx.table;
        let scope = ctx.scope;

        if let Some(prop) = table.property_named(receiver, name) {
            let (ty, escaped) = member_type(table, receiver, &prop.declaring_type, &prop.ty, ctx.max_depth());
            return Some(
                TypeLookupResult::new(ty, exact_unless(escaped), scope).with_declaration(Declaration::Property(prop)),
            );
        }

        for accessor in accessor_names(name, is_lhs) {
            let arity = usize::from(is_lhs);
            let Some(method) = table
                .methods_named(receiver, &accessor)
                .into_iter()
                .find(|m| m.arity() == arity)
            else {
                continue;
            };
            if is_lhs {
                let (ty, escaped) =
                    member_type(table, receiver, &method.declaring_type, &method.params[0].ty, ctx.max_depth());
                return Some(
                    TypeLookupResult::new(ty, exact_unless(escaped), scope).with_declaration(Declaration::Method(method)),
                );
            }
            return Some(self.method_result(&method, receiver, &[], false, ctx));
        }

        if let Some(result) = self.field(name, receiver, ctx) {
            return Some(result);
        }

        let methods = table.methods_named(receiver, name);
        let method = methods.first()?;
        Some(self.method_result(method, receiver, &[], false, ctx))
    }

    /// Fields along the class chain, then `static final` constants
    /// inherited from any supertype.
    fn field(&self, name: &str, receiver: &TypeDescriptor, ctx: &LookupContext<'_>) -> Option<TypeLookupResult> {
        let table = ctx.table;
        let field = table
            .field_named(receiver, name)
            .or_else(|| table.constant_named(receiver, name))?;
        let (ty, escaped) = member_type(table, receiver, &field.declaring_type, &field.ty, ctx.max_depth());
        Some(TypeLookupResult::new(ty, exact_unless(escaped), ctx.scope).with_declaration(Declaration::Field(field)))
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        query: &ExprQuery,
        ctx: &LookupContext<'_>,
    ) -> TypeLookupResult {
        let scope = ctx.scope;
        let (l, r) = (query.child(0), query.child(1));
        match op {
            BinaryOp::Assign => {
                let ty = if is_null(right) { l } else { r };
                TypeLookupResult::new(ty, Confidence::Inferred, scope)
            }
            BinaryOp::ElvisAssign => TypeLookupResult::new(
                self.common(&[(left, l), (right, r)], ctx),
                Confidence::Inferred,
                scope,
            ),
            _ => {
                let op = op.compound_base().unwrap_or(op);
                self.operator(op, &l, &r, ctx)
            }
        }
    }

    /// Fixed rules first; otherwise the operator's method (`plus`,
    /// `getAt`, ...) on the left operand, then among extensions.
    fn operator(&self, op: BinaryOp, l: &TypeDescriptor, r: &TypeDescriptor, ctx: &LookupContext<'_>) -> TypeLookupResult {
        if let Some(ty) = operators::binary_shortcut(ctx.table, op, l, r) {
            return TypeLookupResult::new(ty, Confidence::Inferred, ctx.scope);
        }
        let Some(method) = operators::binary_method(op) else {
            return TypeLookupResult::unknown(ctx.scope);
        };
        self.operator_method(method, l, &[r.clone()], ctx)
    }

    fn operator_method(
        &self,
        method: &str,
        receiver: &TypeDescriptor,
        args: &[TypeDescriptor],
        ctx: &LookupContext<'_>,
    ) -> TypeLookupResult {
        if let Some(result) = self.method(method, receiver, args, ctx) {
            return result;
        }
        let candidates = extension_candidates(ctx, receiver, method).unwrap_or_default();
        let mut supplied = vec![receiver.clone()];
        supplied.extend_from_slice(args);
        match choose_extension(ctx, &candidates, &supplied) {
            Some(m) => extension_result(ctx, receiver, &m, args),
            None => TypeLookupResult::unknown(ctx.scope),
        }
    }

    fn unary(&self, op: UnaryOp, query: &ExprQuery, ctx: &LookupContext<'_>) -> TypeLookupResult {
        let operand = query.child(0);
        if let Some(ty) = operators::unary_shortcut(op, &operand) {
            return TypeLookupResult::new(ty, Confidence::Inferred, ctx.scope);
        }
        match operators::unary_method(op) {
            Some(method) => self.operator_method(method, &operand, &[], ctx),
            None => TypeLookupResult::unknown(ctx.scope),
        }
    }

    fn declaring_this(&self, ctx: &LookupContext<'_>) -> TypeDescriptor {
        ctx.scopes
            .this_type(ctx.scope)
            .cloned()
            .unwrap_or_else(TypeDescriptor::object)
    }
}

/// A class reaching an instance member, or an explicit instance reaching a
/// static one, cannot be trusted. Implicit receivers see both kinds.
fn check_static(result: TypeLookupResult, query: &ExprQuery) -> TypeLookupResult {
    let Some(decl) = &result.declaration else {
        return result;
    };
    let on_class = decl.declaring_type().is_some_and(|t| t.name() == names::CLASS || t.is_object());
    let mismatch = if query.is_static_receiver {
        !decl.is_static() && !on_class
    } else {
        decl.is_static() && !query.implicit_receiver
    };
    if mismatch {
        result.with_confidence(Confidence::Unknown)
    } else {
        result
    }
}

fn exact_unless(escaped: bool) -> Confidence {
    if escaped {
        Confidence::Unknown
    } else {
        Confidence::Exact
    }
}

/// `list*.name` yields a list of what `name` yields per element.
fn spread_over(result: TypeLookupResult, spread: bool) -> TypeLookupResult {
    if !spread {
        return result;
    }
    let element = result.ty.boxed();
    result.with_type(TypeDescriptor::list_of(element))
}

impl TypeLookup for SimpleTypeLookup {
    fn name(&self) -> &str {
        "simple"
    }

    fn lookup_expr(&self, node: &Expr, query: &ExprQuery, ctx: &LookupContext<'_>) -> LookupResult {
        Ok(Some(self.classify(node, query, ctx)))
    }

    fn lookup_class(&self, node: &ClassNode, ctx: &LookupContext<'_>) -> LookupResult {
        let ty = ctx
            .table
            .get(&node.name)
            .map(|info| info.generic_type())
            .unwrap_or_else(|| TypeDescriptor::class(node.name.clone()));
        let declaring = ty.erasure();
        Ok(Some(
            TypeLookupResult::new(ty, Confidence::Exact, ctx.scope).with_declaring_type(declaring),
        ))
    }

    fn lookup_field(&self, node: &FieldNode, ctx: &LookupContext<'_>) -> LookupResult {
        let this = self.declaring_this(ctx);
        let (ty, confidence) = declared_or_object(&node.ty);
        let mut result = TypeLookupResult::new(ty, confidence, ctx.scope).with_declaring_type(this.clone());
        if let Some(field) = ctx.table.get(this.name()).and_then(|info| {
            info.fields.iter().find(|f| f.name == node.name).cloned()
        }) {
            result = result.with_declaration(Declaration::Field(field));
        }
        Ok(Some(result))
    }

    fn lookup_property(&self, node: &PropertyNode, ctx: &LookupContext<'_>) -> LookupResult {
        let this = self.declaring_this(ctx);
        let (ty, confidence) = declared_or_object(&node.ty);
        let mut result = TypeLookupResult::new(ty, confidence, ctx.scope).with_declaring_type(this.clone());
        if let Some(prop) = ctx.table.get(this.name()).and_then(|info| {
            info.properties.iter().find(|p| p.name == node.name).cloned()
        }) {
            result = result.with_declaration(Declaration::Property(prop));
        }
        Ok(Some(result))
    }

    fn lookup_method(&self, node: &MethodNode, ctx: &LookupContext<'_>) -> LookupResult {
        let this = self.declaring_this(ctx);
        let (ty, confidence) = declared_or_object(&node.return_type);
        let mut result = TypeLookupResult::new(ty, confidence, ctx.scope).with_declaring_type(this.clone());
        let same_shape = |m: &&Arc<MethodDecl>| m.arity() == node.params.len() && m.span == node.span;
        if let Some(method) = ctx.table.get(this.name()).and_then(|info| {
            info.methods
                .iter()
                .filter(|m| m.name == node.name)
                .find(same_shape)
                .or_else(|| info.constructors.iter().find(same_shape))
                .cloned()
        }) {
            result = result.with_declaration(Declaration::Method(method));
        }
        Ok(Some(result))
    }

    fn lookup_parameter(&self, node: &Parameter, ctx: &LookupContext<'_>) -> LookupResult {
        let (declared, confidence) = declared_or_object(&node.ty);
        let (ty, confidence) = match ctx.scopes.lookup_in_frame(ctx.scope, &node.name) {
            Some(info) if node.ty.is_none() => (info.ty.clone(), Confidence::Inferred),
            _ => (declared, confidence),
        };
        Ok(Some(
            TypeLookupResult::new(ty.clone(), confidence, ctx.scope).with_declaration(Declaration::Variable(
                VariableDecl {
                    name: node.name.clone(),
                    ty,
                    span: node.span,
                },
            )),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::class_table::{ClassInfo, ClassTable};
    use crate::config::InferenceOptions;
    use crate::scope::{ScopeOwner, ScopeTree, VariableInfo};
    use crate::signature::parse_type;
    use gravy_ast::AstBuilder;

    // ── Helpers ─────────────────────────────────────────────────────

    fn ty(text: &str) -> TypeDescriptor {
        parse_type(text, &[]).unwrap()
    }

    fn classify(table: &ClassTable, scopes: &ScopeTree, node: &Expr, query: ExprQuery) -> TypeLookupResult {
        let options = InferenceOptions::default();
        let ctx = LookupContext {
            scopes,
            scope: scopes.current().unwrap(),
            table,
            options: &options,
        };
        SimpleTypeLookup
            .lookup_expr(node, &query, &ctx)
            .unwrap()
            .expect("the catch-all always answers")
    }

    fn block_scope() -> ScopeTree {
        let mut scopes = ScopeTree::new(&[]);
        scopes.push(ScopeOwner::Block, false);
        scopes
    }

    // ── Literals and operators ──────────────────────────────────────

    #[test]
    fn literal_types() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let cases = [
            (b.int(1), "int"),
            (b.number("1L", NumberKind::Long), "long"),
            (b.number("1.5", NumberKind::BigDecimal), names::BIG_DECIMAL),
            (b.string("x"), names::STRING),
            (b.bool(true), names::BOOLEAN),
            (b.null(), names::OBJECT),
            (b.gstring(&["a", ""], vec![b.int(1)]), names::STRING),
        ];
        for (node, expected) in cases {
            let result = classify(&table, &scopes, &node, ExprQuery::default());
            assert_eq!(result.ty.name(), expected, "{}", node.describe());
            assert_eq!(result.confidence, Confidence::Exact);
        }
    }

    #[test]
    fn int_plus_int_is_int() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.binary(b.int(1), BinaryOp::Plus, b.int(2));
        let query = ExprQuery::default().with_children(vec![TypeDescriptor::int(), TypeDescriptor::int()]);
        let result = classify(&table, &scopes, &node, query);
        assert_eq!(result.ty.name(), "int");
        assert!(result.declaration.is_none());
    }

    #[test]
    fn index_falls_back_to_get_at_extension() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.index(b.var("xs"), b.int(0));
        let query = ExprQuery::default().with_children(vec![ty("List<String>"), TypeDescriptor::int()]);
        let result = classify(&table, &scopes, &node, query);
        assert_eq!(result.ty.name(), names::STRING);
        assert!(result.is_extension);
    }

    #[test]
    fn ternary_skips_null_branch() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.ternary(b.bool(true), b.string("a"), b.null());
        let query = ExprQuery::default().with_children(vec![
            TypeDescriptor::class(names::BOOLEAN),
            TypeDescriptor::string(),
            TypeDescriptor::object(),
        ]);
        assert_eq!(classify(&table, &scopes, &node, query).ty.name(), names::STRING);
    }

    #[test]
    fn list_literal_element_type() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.list(vec![b.int(1), b.int(2)]);
        let query = ExprQuery::default().with_children(vec![TypeDescriptor::int(), TypeDescriptor::int()]);
        assert_eq!(
            classify(&table, &scopes, &node, query).ty.to_string(),
            "java.util.List<java.lang.Integer>"
        );
    }

    // ── Members ─────────────────────────────────────────────────────

    #[test]
    fn property_then_accessor_then_field() {
        let mut table = builtins::library();
        table.insert(
            ClassInfo::new("demo.Person")
                .property("String name")
                .method("int getAge()")
                .field("long id"),
        );
        let scopes = block_scope();
        let b = AstBuilder::new();
        let person = ty("demo.Person");
        for (member, expected) in [("name", names::STRING), ("age", "int"), ("id", "long")] {
            let node = b.string(member);
            let result = classify(&table, &scopes, &node, ExprQuery::on(person.clone(), false));
            assert_eq!(result.ty.name(), expected, "{}", member);
            assert_eq!(result.confidence, Confidence::Exact);
        }
    }

    #[test]
    fn static_constant_and_static_mismatch() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let max = b.string("MAX_VALUE");
        let result = classify(&table, &scopes, &max, ExprQuery::on(ty("Integer"), true));
        assert_eq!(result.ty.name(), "int");
        assert_eq!(result.confidence, Confidence::Exact);

        let length = b.string("length");
        let result = classify(
            &table,
            &scopes,
            &length,
            ExprQuery::on(TypeDescriptor::string(), true).with_call_args(vec![]),
        );
        assert_eq!(result.confidence, Confidence::Unknown);
    }

    #[test]
    fn instance_receiver_reaching_static_member() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let max = b.string("MAX_VALUE");
        let result = classify(&table, &scopes, &max, ExprQuery::on(ty("Integer"), false));
        assert_eq!(result.ty.name(), "int");
        assert_eq!(result.confidence, Confidence::Unknown);

        let value_of = b.string("valueOf");
        let result = classify(
            &table,
            &scopes,
            &value_of,
            ExprQuery::on(TypeDescriptor::string(), false).with_call_args(vec![TypeDescriptor::object()]),
        );
        assert_eq!(result.ty.name(), names::STRING);
        assert_eq!(result.confidence, Confidence::Unknown);

        // Inside the class itself the receiver is implicit.
        let implicit = ExprQuery {
            implicit_receiver: true,
            ..ExprQuery::on(ty("Integer"), false)
        };
        let result = classify(&table, &scopes, &max, implicit);
        assert_eq!(result.confidence, Confidence::Exact);
    }

    #[test]
    fn map_property_is_value_type() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.string("anything");
        let result = classify(&table, &scopes, &node, ExprQuery::on(ty("Map<String, Integer>"), false));
        assert_eq!(result.ty.name(), names::INTEGER);
        assert_eq!(result.confidence, Confidence::Inferred);
    }

    #[test]
    fn generic_field_through_parameterized_receiver() {
        let mut table = builtins::library();
        table.insert(ClassInfo::declare("demo.Box<T>").unwrap().field("List<T> items"));
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.string("items");
        let result = classify(&table, &scopes, &node, ExprQuery::on(ty("demo.Box<String>"), false));
        assert_eq!(result.ty.to_string(), "java.util.List<java.lang.String>");
    }

    #[test]
    fn unresolved_member_is_unknown_object() {
        let table = builtins::library();
        let scopes = block_scope();
        let b = AstBuilder::new();
        let node = b.string("nope");
        let result = classify(&table, &scopes, &node, ExprQuery::on(TypeDescriptor::string(), false));
        assert!(result.ty.is_object());
        assert_eq!(result.confidence, Confidence::Unknown);
    }

    #[test]
    fn variables_from_scope() {
        let table = builtins::library();
        let mut scopes = block_scope();
        let id = scopes.current().unwrap();
        scopes.bind(id, "count", VariableInfo::new(TypeDescriptor::int(), None));
        scopes.bind(id, "name", VariableInfo::new(TypeDescriptor::string(), None).explicit());
        let b = AstBuilder::new();
        let count = classify(&table, &scopes, &b.var("count"), ExprQuery::default());
        assert_eq!(count.ty.name(), "int");
        assert_eq!(count.confidence, Confidence::Inferred);
        let name = classify(&table, &scopes, &b.var("name"), ExprQuery::default());
        assert_eq!(name.confidence, Confidence::Exact);
        assert!(matches!(name.declaration, Some(Declaration::Variable(_))));
        let missing = classify(&table, &scopes, &b.var("missing"), ExprQuery::default());
        assert_eq!(missing.confidence, Confidence::Unknown);
    }
}
