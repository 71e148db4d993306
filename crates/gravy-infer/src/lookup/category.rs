//! Extension (category) methods.
//!
//! A category is a class of static methods whose first parameter is the
//! receiver. Two default categories are always in scope; `use(Cat) { }`
//! blocks and configuration add more.

use std::sync::Arc;

use gravy_ast::{Expr, ExprKind};
use tracing::debug;

use super::members::{accessor_names, first_with_arity, method_return, select_overload};
use super::{Confidence, ExprQuery, LookupContext, LookupResult, TypeLookup, TypeLookupResult};
use crate::decl::{Declaration, MethodDecl};
use crate::error::LookupError;
use crate::ty::{names, TypeDescriptor};

pub struct CategoryTypeLookup;

fn is_default_category(ty: &TypeDescriptor) -> bool {
    ty.name() == names::DEFAULT_GROOVY_METHODS || ty.name() == names::DEFAULT_GROOVY_STATIC_METHODS
}

fn accepts_receiver(ctx: &LookupContext<'_>, receiver: &TypeDescriptor, param: &TypeDescriptor) -> bool {
    param.is_placeholder() || ctx.table.is_assignable(receiver, param)
}

/// Static methods named `name` in every category in scope whose first
/// parameter accepts `receiver`, in category order. Default categories
/// are skipped when the receiver's own hierarchy declares the name.
pub(crate) fn extension_candidates(
    ctx: &LookupContext<'_>,
    receiver: &TypeDescriptor,
    name: &str,
) -> Result<Vec<Arc<MethodDecl>>, LookupError> {
    let receiver_declares = !ctx.table.methods_named(receiver, name).is_empty();
    let mut found = Vec::new();
    let mut missing = None;
    for category in ctx.scopes.categories(ctx.scope) {
        if receiver_declares && is_default_category(&category) {
            continue;
        }
        let info = match ctx.table.require(category.name()) {
            Ok(info) => info,
            Err(err) => {
                missing = Some(err);
                continue;
            }
        };
        found.extend(
            info.methods
                .iter()
                .filter(|m| m.is_static && m.name == name)
                .filter(|m| m.params.first().is_some_and(|p| accepts_receiver(ctx, receiver, &p.ty)))
                .cloned(),
        );
    }
    match missing {
        Some(err) if found.is_empty() => Err(err),
        _ => Ok(found),
    }
}

/// Pick the extension method for a call with `supplied` arguments
/// (receiver first), falling back to the first arity match when the
/// candidates cannot be scored.
pub(crate) fn choose_extension(
    ctx: &LookupContext<'_>,
    candidates: &[Arc<MethodDecl>],
    supplied: &[TypeDescriptor],
) -> Option<Arc<MethodDecl>> {
    match select_overload(ctx.table, candidates, Some(supplied)) {
        Ok(picked) => picked,
        Err(err) => {
            debug!(%err, "extension overloads not comparable; taking the first");
            first_with_arity(candidates, supplied)
        }
    }
}

/// The result of calling extension method `method` on `receiver`.
pub(crate) fn extension_result(
    ctx: &LookupContext<'_>,
    receiver: &TypeDescriptor,
    method: &Arc<MethodDecl>,
    args: &[TypeDescriptor],
) -> TypeLookupResult {
    let (ty, escaped) = method_return(ctx.table, receiver, method, args, true, ctx.max_depth());
    let confidence = if escaped {
        Confidence::Unknown
    } else if method.params[0].ty.erasure().is_object() || method.params[0].ty.is_placeholder() {
        Confidence::LooselyInferred
    } else {
        Confidence::Inferred
    };
    TypeLookupResult::new(ty, confidence, ctx.scope)
        .with_declaration(Declaration::Method(Arc::clone(method)))
        .with_doc(format!(
            "{} (extension from {})",
            method.signature(),
            method.declaring_type.simple_name()
        ))
        .as_extension()
}

fn member_name(node: &Expr) -> Option<&str> {
    match &node.kind {
        ExprKind::MethodCall { method, .. } | ExprKind::MethodPointer { method, .. } => method.name(),
        ExprKind::Property { property, .. } => property.name(),
        _ => node.name(),
    }
}

impl TypeLookup for CategoryTypeLookup {
    fn name(&self) -> &str {
        "category"
    }

    fn lookup_expr(&self, node: &Expr, query: &ExprQuery, ctx: &LookupContext<'_>) -> LookupResult {
        let Some(object_type) = &query.object_type else {
            return Ok(None);
        };
        let Some(name) = member_name(node) else {
            return Ok(None);
        };
        let receiver = if query.is_static_receiver {
            TypeDescriptor::class_of(object_type.clone())
        } else {
            object_type.clone()
        };

        if let Some(args) = &query.call_args {
            let candidates = extension_candidates(ctx, &receiver, name)?;
            let mut supplied = Vec::with_capacity(args.len() + 1);
            supplied.push(receiver.clone());
            supplied.extend(args.iter().cloned());
            return Ok(choose_extension(ctx, &candidates, &supplied)
                .map(|m| extension_result(ctx, &receiver, &m, args)));
        }

        // Property-style access through an accessor: `list.first` is `first()`
        // only as `getFirst()`, while `str.empty` is `isEmpty()`.
        for accessor in accessor_names(name, query.is_lhs) {
            let candidates = extension_candidates(ctx, &receiver, &accessor)?;
            if query.is_lhs {
                let supplied = [receiver.clone(), TypeDescriptor::object()];
                if let Some(setter) = choose_extension(ctx, &candidates, &supplied) {
                    let value_ty = setter.params.get(1).map(|p| p.ty.clone());
                    let result = extension_result(ctx, &receiver, &setter, &[])
                        .with_type(value_ty.unwrap_or_else(TypeDescriptor::object));
                    return Ok(Some(result));
                }
            } else if let Some(getter) = choose_extension(ctx, &candidates, &[receiver.clone()]) {
                return Ok(Some(extension_result(ctx, &receiver, &getter, &[])));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::class_table::{ClassInfo, ClassTable};
    use crate::config::InferenceOptions;
    use crate::scope::{ScopeOwner, ScopeTree};
    use crate::signature::parse_type;
    use gravy_ast::AstBuilder;

    fn ty(text: &str) -> TypeDescriptor {
        parse_type(text, &[]).unwrap()
    }

    fn lookup(table: &ClassTable, scopes: &ScopeTree, node: &Expr, query: ExprQuery) -> LookupResult {
        let options = InferenceOptions::default();
        let ctx = LookupContext {
            scopes,
            scope: scopes.current().unwrap(),
            table,
            options: &options,
        };
        CategoryTypeLookup.lookup_expr(node, &query, &ctx)
    }

    #[test]
    fn default_category_on_list() {
        let table = builtins::library();
        let mut scopes = ScopeTree::new(&[]);
        scopes.push(ScopeOwner::Block, false);
        let b = AstBuilder::new();
        let name = b.string("first");
        let result = lookup(
            &table,
            &scopes,
            &name,
            ExprQuery::on(ty("List<String>"), false).with_call_args(vec![]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.ty.name(), names::STRING);
        assert_eq!(result.confidence, Confidence::Inferred);
        assert!(result.is_extension);
    }

    #[test]
    fn object_receiver_methods_are_loose() {
        let table = builtins::library();
        let mut scopes = ScopeTree::new(&[]);
        scopes.push(ScopeOwner::Block, false);
        let b = AstBuilder::new();
        let name = b.string("inspect");
        let result = lookup(
            &table,
            &scopes,
            &name,
            ExprQuery::on(ty("Integer"), false).with_call_args(vec![]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.ty.name(), names::STRING);
        assert_eq!(result.confidence, Confidence::LooselyInferred);
    }

    #[test]
    fn receiver_method_shadows_default_category() {
        let mut table = builtins::library();
        table.insert(ClassInfo::new("demo.Bag").method("String inspect()"));
        let mut scopes = ScopeTree::new(&[]);
        scopes.push(ScopeOwner::Block, false);
        let b = AstBuilder::new();
        let name = b.string("inspect");
        let result = lookup(
            &table,
            &scopes,
            &name,
            ExprQuery::on(ty("demo.Bag"), false).with_call_args(vec![]),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn use_block_category_and_accessor_style() {
        let mut table = builtins::library();
        table.insert(
            ClassInfo::new("demo.Shout").method("static String getLoud(String self)"),
        );
        let mut scopes = ScopeTree::new(&[]);
        let outer = scopes.push(ScopeOwner::Block, false);
        scopes.add_category(outer, ty("demo.Shout"));
        let b = AstBuilder::new();
        let name = b.string("loud");
        let result = lookup(&table, &scopes, &name, ExprQuery::on(TypeDescriptor::string(), false))
            .unwrap()
            .unwrap();
        assert_eq!(result.ty.name(), names::STRING);
        assert_eq!(result.declaring_type.as_ref().map(|t| t.name()), Some("demo.Shout"));
    }

    #[test]
    fn unknown_category_is_an_error_when_nothing_matches() {
        let table = builtins::library();
        let mut scopes = ScopeTree::new(&["demo.Missing".to_string()]);
        scopes.push(ScopeOwner::Block, false);
        let b = AstBuilder::new();
        let name = b.string("frobnicate");
        let err = lookup(
            &table,
            &scopes,
            &name,
            ExprQuery::on(TypeDescriptor::string(), false).with_call_args(vec![]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LookupError::MissingClass {
                name: "demo.Missing".to_string()
            }
        );
    }
}
