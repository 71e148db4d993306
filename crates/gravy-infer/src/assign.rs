//! Scope updates driven by declarations, assignments and imports.
//!
//! Narrowing is flow-insensitive: the most recent assignment wins,
//! whatever branch it sits in.

use gravy_ast::{ImportKind, ImportNode, Span};
use tracing::trace;

use crate::class_table::ClassTable;
use crate::scope::{ScopeId, ScopeTree, StaticImport, VariableInfo};
use crate::ty::TypeDescriptor;

/// What an assignment did to the scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOutcome {
    /// A new binding was created for a previously undeclared name.
    Bound,
    /// An existing binding was narrowed to the assigned type.
    Updated,
    /// The target was declared with an explicit type, which is kept.
    Kept,
    /// The target is not a local; the scope was left untouched.
    External,
}

/// Bind a declared variable in `scope` and return its type.
///
/// A declared type other than `Object` is kept as is. Otherwise (`def x`)
/// the variable takes the initializer's type, or `Object` without one.
pub fn record_declaration(
    scopes: &mut ScopeTree,
    scope: ScopeId,
    name: &str,
    declared: Option<TypeDescriptor>,
    rhs: Option<&TypeDescriptor>,
    span: Option<Span>,
) -> TypeDescriptor {
    let declaring = scopes.this_type(scope).cloned();
    let info = match declared {
        Some(ty) if !ty.is_object() => VariableInfo::new(ty, declaring).explicit(),
        _ => {
            let ty = rhs.cloned().unwrap_or_else(TypeDescriptor::object);
            VariableInfo::new(ty, declaring)
        }
    };
    let ty = info.ty.clone();
    trace!(name, ty = %ty, explicit = info.explicit, "declare");
    scopes.bind(scope, name, info.with_span(span));
    ty
}

/// Record `name = <rhs>`.
///
/// An existing untyped binding is narrowed in place. An undeclared name is
/// bound only where free-standing variables exist: the top level of a
/// script, inside a closure, or when `this` already has a property or
/// field of that name. Anything else is a write to some outside member.
pub fn record_assignment(
    scopes: &mut ScopeTree,
    table: &ClassTable,
    scope: ScopeId,
    name: &str,
    rhs: &TypeDescriptor,
) -> AssignOutcome {
    if let Some(info) = scopes.lookup(scope, name) {
        if info.explicit || info.type_alias {
            return AssignOutcome::Kept;
        }
        let declaring = scopes.this_type(scope).cloned();
        scopes.rebind(scope, name, rhs.clone(), declaring);
        trace!(name, ty = %rhs, "narrow");
        return AssignOutcome::Updated;
    }

    let this_type = scopes.this_type(scope).cloned();
    let on_this = this_type.as_ref().is_some_and(|this| {
        table.property_named(this, name).is_some() || table.field_named(this, name).is_some()
    });
    let free_standing = scopes.in_script_body(scope) || scopes.enclosing_closure(scope).is_some();
    if !(free_standing || on_this) {
        return AssignOutcome::External;
    }
    let Some(body) = scopes.enclosing_body(scope) else {
        return AssignOutcome::External;
    };
    trace!(name, ty = %rhs, "bind undeclared");
    scopes.bind(body, name, VariableInfo::new(rhs.clone(), this_type));
    AssignOutcome::Bound
}

/// Make an import visible in `scope`.
///
/// Type imports bind their visible name as an alias for the class.
/// Static imports register the member for unqualified lookup; a static
/// field import also binds the name to the field's type.
pub fn record_import(scopes: &mut ScopeTree, table: &ClassTable, scope: ScopeId, import: &ImportNode) {
    let owner = TypeDescriptor::class(import.type_name.clone());
    match import.kind {
        ImportKind::Type => {
            if let Some(name) = import.visible_name() {
                let mut info = VariableInfo::new(owner.clone(), Some(owner)).with_span(import.span);
                info.type_alias = true;
                scopes.bind(scope, name, info);
            }
        }
        ImportKind::Static => {
            scopes.add_static_import(StaticImport {
                owner: owner.clone(),
                member: import.member.clone(),
                alias: import.alias.clone(),
            });
            let (Some(member), Some(name)) = (import.member.as_deref(), import.visible_name()) else {
                return;
            };
            if let Some(field) = table.field_named(&owner, member).filter(|f| f.is_static) {
                let info = VariableInfo::new(field.ty.clone(), Some(owner)).with_span(import.span);
                scopes.bind(scope, name, info.explicit());
            }
        }
        ImportKind::StaticStar => scopes.add_static_import(StaticImport {
            owner,
            member: None,
            alias: None,
        }),
        ImportKind::Star => {}
    }
}
