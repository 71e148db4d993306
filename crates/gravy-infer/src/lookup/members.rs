//! Member search shared by the resolvers: accessor names, overload
//! selection and generic substitution of member types.

use std::sync::Arc;

use crate::class_table::ClassTable;
use crate::decl::MethodDecl;
use crate::error::LookupError;
use crate::generics::{bind_method_generics, erase_placeholders, GenericsMapper};
use crate::ty::TypeDescriptor;

/// `foo` becomes `Foo`.
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Method names a property reference may stand for: `getFoo`/`isFoo` when
/// reading, `setFoo` when being assigned.
pub fn accessor_names(name: &str, is_lhs: bool) -> Vec<String> {
    if name.is_empty() {
        return Vec::new();
    }
    let suffix = capitalize(name);
    if is_lhs {
        vec![format!("set{}", suffix)]
    } else {
        vec![format!("get{}", suffix), format!("is{}", suffix)]
    }
}

fn accepts_count(method: &MethodDecl, count: usize) -> bool {
    method.arity() == count
}

fn accepts_varargs(method: &MethodDecl, count: usize) -> bool {
    method.params.last().is_some_and(|p| p.ty.is_array()) && count + 1 >= method.arity()
}

fn scoring_type(ty: &TypeDescriptor) -> TypeDescriptor {
    if ty.is_placeholder() {
        TypeDescriptor::object()
    } else {
        ty.clone()
    }
}

fn score(table: &ClassTable, method: &MethodDecl, supplied: &[TypeDescriptor]) -> Result<u32, LookupError> {
    method
        .params
        .iter()
        .zip(supplied)
        .try_fold(0u32, |total, (param, arg)| {
            Ok(total + table.distance(arg, &scoring_type(&param.ty))?)
        })
}

/// Choose among same-named candidates given the supplied argument types
/// (the receiver counts as the first argument for extension methods).
///
/// Candidates are first narrowed by arity. A lone two-parameter candidate
/// whose second parameter is not primitive also accepts a single argument,
/// the missing one standing for `null`. Remaining ties are broken by
/// parameter distance, earlier candidates winning equal scores; a
/// candidate that cannot be scored drops out. When no candidate can be
/// scored the error is returned and callers fall back to the first
/// arity match.
pub fn select_overload(
    table: &ClassTable,
    candidates: &[Arc<MethodDecl>],
    supplied: Option<&[TypeDescriptor]>,
) -> Result<Option<Arc<MethodDecl>>, LookupError> {
    let Some(first) = candidates.first() else {
        return Ok(None);
    };
    let Some(args) = supplied else {
        return Ok(Some(Arc::clone(first)));
    };

    let mut matching: Vec<&Arc<MethodDecl>> =
        candidates.iter().filter(|m| accepts_count(m, args.len())).collect();
    if matching.is_empty() {
        matching = candidates.iter().filter(|m| accepts_varargs(m, args.len())).collect();
    }
    if matching.is_empty() {
        let implicit_null = candidates.len() == 1
            && first.arity() == 2
            && args.len() == 1
            && !first.params[1].ty.is_primitive();
        return Ok(implicit_null.then(|| Arc::clone(first)));
    }
    if matching.len() == 1 {
        return Ok(Some(Arc::clone(matching[0])));
    }

    let mut best: Option<(u32, &Arc<MethodDecl>)> = None;
    let mut last_err = None;
    for candidate in &matching {
        match score(table, candidate, args) {
            Ok(s) => {
                if best.map_or(true, |(b, _)| s < b) {
                    best = Some((s, candidate));
                }
            }
            Err(err) => last_err = Some(err),
        }
    }
    match (best, last_err) {
        (Some((_, m)), _) => Ok(Some(Arc::clone(m))),
        (None, Some(err)) => Err(err),
        (None, None) => Ok(Some(Arc::clone(matching[0]))),
    }
}

/// The first candidate with the right arity, for use when scoring failed.
pub(crate) fn first_with_arity(
    candidates: &[Arc<MethodDecl>],
    supplied: &[TypeDescriptor],
) -> Option<Arc<MethodDecl>> {
    candidates
        .iter()
        .find(|m| accepts_count(m, supplied.len()))
        .or_else(|| candidates.first())
        .cloned()
}

/// A member's type as seen through `receiver`, and whether a type
/// parameter escaped substitution.
pub(crate) fn member_type(
    table: &ClassTable,
    receiver: &TypeDescriptor,
    declaring: &TypeDescriptor,
    ty: &TypeDescriptor,
    max_depth: usize,
) -> (TypeDescriptor, bool) {
    let mapper = GenericsMapper::from_hierarchy(table, receiver, declaring, max_depth);
    let escaped = mapper.escapes(ty);
    (erase_placeholders(&mapper.resolve(ty)), escaped)
}

/// A method's return type for a call on `receiver` with argument types
/// `args`. Extension methods take the receiver as their first argument
/// and have no class-level bindings.
pub(crate) fn method_return(
    table: &ClassTable,
    receiver: &TypeDescriptor,
    method: &MethodDecl,
    args: &[TypeDescriptor],
    extension: bool,
    max_depth: usize,
) -> (TypeDescriptor, bool) {
    let mapper = if extension {
        GenericsMapper::new(max_depth)
    } else {
        GenericsMapper::from_hierarchy(table, receiver, &method.declaring_type, max_depth)
    };
    let params: Vec<TypeDescriptor> = method.params.iter().map(|p| mapper.resolve(&p.ty)).collect();
    let mut supplied = Vec::with_capacity(args.len() + 1);
    if extension {
        supplied.push(receiver.clone());
    }
    supplied.extend_from_slice(args);
    let bindings = bind_method_generics(table, method, &params, &supplied, max_depth);
    let mapper = mapper.with_method_bindings(bindings);
    let escaped = mapper.escapes(&method.return_type);
    (erase_placeholders(&mapper.resolve(&method.return_type)), escaped)
}
