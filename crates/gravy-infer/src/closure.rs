//! Closure parameter seeding.
//!
//! A closure literal passed to a well-known iteration method gets its
//! parameter types from the receiver: `list.each { it }` over a
//! `List<String>` sees `it: String`, `map.each { k, v -> }` sees the key
//! and value types. `with`/`tap` blocks also switch the closure's delegate
//! to the receiver.

use crate::class_table::ClassTable;
use crate::generics::{erase_placeholders, GenericsMapper};
use crate::scope::ResolveStrategy;
use crate::ty::{names, TypeDescriptor};

/// Methods whose closure is called once per element with the element.
const PER_ELEMENT: &[&str] = &[
    "each",
    "reverseEach",
    "collect",
    "collectMany",
    "collectEntries",
    "findAll",
    "find",
    "findResult",
    "findIndexOf",
    "any",
    "every",
    "count",
    "groupBy",
    "countBy",
    "takeWhile",
    "dropWhile",
    "sum",
    "unique",
    "sort",
    "max",
    "min",
];

/// Methods whose two-parameter closure compares two elements.
const COMPARATORS: &[&str] = &["sort", "max", "min", "unique"];

/// Type argument `slot` of `ty` viewed as `declaring`, if `ty` reaches it.
fn view_arg(
    table: &ClassTable,
    ty: &TypeDescriptor,
    declaring: &str,
    slot: &str,
    max_depth: usize,
) -> Option<TypeDescriptor> {
    let target = TypeDescriptor::class(declaring);
    let mapper = GenericsMapper::from_hierarchy(table, ty, &target, max_depth);
    if !mapper.reached_declaring_type() {
        return None;
    }
    Some(erase_placeholders(&mapper.resolve(&TypeDescriptor::placeholder(slot))))
}

/// Key and value types of a map type.
pub fn map_key_value(
    table: &ClassTable,
    ty: &TypeDescriptor,
    max_depth: usize,
) -> Option<(TypeDescriptor, TypeDescriptor)> {
    let key = view_arg(table, ty, names::MAP, "K", max_depth)?;
    let value = view_arg(table, ty, names::MAP, "V", max_depth)?;
    Some((key, value))
}

fn map_entry(key: TypeDescriptor, value: TypeDescriptor) -> TypeDescriptor {
    TypeDescriptor::parameterized(names::MAP_ENTRY, vec![key, value])
}

/// What iterating over a value of type `ty` yields. Arrays yield their
/// component, strings their characters (as `String`), maps their entries,
/// iterators and iterables their element type. Anything else iterates
/// over itself.
pub fn element_type(table: &ClassTable, ty: &TypeDescriptor, max_depth: usize) -> TypeDescriptor {
    if let Some(component) = ty.component() {
        return component.boxed();
    }
    if ty.is_string_like() {
        return TypeDescriptor::string();
    }
    if ty.is_object() {
        return TypeDescriptor::object();
    }
    if let Some((key, value)) = map_key_value(table, ty, max_depth) {
        return map_entry(key, value);
    }
    view_arg(table, ty, names::ITERATOR, "E", max_depth)
        .or_else(|| view_arg(table, ty, names::ITERABLE, "T", max_depth))
        .unwrap_or_else(|| ty.clone())
}

/// Parameter types for a closure passed as argument `position` of a call
/// to `method` on `receiver`, or `None` if `method` is not a known
/// iteration method. `param_count` is the number of declared closure
/// parameters (zero for an implicit `it`); the result has at least one
/// entry.
pub fn seed_params(
    table: &ClassTable,
    method: &str,
    receiver: &TypeDescriptor,
    call_args: &[TypeDescriptor],
    position: usize,
    param_count: usize,
    max_depth: usize,
) -> Option<Vec<TypeDescriptor>> {
    let map = map_key_value(table, receiver, max_depth);
    let element = || element_type(table, receiver, max_depth);
    let per_entry = |extra: Vec<TypeDescriptor>, arity_with_kv: usize| match &map {
        Some((k, v)) if param_count == arity_with_kv => {
            let mut out = vec![k.clone(), v.clone()];
            out.extend(extra);
            out
        }
        Some((k, v)) => {
            let mut out = vec![map_entry(k.clone(), v.clone())];
            out.extend(extra);
            out
        }
        None => {
            let mut out = vec![element()];
            out.extend(extra);
            out
        }
    };

    let mut seeded = match method {
        m if COMPARATORS.contains(&m) && param_count == 2 => vec![element(), element()],
        m if PER_ELEMENT.contains(&m) => per_entry(Vec::new(), 2),
        "eachWithIndex" => per_entry(vec![TypeDescriptor::int()], 3),
        "inject" => {
            let acc = if position >= 1 {
                call_args.first().map(|a| a.boxed()).unwrap_or_else(TypeDescriptor::object)
            } else {
                element()
            };
            let mut out = vec![acc];
            match &map {
                Some((k, v)) if param_count == 3 => out.extend([k.clone(), v.clone()]),
                Some((k, v)) => out.push(map_entry(k.clone(), v.clone())),
                None => out.push(element()),
            }
            out
        }
        "with" | "tap" | "identity" => vec![receiver.boxed()],
        "times" => vec![TypeDescriptor::int()],
        "upto" | "downto" | "step" => vec![receiver.boxed()],
        "eachLine" => vec![TypeDescriptor::string(), TypeDescriptor::int()],
        "eachMatch" => vec![TypeDescriptor::string()],
        _ => return None,
    };
    seeded.truncate(param_count.max(1));
    Some(seeded)
}

/// The delegate and resolve strategy a closure argument of `method`
/// runs with, when the method changes them.
pub fn delegation(method: &str, receiver: &TypeDescriptor) -> Option<(TypeDescriptor, ResolveStrategy)> {
    match method {
        "with" | "tap" | "identity" => Some((receiver.boxed(), ResolveStrategy::DelegateFirst)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::signature::parse_type;

    fn ty(text: &str) -> TypeDescriptor {
        parse_type(text, &[]).unwrap()
    }

    fn seed(method: &str, receiver: &str, args: &[TypeDescriptor], position: usize, count: usize) -> Vec<String> {
        let table = builtins::library();
        seed_params(&table, method, &ty(receiver), args, position, count, 10)
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn element_types() {
        let table = builtins::library();
        assert_eq!(element_type(&table, &ty("List<String>"), 10).name(), names::STRING);
        assert_eq!(element_type(&table, &ty("int[]"), 10).name(), names::INTEGER);
        assert_eq!(element_type(&table, &ty("String"), 10).name(), names::STRING);
        assert_eq!(element_type(&table, &ty("Iterator<Long>"), 10).name(), names::LONG);
        assert_eq!(
            element_type(&table, &ty("Map<String, Integer>"), 10).to_string(),
            "java.util.Map$Entry<java.lang.String, java.lang.Integer>"
        );
        assert_eq!(element_type(&table, &ty("IntRange"), 10).name(), names::INTEGER);
        assert!(element_type(&table, &ty("List"), 10).is_object());
        assert_eq!(element_type(&table, &ty("java.util.regex.Matcher"), 10).name(), names::MATCHER);
    }

    #[test]
    fn each_family() {
        assert_eq!(seed("each", "List<String>", &[], 0, 0), vec![names::STRING]);
        assert_eq!(seed("collect", "Set<Integer>", &[], 0, 1), vec![names::INTEGER]);
        assert_eq!(
            seed("each", "Map<String, Integer>", &[], 0, 2),
            vec![names::STRING, names::INTEGER]
        );
        assert_eq!(
            seed("each", "HashMap<String, Long>", &[], 0, 1),
            vec!["java.util.Map$Entry<java.lang.String, java.lang.Long>"]
        );
        assert_eq!(
            seed("sort", "List<String>", &[], 0, 2),
            vec![names::STRING, names::STRING]
        );
    }

    #[test]
    fn indexed_and_accumulating() {
        assert_eq!(
            seed("eachWithIndex", "List<String>", &[], 0, 2),
            vec![names::STRING, "int"]
        );
        assert_eq!(
            seed("eachWithIndex", "Map<String, Integer>", &[], 0, 3),
            vec![names::STRING, names::INTEGER, "int"]
        );
        assert_eq!(
            seed("inject", "List<String>", &[TypeDescriptor::int()], 1, 2),
            vec![names::INTEGER, names::STRING]
        );
        assert_eq!(
            seed("inject", "List<String>", &[], 0, 2),
            vec![names::STRING, names::STRING]
        );
    }

    #[test]
    fn receiver_and_number_methods() {
        assert_eq!(seed("with", "StringBuilder", &[], 0, 0), vec!["java.lang.StringBuilder"]);
        assert_eq!(seed("times", "int", &[], 0, 0), vec!["int"]);
        assert_eq!(seed("upto", "int", &[TypeDescriptor::int()], 1, 1), vec![names::INTEGER]);
        assert_eq!(seed("eachLine", "String", &[], 0, 2), vec![names::STRING, "int"]);
        let table = builtins::library();
        assert!(seed_params(&table, "frobnicate", &ty("List<String>"), &[], 0, 1, 10).is_none());
    }

    #[test]
    fn with_switches_delegate() {
        let (delegate, strategy) = delegation("with", &ty("StringBuilder")).unwrap();
        assert_eq!(delegate.name(), "java.lang.StringBuilder");
        assert_eq!(strategy, ResolveStrategy::DelegateFirst);
        assert!(delegation("each", &ty("List<String>")).is_none());
    }
}
