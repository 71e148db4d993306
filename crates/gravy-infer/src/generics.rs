//! Substitution of type parameters.
//!
//! A [`GenericsMapper`] is built for one query: it climbs from a resolved
//! (parameterized) type to the type declaring some member, pushing one
//! substitution frame per level, so that a member declared as `E get(int)`
//! on `List<E>` reads as `String get(int)` through an `ArrayList<String>`.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::class_table::ClassTable;
use crate::decl::MethodDecl;
use crate::error::LookupError;
use crate::ty::TypeDescriptor;

type Frame = FxHashMap<String, TypeDescriptor>;

#[derive(Clone, Debug)]
pub struct GenericsMapper {
    frames: Vec<Frame>,
    max_depth: usize,
    reached: bool,
}

impl GenericsMapper {
    /// A mapper with no bindings.
    pub fn new(max_depth: usize) -> Self {
        GenericsMapper {
            frames: Vec::new(),
            max_depth,
            reached: false,
        }
    }

    /// Climb from `resolved` towards `declaring`, stopping at the first
    /// level whose name matches. Each level pairs the class's declared
    /// generic slots with the arguments that level resolved to; a raw or
    /// mis-sized parameterization maps every slot to its erasure.
    pub fn from_hierarchy(
        table: &ClassTable,
        resolved: &TypeDescriptor,
        declaring: &TypeDescriptor,
        max_depth: usize,
    ) -> Self {
        let mut mapper = GenericsMapper::new(max_depth);
        let start = resolved.boxed();
        if start.is_array() {
            return mapper;
        }
        let mut current = if resolved.is_primitive() {
            start
        } else {
            resolved.clone()
        };
        mapper.frames.push(frame_for(table, &current));
        if current.name() == declaring.name() {
            mapper.reached = true;
            return mapper;
        }
        let Some(path) = supertype_path(table, current.name(), declaring.name()) else {
            return mapper;
        };
        for step in path {
            current = mapper.resolve(&step);
            mapper.frames.push(frame_for(table, &current));
        }
        mapper.reached = true;
        mapper
    }

    /// Whether the climb reached the declaring type.
    pub fn reached_declaring_type(&self) -> bool {
        self.reached
    }

    /// Number of hierarchy levels visited.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// What the closest frame binds `name` to.
    pub fn binding(&self, name: &str) -> Option<&TypeDescriptor> {
        self.frames.last().and_then(|f| f.get(name))
    }

    /// Add method-level bindings on top of the closest frame.
    pub fn with_method_bindings(mut self, bindings: Frame) -> Self {
        if bindings.is_empty() {
            return self;
        }
        let mut frame = self.frames.last().cloned().unwrap_or_default();
        frame.extend(bindings);
        self.frames.push(frame);
        self
    }

    /// Substitute placeholders using the closest frame. Placeholders with
    /// no binding are left in place. Nesting beyond the depth cap degrades
    /// to the erasure.
    pub fn resolve(&self, ty: &TypeDescriptor) -> TypeDescriptor {
        self.try_resolve(ty).unwrap_or_else(|err| {
            debug!(%err, "generics substitution capped");
            ty.erasure()
        })
    }

    pub fn try_resolve(&self, ty: &TypeDescriptor) -> Result<TypeDescriptor, LookupError> {
        self.resolve_at(ty, 0)
    }

    fn resolve_at(&self, ty: &TypeDescriptor, depth: usize) -> Result<TypeDescriptor, LookupError> {
        if depth > self.max_depth {
            return Err(LookupError::GenericsDepthExceeded {
                ty: ty.to_string(),
                depth: self.max_depth,
            });
        }
        if ty.is_placeholder() {
            return Ok(self.binding(ty.name()).cloned().unwrap_or_else(|| ty.clone()));
        }
        if let Some(component) = ty.component() {
            return Ok(TypeDescriptor::array_of(self.resolve_at(component, depth + 1)?));
        }
        if ty.args().is_empty() {
            return Ok(ty.clone());
        }
        let args = ty
            .args()
            .iter()
            .map(|a| self.resolve_at(a, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ty.clone().with_args(args))
    }

    /// True when `ty` is a type parameter that substitution cannot turn
    /// into anything more specific than `Object`.
    pub fn escapes(&self, ty: &TypeDescriptor) -> bool {
        ty.is_placeholder()
            && self
                .binding(ty.name())
                .map_or(true, |b| b.is_object() || b.is_placeholder())
    }
}

fn frame_for(table: &ClassTable, ty: &TypeDescriptor) -> Frame {
    let mut frame = Frame::default();
    let Some(info) = table.get(ty.name()) else {
        return frame;
    };
    if ty.args().len() == info.generics.len() {
        for (slot, arg) in info.generics.iter().zip(ty.args()) {
            frame.insert(slot.name.clone(), arg.clone());
        }
    } else {
        for slot in &info.generics {
            frame.insert(slot.name.clone(), slot.erasure());
        }
    }
    frame
}

/// Declared supertype references leading from `from` to `to`, breadth-first
/// so the shortest route wins.
fn supertype_path(table: &ClassTable, from: &str, to: &str) -> Option<Vec<TypeDescriptor>> {
    let mut came_from: FxHashMap<String, (String, TypeDescriptor)> = FxHashMap::default();
    let mut seen = FxHashSet::default();
    let mut queue = VecDeque::from([from.to_string()]);
    seen.insert(from.to_string());
    while let Some(name) = queue.pop_front() {
        if name == to {
            let mut path = Vec::new();
            let mut cursor = name;
            while let Some((parent, step)) = came_from.get(&cursor) {
                path.push(step.clone());
                cursor = parent.clone();
            }
            path.reverse();
            return Some(path);
        }
        for sup in table.declared_supertypes(&name) {
            if seen.insert(sup.name().to_string()) {
                came_from.insert(sup.name().to_string(), (name.clone(), sup.clone()));
                queue.push_back(sup.name().to_string());
            }
        }
    }
    None
}

/// Replace every remaining placeholder with `Object`.
pub fn erase_placeholders(ty: &TypeDescriptor) -> TypeDescriptor {
    if ty.is_placeholder() {
        return TypeDescriptor::object();
    }
    if let Some(component) = ty.component() {
        return TypeDescriptor::array_of(erase_placeholders(component));
    }
    if ty.args().is_empty() {
        return ty.clone();
    }
    ty.clone()
        .with_args(ty.args().iter().map(erase_placeholders).collect())
}

/// Bind a generic method's own type parameters by matching its (already
/// class-substituted) parameter types against argument types.
pub fn bind_method_generics(
    table: &ClassTable,
    method: &MethodDecl,
    param_types: &[TypeDescriptor],
    arg_types: &[TypeDescriptor],
    max_depth: usize,
) -> Frame {
    let mut bindings = Frame::default();
    if method.type_params.is_empty() {
        return bindings;
    }
    let vars: Vec<&str> = method.type_params.iter().map(|p| p.name.as_str()).collect();
    for (param, arg) in param_types.iter().zip(arg_types) {
        unify(table, param, arg, &vars, &mut bindings, 0, max_depth);
    }
    bindings
}

fn unify(
    table: &ClassTable,
    param: &TypeDescriptor,
    arg: &TypeDescriptor,
    vars: &[&str],
    out: &mut Frame,
    depth: usize,
    max_depth: usize,
) {
    if depth > max_depth {
        return;
    }
    if param.is_placeholder() {
        if vars.contains(&param.name()) && !arg.is_placeholder() {
            let boxed = arg.boxed();
            match out.get(param.name()) {
                Some(existing) if !existing.is_object() => {}
                _ => {
                    out.insert(param.name().to_string(), boxed);
                }
            }
        }
        return;
    }
    if let (Some(p), Some(a)) = (param.component(), arg.component()) {
        unify(table, p, a, vars, out, depth + 1, max_depth);
        return;
    }
    if param.args().is_empty() || arg.is_object() {
        return;
    }
    let view = if arg.name() == param.name() {
        arg.clone()
    } else {
        let mapper = GenericsMapper::from_hierarchy(table, arg, param, max_depth);
        let Some(info) = table.get(param.name()) else {
            return;
        };
        if !mapper.reached_declaring_type() {
            return;
        }
        mapper.resolve(&info.generic_type())
    };
    for (p, a) in param.args().iter().zip(view.args()) {
        unify(table, p, a, vars, out, depth + 1, max_depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::class_table::ClassInfo;
    use crate::signature::parse_type;
    use crate::ty::names;

    fn ty(text: &str) -> TypeDescriptor {
        parse_type(text, &[]).unwrap()
    }

    #[test]
    fn climbs_to_declaring_interface() {
        let table = builtins::library();
        let resolved = ty("ArrayList<String>");
        let mapper = GenericsMapper::from_hierarchy(&table, &resolved, &ty("Iterable"), 10);
        assert!(mapper.reached_declaring_type());
        assert_eq!(mapper.depth(), 4);
        let t = mapper.resolve(&TypeDescriptor::placeholder("T"));
        assert_eq!(t.name(), names::STRING);
    }

    #[test]
    fn nested_substitution() {
        let mut table = ClassTable::new();
        table.insert(
            ClassInfo::declare("demo.Box<T>")
                .unwrap()
                .field("List<T> items"),
        );
        let mapper = GenericsMapper::from_hierarchy(&table, &ty("demo.Box<String>"), &ty("demo.Box"), 10);
        let field_ty = &table.get("demo.Box").unwrap().fields[0].ty;
        assert_eq!(
            mapper.resolve(field_ty).to_string(),
            "java.util.List<java.lang.String>"
        );
    }

    #[test]
    fn raw_types_erase_slots() {
        let table = builtins::library();
        let mapper = GenericsMapper::from_hierarchy(&table, &ty("List"), &ty("List"), 10);
        assert!(mapper.escapes(&TypeDescriptor::placeholder("E")));
        assert!(mapper.resolve(&TypeDescriptor::placeholder("E")).is_object());
    }

    #[test]
    fn depth_cap_degrades_to_erasure() {
        let mapper = GenericsMapper::new(2);
        let deep = ty("List<List<List<List<String>>>>");
        assert!(matches!(
            mapper.try_resolve(&deep),
            Err(LookupError::GenericsDepthExceeded { depth: 2, .. })
        ));
        assert_eq!(mapper.resolve(&deep).to_string(), names::LIST);
    }

    #[test]
    fn method_generics_from_arguments() {
        let table = builtins::library();
        let dgm = table.get(names::DEFAULT_GROOVY_METHODS).unwrap();
        let inject = dgm.methods.iter().find(|m| m.name == "inject").unwrap();
        let params: Vec<TypeDescriptor> = inject.params.iter().map(|p| p.ty.clone()).collect();
        let args = vec![
            ty("List<String>"),
            TypeDescriptor::int(),
            TypeDescriptor::closure_of(TypeDescriptor::object()),
        ];
        let bindings = bind_method_generics(&table, inject, &params, &args, 10);
        assert_eq!(bindings.get("T").map(|t| t.name()), Some(names::INTEGER));
    }

    #[test]
    fn element_type_through_hierarchy_for_method_generics() {
        let table = builtins::library();
        let dgm = table.get(names::DEFAULT_GROOVY_METHODS).unwrap();
        let first = dgm.methods.iter().find(|m| m.name == "first").unwrap();
        let params: Vec<TypeDescriptor> = first.params.iter().map(|p| p.ty.clone()).collect();
        let bindings = bind_method_generics(&table, first, &params, &[ty("ArrayList<Integer>")], 10);
        let mapper = GenericsMapper::new(10).with_method_bindings(bindings);
        assert_eq!(mapper.resolve(&first.return_type).name(), names::INTEGER);
    }
}
