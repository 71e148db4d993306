//! The type universe references are resolved against.
//!
//! A [`ClassTable`] maps qualified names to [`ClassInfo`]. Tables are
//! layered: the library layer (built-ins plus whatever an embedder adds) is
//! shared behind an `Arc`, and each run stacks a small table holding the
//! module's own classes on top of it.

use std::collections::VecDeque;
use std::sync::Arc;

use gravy_ast::{ClassNode, ModuleNode};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::decl::{FieldDecl, GenericSlot, MethodDecl, ParamDecl, PropertyDecl};
use crate::error::LookupError;
use crate::signature::{self, SignatureError};
use crate::ty::{names, TypeDescriptor};

/// Name under which constructors are stored.
pub const CONSTRUCTOR_NAME: &str = "<init>";

#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: String,
    pub generics: Vec<GenericSlot>,
    pub super_class: Option<TypeDescriptor>,
    pub interfaces: Vec<TypeDescriptor>,
    pub is_interface: bool,
    pub fields: Vec<Arc<FieldDecl>>,
    pub properties: Vec<Arc<PropertyDecl>>,
    pub methods: Vec<Arc<MethodDecl>>,
    pub constructors: Vec<Arc<MethodDecl>>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ClassInfo {
            name: name.into(),
            generics: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            is_interface: false,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Declare a class from a header such as `java.util.Map<K, V>`.
    pub fn declare(header: &str) -> Result<Self, SignatureError> {
        let (name, slots) = signature::parse_class_header(header)?;
        let mut info = ClassInfo::new(name);
        info.generics = slots
            .into_iter()
            .map(|(name, bound)| GenericSlot { name, bound })
            .collect();
        Ok(info)
    }

    /// The class parameterized by its own type parameters: `List<E>`.
    pub fn generic_type(&self) -> TypeDescriptor {
        TypeDescriptor::parameterized(
            self.name.clone(),
            self.generics
                .iter()
                .map(|g| TypeDescriptor::placeholder(g.name.clone()))
                .collect(),
        )
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.generics.iter().map(|g| g.name.clone()).collect()
    }

    fn erased_self(&self) -> TypeDescriptor {
        TypeDescriptor::class(self.name.clone())
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn extends(mut self, sig: &str) -> Self {
        match signature::parse_type(sig, &self.slot_names()) {
            Ok(ty) => self.super_class = Some(ty),
            Err(err) => warn!(class = %self.name, %err, "ignoring supertype"),
        }
        self
    }

    pub fn implements(mut self, sig: &str) -> Self {
        match signature::parse_type(sig, &self.slot_names()) {
            Ok(ty) => self.interfaces.push(ty),
            Err(err) => warn!(class = %self.name, %err, "ignoring interface"),
        }
        self
    }

    /// Add a method from a signature such as `static <T> T find(Closure c)`.
    pub fn method(mut self, sig: &str) -> Self {
        if let Err(err) = self.add_method(sig) {
            warn!(class = %self.name, %err, "ignoring method");
        }
        self
    }

    pub fn add_method(&mut self, sig: &str) -> Result<(), SignatureError> {
        let parsed = signature::parse_method(sig, &self.slot_names())?;
        self.methods.push(Arc::new(MethodDecl {
            name: parsed.name,
            declaring_type: self.erased_self(),
            type_params: parsed.type_params.into_iter().map(GenericSlot::new).collect(),
            params: parsed
                .params
                .into_iter()
                .map(|(name, ty)| ParamDecl { name, ty })
                .collect(),
            return_type: parsed.return_type,
            is_static: parsed.is_static,
            span: None,
        }));
        Ok(())
    }

    /// Add a constructor from its parameter list, e.g. `(int, String)`.
    pub fn constructor(mut self, params: &str) -> Self {
        let sig = format!("void new{}", params);
        match signature::parse_method(&sig, &self.slot_names()) {
            Ok(parsed) => {
                let decl = MethodDecl {
                    name: CONSTRUCTOR_NAME.to_string(),
                    declaring_type: self.erased_self(),
                    type_params: Vec::new(),
                    params: parsed
                        .params
                        .into_iter()
                        .map(|(name, ty)| ParamDecl { name, ty })
                        .collect(),
                    return_type: self.generic_type(),
                    is_static: false,
                    span: None,
                };
                self.constructors.push(Arc::new(decl));
            }
            Err(err) => warn!(class = %self.name, %err, "ignoring constructor"),
        }
        self
    }

    /// Add a field from `[static] [final] Type name`.
    pub fn field(mut self, sig: &str) -> Self {
        match self.parse_member(sig) {
            Ok((is_static, is_final, ty, name)) => {
                let decl = FieldDecl {
                    name,
                    declaring_type: self.erased_self(),
                    ty,
                    is_static,
                    is_final,
                    span: None,
                };
                self.fields.push(Arc::new(decl));
            }
            Err(err) => warn!(class = %self.name, %err, "ignoring field"),
        }
        self
    }

    /// Add a property from `[static] Type name`.
    pub fn property(mut self, sig: &str) -> Self {
        match self.parse_member(sig) {
            Ok((is_static, _, ty, name)) => {
                let decl = PropertyDecl {
                    name,
                    declaring_type: self.erased_self(),
                    ty,
                    is_static,
                    span: None,
                };
                self.properties.push(Arc::new(decl));
            }
            Err(err) => warn!(class = %self.name, %err, "ignoring property"),
        }
        self
    }

    fn parse_member(
        &self,
        sig: &str,
    ) -> Result<(bool, bool, TypeDescriptor, String), SignatureError> {
        let mut rest = sig.trim();
        let (mut is_static, mut is_final) = (false, false);
        loop {
            if let Some(r) = rest.strip_prefix("static ") {
                is_static = true;
                rest = r.trim_start();
            } else if let Some(r) = rest.strip_prefix("final ") {
                is_final = true;
                rest = r.trim_start();
            } else {
                break;
            }
        }
        let (ty_text, name) = rest.rsplit_once(' ').ok_or_else(|| SignatureError {
            text: sig.to_string(),
            reason: "expected `Type name`",
        })?;
        let ty = signature::parse_type(ty_text, &self.slot_names())?;
        Ok((is_static, is_final, ty, name.trim().to_string()))
    }

    /// Build from a class declared in source. Untyped (`def`) members get
    /// `Object`.
    pub fn from_node(node: &ClassNode) -> Self {
        let self_ty = TypeDescriptor::class(node.name.clone());
        let declared = |t: &Option<gravy_ast::TypeRef>| {
            t.as_ref()
                .map(TypeDescriptor::from)
                .unwrap_or_else(TypeDescriptor::object)
        };
        let slots = |params: &[gravy_ast::GenericParam]| -> Vec<GenericSlot> {
            params
                .iter()
                .map(|g| GenericSlot {
                    name: g.name.clone(),
                    bound: g.upper_bound.as_ref().map(TypeDescriptor::from),
                })
                .collect()
        };

        let mut info = ClassInfo::new(node.name.clone());
        info.generics = slots(&node.generics);
        info.is_interface = node.is_interface;
        info.super_class = node.super_class.as_ref().map(TypeDescriptor::from);
        if info.super_class.is_none() && node.is_script {
            info.super_class = Some(TypeDescriptor::class(names::SCRIPT));
        }
        info.interfaces = node.interfaces.iter().map(TypeDescriptor::from).collect();

        info.fields = node
            .fields
            .iter()
            .map(|f| {
                Arc::new(FieldDecl {
                    name: f.name.clone(),
                    declaring_type: self_ty.clone(),
                    ty: declared(&f.ty),
                    is_static: f.modifiers.is_static,
                    is_final: f.modifiers.is_final,
                    span: f.span,
                })
            })
            .collect();
        info.properties = node
            .properties
            .iter()
            .map(|p| {
                Arc::new(PropertyDecl {
                    name: p.name.clone(),
                    declaring_type: self_ty.clone(),
                    ty: declared(&p.ty),
                    is_static: p.modifiers.is_static,
                    span: p.span,
                })
            })
            .collect();

        let method = |m: &gravy_ast::MethodNode, name: &str, ret: TypeDescriptor| MethodDecl {
            name: name.to_string(),
            declaring_type: self_ty.clone(),
            type_params: slots(&m.generics),
            params: m
                .params
                .iter()
                .map(|p| ParamDecl {
                    name: p.name.clone(),
                    ty: declared(&p.ty),
                })
                .collect(),
            return_type: ret,
            is_static: m.modifiers.is_static,
            span: m.span,
        };
        info.methods = node
            .methods
            .iter()
            .map(|m| Arc::new(method(m, &m.name, declared(&m.return_type))))
            .collect();
        let generic_self = info.generic_type();
        info.constructors = node
            .constructors
            .iter()
            .map(|m| Arc::new(method(m, CONSTRUCTOR_NAME, generic_self.clone())))
            .collect();
        info
    }
}

#[derive(Debug, Default)]
pub struct ClassTable {
    parent: Option<Arc<ClassTable>>,
    classes: FxHashMap<String, ClassInfo>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table whose misses fall through to `parent`.
    pub fn layered(parent: Arc<ClassTable>) -> Self {
        ClassTable {
            parent: Some(parent),
            classes: FxHashMap::default(),
        }
    }

    /// Insert (or shadow) a class.
    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    /// Insert every class declared in `module`, inner classes included.
    pub fn add_module(&mut self, module: &ModuleNode) {
        fn add(table: &mut ClassTable, node: &ClassNode) {
            table.insert(ClassInfo::from_node(node));
            for inner in &node.inner_classes {
                add(table, inner);
            }
        }
        for class in &module.classes {
            add(self, class);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        match self.classes.get(name) {
            Some(info) => Some(info),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn require(&self, name: &str) -> Result<&ClassInfo, LookupError> {
        self.get(name).ok_or_else(|| LookupError::MissingClass {
            name: name.to_string(),
        })
    }

    /// Number of classes visible through this table, shadowed ones counted once.
    pub fn len(&self) -> usize {
        let inherited = self.parent.as_ref().map_or(0, |p| {
            p.len() - self.classes.keys().filter(|k| p.contains(k)).count()
        });
        self.classes.len() + inherited
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct supertypes as declared (type parameters of `name` unsubstituted):
    /// the superclass, then interfaces, then `Object` if nothing else.
    pub fn declared_supertypes(&self, name: &str) -> Vec<TypeDescriptor> {
        if name == names::OBJECT {
            return Vec::new();
        }
        let mut out = Vec::new();
        if let Some(info) = self.get(name) {
            out.extend(info.super_class.iter().cloned());
            out.extend(info.interfaces.iter().cloned());
        }
        if out.is_empty() {
            out.push(TypeDescriptor::object());
        }
        out
    }

    /// All supertypes of `ty` by erased name, most-derived first: the class
    /// chain, then interfaces breadth-first, and `Object` last. Primitives
    /// share the hierarchy of their wrapper.
    pub fn hierarchy(&self, ty: &TypeDescriptor) -> Vec<TypeDescriptor> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let start = if ty.is_primitive() {
            out.push(ty.erasure());
            seen.insert(ty.name().to_string());
            ty.boxed()
        } else {
            ty.erasure()
        };
        if ty.is_array() || ty.is_placeholder() {
            out.push(start);
            out.push(TypeDescriptor::object());
            return out;
        }

        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(class) = current {
            if class.is_object() || !seen.insert(class.name().to_string()) {
                break;
            }
            current = self
                .get(class.name())
                .and_then(|info| info.super_class.as_ref())
                .map(|s| s.erasure());
            chain.push(class);
        }

        let mut queue: VecDeque<TypeDescriptor> = VecDeque::new();
        for class in &chain {
            if let Some(info) = self.get(class.name()) {
                queue.extend(info.interfaces.iter().map(|i| i.erasure()));
            }
        }
        out.extend(chain);
        while let Some(iface) = queue.pop_front() {
            if iface.is_object() || !seen.insert(iface.name().to_string()) {
                continue;
            }
            if let Some(info) = self.get(iface.name()) {
                queue.extend(info.interfaces.iter().map(|i| i.erasure()));
                queue.extend(info.super_class.iter().map(|s| s.erasure()));
            }
            out.push(iface);
        }
        out.push(TypeDescriptor::object());
        out
    }

    /// Whether a value of type `from` may be passed where `to` is expected,
    /// by erasure, with boxing, numeric widening and GString coercion.
    pub fn is_assignable(&self, from: &TypeDescriptor, to: &TypeDescriptor) -> bool {
        if to.is_object() || from.name() == to.name() {
            return true;
        }
        if from.boxed().name() == to.boxed().name() {
            return true;
        }
        if is_primitive_or_boxed(from) && is_primitive_or_boxed(to) {
            if let (Some(a), Some(b)) = (from.numeric_rank(), to.numeric_rank()) {
                if a <= b {
                    return true;
                }
            }
        }
        if from.name() == names::GSTRING && to.name() == names::STRING {
            return true;
        }
        if let (Some(a), Some(b)) = (from.component(), to.component()) {
            return self.is_assignable(a, b);
        }
        self.hierarchy(from).iter().any(|t| t.name() == to.name())
    }

    /// How far an argument type is from a parameter type; 0 is an exact
    /// match. An argument of static type `Object` is dynamically typed and
    /// matches anything at distance 1.
    pub fn distance(&self, arg: &TypeDescriptor, param: &TypeDescriptor) -> Result<u32, LookupError> {
        if arg.name() == param.name() {
            return Ok(0);
        }
        if arg.is_object() {
            return Ok(1);
        }
        if arg.boxed().name() == param.boxed().name() {
            return Ok(1);
        }
        if arg.name() == names::GSTRING && param.name() == names::STRING {
            return Ok(1);
        }
        if let (Some(a), Some(b)) = (arg.component(), param.component()) {
            return self.distance(a, b);
        }
        let hierarchy = self.hierarchy(arg);
        if param.is_object() {
            return Ok(hierarchy.len() as u32 + 1);
        }
        if let Some(pos) = hierarchy.iter().position(|t| t.name() == param.name()) {
            return Ok(pos as u32);
        }
        if is_primitive_or_boxed(arg) && is_primitive_or_boxed(param) {
            if let (Some(a), Some(b)) = (arg.numeric_rank(), param.numeric_rank()) {
                if a <= b {
                    return Ok(u32::from(b - a) + 2);
                }
            }
        }
        Err(LookupError::IncomparableTypes {
            from: arg.to_string(),
            to: param.to_string(),
        })
    }

    /// The nearest type both `a` and `b` are assignable to.
    pub fn common_supertype(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        if a.same_parameterization(b) {
            return a.clone();
        }
        if a == b {
            return a.erasure();
        }
        if let (Some(ra), Some(rb)) = (a.numeric_rank(), b.numeric_rank()) {
            let wider = if ra >= rb { a } else { b };
            return if a.is_primitive() && b.is_primitive() {
                wider.clone()
            } else {
                wider.boxed()
            };
        }
        if self.is_assignable(a, b) {
            return b.clone();
        }
        if self.is_assignable(b, a) {
            return a.clone();
        }
        self.hierarchy(&a.boxed())
            .into_iter()
            .find(|t| self.is_assignable(b, t))
            .unwrap_or_else(TypeDescriptor::object)
    }

    /// Methods named `name` visible on `ty`, most-derived first. A method
    /// overridden lower in the hierarchy hides the one it overrides.
    pub fn methods_named(&self, ty: &TypeDescriptor, name: &str) -> Vec<Arc<MethodDecl>> {
        let mut found: Vec<Arc<MethodDecl>> = Vec::new();
        for class in self.hierarchy(ty) {
            let Some(info) = self.get(class.name()) else {
                continue;
            };
            for method in info.methods.iter().filter(|m| m.name == name) {
                let overridden = found.iter().any(|f| same_erased_params(f, method));
                if !overridden {
                    found.push(Arc::clone(method));
                }
            }
        }
        found
    }

    pub fn constructors(&self, ty: &TypeDescriptor) -> Vec<Arc<MethodDecl>> {
        self.get(ty.name())
            .map(|info| info.constructors.clone())
            .unwrap_or_default()
    }

    pub fn property_named(&self, ty: &TypeDescriptor, name: &str) -> Option<Arc<PropertyDecl>> {
        self.hierarchy(ty).iter().find_map(|class| {
            self.get(class.name())?
                .properties
                .iter()
                .find(|p| p.name == name)
                .cloned()
        })
    }

    /// Fields along the superclass chain.
    pub fn field_named(&self, ty: &TypeDescriptor, name: &str) -> Option<Arc<FieldDecl>> {
        let mut current = Some(ty.boxed().erasure());
        let mut seen = FxHashSet::default();
        while let Some(class) = current {
            if !seen.insert(class.name().to_string()) {
                break;
            }
            let info = self.get(class.name())?;
            if let Some(field) = info.fields.iter().find(|f| f.name == name) {
                return Some(Arc::clone(field));
            }
            current = info.super_class.as_ref().map(|s| s.erasure());
        }
        None
    }

    /// A `static final` field declared on any supertype, interfaces included.
    pub fn constant_named(&self, ty: &TypeDescriptor, name: &str) -> Option<Arc<FieldDecl>> {
        self.hierarchy(ty).iter().skip(1).find_map(|class| {
            self.get(class.name())?
                .fields
                .iter()
                .find(|f| f.name == name && f.is_static && f.is_final)
                .cloned()
        })
    }
}

/// Numeric widening only applies between primitives and their wrappers.
fn is_primitive_or_boxed(ty: &TypeDescriptor) -> bool {
    ty.is_primitive() || ty.unboxed().is_some()
}

fn same_erased_params(a: &MethodDecl, b: &MethodDecl) -> bool {
    a.params.len() == b.params.len()
        && a.params
            .iter()
            .zip(&b.params)
            .all(|(x, y)| x.ty.is_placeholder() || y.ty.is_placeholder() || x.ty == y.ty)
}
