//! Declaration nodes: modules, imports, types and their members.

use gravy_common::Span;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::stmt::Block;
use crate::types::{GenericParam, TypeRef};

/// Name of the synthetic method holding a script's top-level statements.
pub const SCRIPT_RUN_METHOD: &str = "run";

/// One compilation unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub name: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub imports: Vec<ImportNode>,
    #[serde(default)]
    pub classes: Vec<ClassNode>,
}

impl ModuleNode {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleNode {
            name: name.into(),
            ..ModuleNode::default()
        }
    }

    pub fn with_import(mut self, import: ImportNode) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_class(mut self, class: ClassNode) -> Self {
        self.classes.push(class);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import a.b.C` or `import a.b.C as D`
    Type,
    /// `import a.b.*`
    Star,
    /// `import static a.b.C.member` or `... as alias`
    Static,
    /// `import static a.b.C.*`
    StaticStar,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportNode {
    pub kind: ImportKind,
    /// Qualified type name (or package name for star imports).
    pub type_name: String,
    #[serde(default)]
    pub member: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl ImportNode {
    pub fn of_type(type_name: impl Into<String>) -> Self {
        ImportNode {
            kind: ImportKind::Type,
            type_name: type_name.into(),
            member: None,
            alias: None,
            span: None,
        }
    }

    pub fn of_static(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        ImportNode {
            kind: ImportKind::Static,
            member: Some(member.into()),
            ..ImportNode::of_type(type_name)
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The simple name this import makes visible, if it makes one visible.
    pub fn visible_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match self.kind {
            ImportKind::Type => self.type_name.rsplit('.').next(),
            ImportKind::Static => self.member.as_deref(),
            ImportKind::Star | ImportKind::StaticStar => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_abstract: bool,
}

impl Modifiers {
    pub fn static_() -> Self {
        Modifiers {
            is_static: true,
            ..Modifiers::default()
        }
    }

    pub fn static_final() -> Self {
        Modifiers {
            is_static: true,
            is_final: true,
            ..Modifiers::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    /// Fully-qualified name.
    pub name: String,
    #[serde(default)]
    pub generics: Vec<GenericParam>,
    #[serde(default)]
    pub super_class: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub is_interface: bool,
    /// A script class; its statements live in the `run` method.
    #[serde(default)]
    pub is_script: bool,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
    #[serde(default)]
    pub properties: Vec<PropertyNode>,
    #[serde(default)]
    pub constructors: Vec<MethodNode>,
    #[serde(default)]
    pub methods: Vec<MethodNode>,
    #[serde(default)]
    pub initializers: Vec<Initializer>,
    #[serde(default)]
    pub inner_classes: Vec<ClassNode>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl ClassNode {
    pub fn new(name: impl Into<String>) -> Self {
        ClassNode {
            name: name.into(),
            ..ClassNode::default()
        }
    }

    /// A script class whose top-level statements form the `run` method.
    pub fn script(name: impl Into<String>, body: Block) -> Self {
        let run = MethodNode::new(SCRIPT_RUN_METHOD, Vec::new(), body);
        ClassNode {
            name: name.into(),
            is_script: true,
            super_class: Some(TypeRef::named("groovy.lang.Script")),
            methods: vec![run],
            ..ClassNode::default()
        }
    }

    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_super(mut self, super_class: TypeRef) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn with_interface(mut self, iface: TypeRef) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn with_field(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_property(mut self, property: PropertyNode) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_method(mut self, method: MethodNode) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constructor(mut self, ctor: MethodNode) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn with_initializer(mut self, init: Initializer) -> Self {
        self.initializers.push(init);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit(|c| c == '.' || c == '$').next().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    /// `None` for a `def` field.
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, ty: Option<TypeRef>) -> Self {
        FieldNode {
            name: name.into(),
            ty,
            modifiers: Modifiers::default(),
            initializer: None,
            span: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A Groovy property: a field with generated accessors. Shares the field
/// shape; kept as a distinct node because references resolve to it first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyNode {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl PropertyNode {
    pub fn new(name: impl Into<String>, ty: Option<TypeRef>) -> Self {
        PropertyNode {
            name: name.into(),
            ty,
            modifiers: Modifiers::default(),
            initializer: None,
            span: None,
        }
    }

    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub name: String,
    #[serde(default)]
    pub generics: Vec<GenericParam>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    /// `None` for `def` methods.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// `None` for abstract and interface methods.
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl MethodNode {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, body: Block) -> Self {
        MethodNode {
            name: name.into(),
            generics: Vec::new(),
            params,
            return_type: None,
            modifiers: Modifiers::default(),
            body: Some(body),
            span: None,
        }
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub default_value: Option<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Option<TypeRef>) -> Self {
        Parameter {
            name: name.into(),
            ty,
            default_value: None,
            span: None,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Parameter::new(name, None)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// An instance or static initializer block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    #[serde(default)]
    pub is_static: bool,
    pub body: Block,
    #[serde(default)]
    pub span: Option<Span>,
}
