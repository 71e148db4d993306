//! Member declarations the engine can resolve a reference to.

use std::fmt;
use std::sync::Arc;

use gravy_common::Span;

use crate::ty::TypeDescriptor;

/// A declared generic type parameter with its upper bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericSlot {
    pub name: String,
    pub bound: Option<TypeDescriptor>,
}

impl GenericSlot {
    pub fn new(name: impl Into<String>) -> Self {
        GenericSlot {
            name: name.into(),
            bound: None,
        }
    }

    /// What the parameter erases to: its bound, or `Object`.
    pub fn erasure(&self) -> TypeDescriptor {
        self.bound
            .as_ref()
            .map(|b| b.erasure())
            .unwrap_or_else(TypeDescriptor::object)
    }
}

#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub name: String,
    /// Erased declaring class.
    pub declaring_type: TypeDescriptor,
    pub type_params: Vec<GenericSlot>,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeDescriptor,
    pub is_static: bool,
    pub span: Option<Span>,
}

impl MethodDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `name(T1, T2)` with unqualified parameter types.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| p.ty.short().to_string())
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: String,
    pub declaring_type: TypeDescriptor,
    pub ty: TypeDescriptor,
    pub is_static: bool,
    pub is_final: bool,
    pub span: Option<Span>,
}

#[derive(Clone, Debug)]
pub struct PropertyDecl {
    pub name: String,
    pub declaring_type: TypeDescriptor,
    pub ty: TypeDescriptor,
    pub is_static: bool,
    pub span: Option<Span>,
}

/// A local variable or parameter.
#[derive(Clone, Debug)]
pub struct VariableDecl {
    pub name: String,
    pub ty: TypeDescriptor,
    pub span: Option<Span>,
}

/// What a reference resolved to.
#[derive(Clone, Debug)]
pub enum Declaration {
    Field(Arc<FieldDecl>),
    Method(Arc<MethodDecl>),
    Property(Arc<PropertyDecl>),
    Variable(VariableDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Field(f) => &f.name,
            Declaration::Method(m) => &m.name,
            Declaration::Property(p) => &p.name,
            Declaration::Variable(v) => &v.name,
        }
    }

    /// The class declaring this member; `None` for locals.
    pub fn declaring_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Declaration::Field(f) => Some(&f.declaring_type),
            Declaration::Method(m) => Some(&m.declaring_type),
            Declaration::Property(p) => Some(&p.declaring_type),
            Declaration::Variable(_) => None,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Declaration::Field(f) => f.is_static,
            Declaration::Method(m) => m.is_static,
            Declaration::Property(p) => p.is_static,
            Declaration::Variable(_) => false,
        }
    }

    /// Declared type of the member (the return type for methods).
    pub fn declared_type(&self) -> &TypeDescriptor {
        match self {
            Declaration::Field(f) => &f.ty,
            Declaration::Method(m) => &m.return_type,
            Declaration::Property(p) => &p.ty,
            Declaration::Variable(v) => &v.ty,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Declaration::Field(f) => f.span,
            Declaration::Method(m) => m.span,
            Declaration::Property(p) => p.span,
            Declaration::Variable(v) => v.span,
        }
    }

    pub fn as_method(&self) -> Option<&Arc<MethodDecl>> {
        match self {
            Declaration::Method(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Field(d) => write!(f, "field {}.{}", d.declaring_type.short(), d.name),
            Declaration::Method(d) => {
                write!(f, "method {}.{}", d.declaring_type.short(), d.signature())
            }
            Declaration::Property(d) => {
                write!(f, "property {}.{}", d.declaring_type.short(), d.name)
            }
            Declaration::Variable(d) => write!(f, "variable {}", d.name),
        }
    }
}
