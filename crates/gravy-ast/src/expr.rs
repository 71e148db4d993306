//! Expression nodes.
//!
//! Mirrors the shape of a Groovy compiler AST: method names and property
//! names are themselves expressions (usually string constants) so that the
//! engine can report a type for the name separately from the whole call.

use std::fmt;

use gravy_common::Span;
use serde::{Deserialize, Serialize};

use crate::decl::Parameter;
use crate::stmt::Block;
use crate::types::TypeRef;

/// Identity of an expression within one module. Assigned by [`crate::AstBuilder`]
/// or by [`crate::ModuleNode::renumber`] after loading from JSON.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub id: ExprId,
    #[serde(default)]
    pub span: Option<Span>,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Constant(Literal),
    /// `"a ${b} c"`: literal fragments and embedded values.
    GString { strings: Vec<String>, values: Vec<Expr> },
    /// A bare name, including `this` and `super`.
    Variable(String),
    /// A type used as a value: `String`, `Foo.class`.
    Class(TypeRef),
    Property {
        object: Box<Expr>,
        property: Box<Expr>,
        #[serde(default)]
        safe: bool,
        #[serde(default)]
        spread: bool,
    },
    /// Direct field access: `obj.@field`.
    Attribute { object: Box<Expr>, attribute: Box<Expr> },
    MethodCall {
        receiver: Box<Expr>,
        method: Box<Expr>,
        args: Vec<Expr>,
        /// The receiver is an implicit `this` that does not appear in source.
        #[serde(default)]
        implicit_this: bool,
        #[serde(default)]
        safe: bool,
        #[serde(default)]
        spread: bool,
    },
    /// A call to a statically imported method: `max(1, 2)` after
    /// `import static java.lang.Math.max`.
    StaticMethodCall { owner: TypeRef, method: String, args: Vec<Expr> },
    ConstructorCall { ty: TypeRef, args: Vec<Expr> },
    /// `obj.&name`
    MethodPointer { object: Box<Expr>, method: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Ternary { condition: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    /// `value ?: fallback`
    Elvis { value: Box<Expr>, fallback: Box<Expr> },
    /// `(T) expr` or, with `coerce`, `expr as T`.
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
        #[serde(default)]
        coerce: bool,
    },
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Range { from: Box<Expr>, to: Box<Expr>, inclusive: bool },
    Closure(ClosureExpr),
    /// `def x = 1`, `String s`, `def (a, b) = [1, 2]`.
    Declaration(Declaration),
    /// `*list` inside an argument or list literal.
    Spread(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    String(String),
    Number { text: String, kind: NumberKind },
}

/// The literal type the parser assigned to a numeric constant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberKind {
    Int,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosureExpr {
    /// `None` for a closure without a parameter list, which gets the
    /// implicit `it` parameter.
    pub params: Option<Vec<Parameter>>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub vars: Vec<VarDecl>,
    /// `def (a, b) = ...` multiple assignment.
    #[serde(default)]
    pub tuple: bool,
    pub init: Option<Box<Expr>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Always an `ExprKind::Variable`.
    pub var: Expr,
    /// `None` for `def`.
    pub ty: Option<TypeRef>,
}

impl VarDecl {
    pub fn name(&self) -> &str {
        match &self.var.kind {
            ExprKind::Variable(name) => name,
            _ => "",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Assign,
    PlusAssign,
    MinusAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
    LeftShiftAssign,
    ElvisAssign,
    Plus,
    Minus,
    Multiply,
    Divide,
    IntDivide,
    Remainder,
    Power,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `<=>`
    Compare,
    /// `=~`
    RegexFind,
    /// `==~`
    RegexMatch,
    In,
    NotIn,
    InstanceOf,
    /// `a[b]`
    Index,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Assign => "=",
            BinaryOp::PlusAssign => "+=",
            BinaryOp::MinusAssign => "-=",
            BinaryOp::MultiplyAssign => "*=",
            BinaryOp::DivideAssign => "/=",
            BinaryOp::RemainderAssign => "%=",
            BinaryOp::LeftShiftAssign => "<<=",
            BinaryOp::ElvisAssign => "?=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "intdiv",
            BinaryOp::Remainder => "%",
            BinaryOp::Power => "**",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::UnsignedRightShift => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Compare => "<=>",
            BinaryOp::RegexFind => "=~",
            BinaryOp::RegexMatch => "==~",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "!in",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::Index => "[]",
        }
    }

    /// Plain `=` and the compound `op=` forms.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::PlusAssign
                | BinaryOp::MinusAssign
                | BinaryOp::MultiplyAssign
                | BinaryOp::DivideAssign
                | BinaryOp::RemainderAssign
                | BinaryOp::LeftShiftAssign
                | BinaryOp::ElvisAssign
        )
    }

    /// For `a += b`, the operator applied before assigning (`+`).
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::PlusAssign => Some(BinaryOp::Plus),
            BinaryOp::MinusAssign => Some(BinaryOp::Minus),
            BinaryOp::MultiplyAssign => Some(BinaryOp::Multiply),
            BinaryOp::DivideAssign => Some(BinaryOp::Divide),
            BinaryOp::RemainderAssign => Some(BinaryOp::Remainder),
            BinaryOp::LeftShiftAssign => Some(BinaryOp::LeftShift),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Positive,
    BitwiseNegate,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: ExprId::default(),
            span: None,
            kind,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// The span, if the node has a usable source position.
    pub fn valid_span(&self) -> Option<Span> {
        self.span.filter(|s| s.is_valid())
    }

    /// The simple name carried by a variable or string constant, used for
    /// method and property names.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            ExprKind::Constant(Literal::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_this(&self) -> bool {
        matches!(&self.kind, ExprKind::Variable(name) if name == "this")
    }

    pub fn is_closure(&self) -> bool {
        matches!(self.kind, ExprKind::Closure(_))
    }

    /// Short human-readable label used in traces and diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Constant(Literal::Null) => "null".to_string(),
            ExprKind::Constant(Literal::Bool(b)) => b.to_string(),
            ExprKind::Constant(Literal::String(s)) => format!("'{}'", s),
            ExprKind::Constant(Literal::Number { text, .. }) => text.clone(),
            ExprKind::GString { .. } => "gstring".to_string(),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::Class(ty) => ty.to_string(),
            ExprKind::Property { property, .. } => {
                format!(".{}", property.name().unwrap_or("?"))
            }
            ExprKind::Attribute { attribute, .. } => {
                format!(".@{}", attribute.name().unwrap_or("?"))
            }
            ExprKind::MethodCall { method, .. } => {
                format!("{}(..)", method.name().unwrap_or("?"))
            }
            ExprKind::StaticMethodCall { method, .. } => format!("{}(..)", method),
            ExprKind::ConstructorCall { ty, .. } => format!("new {}(..)", ty),
            ExprKind::MethodPointer { method, .. } => {
                format!(".&{}", method.name().unwrap_or("?"))
            }
            ExprKind::Binary { op, .. } => format!("binary {}", op.symbol()),
            ExprKind::Unary { op, .. } => format!("unary {:?}", op),
            ExprKind::Ternary { .. } => "ternary".to_string(),
            ExprKind::Elvis { .. } => "elvis".to_string(),
            ExprKind::Cast { ty, .. } => format!("cast {}", ty),
            ExprKind::List(_) => "list".to_string(),
            ExprKind::Map(_) => "map".to_string(),
            ExprKind::Range { .. } => "range".to_string(),
            ExprKind::Closure(_) => "closure".to_string(),
            ExprKind::Declaration(decl) => {
                let names: Vec<&str> = decl.vars.iter().map(|v| v.name()).collect();
                format!("declare {}", names.join(", "))
            }
            ExprKind::Spread(_) => "spread".to_string(),
        }
    }
}
