//! Programmatic construction of trees with unique expression ids.
//!
//! Embedders and tests that do not go through a parser build trees here.
//! All methods take `&self` so that nested construction reads naturally:
//!
//! ```
//! use gravy_ast::AstBuilder;
//! let b = AstBuilder::new();
//! let call = b.call(b.var("names"), "collect", vec![b.closure_it(vec![])]);
//! assert!(call.describe().starts_with("collect"));
//! ```

use std::cell::Cell;

use gravy_common::Span;

use crate::decl::Parameter;
use crate::expr::{
    BinaryOp, ClosureExpr, Declaration, Expr, ExprId, ExprKind, Literal, MapEntry, NumberKind,
    UnaryOp, VarDecl,
};
use crate::stmt::{Block, Stmt};
use crate::types::TypeRef;

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: Cell<u32>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering after ids already used elsewhere in the module.
    pub fn starting_at(first: u32) -> Self {
        AstBuilder {
            next_id: Cell::new(first),
        }
    }

    pub fn expr(&self, kind: ExprKind) -> Expr {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Expr {
            id: ExprId(id),
            span: None,
            kind,
        }
    }

    /// Attach a source span to an already-built expression.
    pub fn at(&self, expr: Expr, start: u32, end: u32) -> Expr {
        expr.with_span(Span::new(start, end))
    }

    // ── Literals ─────────────────────────────────────────────────────

    pub fn null(&self) -> Expr {
        self.expr(ExprKind::Constant(Literal::Null))
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.expr(ExprKind::Constant(Literal::Bool(value)))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::Constant(Literal::String(value.to_string())))
    }

    pub fn int(&self, value: i64) -> Expr {
        self.number(&value.to_string(), NumberKind::Int)
    }

    pub fn number(&self, text: &str, kind: NumberKind) -> Expr {
        self.expr(ExprKind::Constant(Literal::Number {
            text: text.to_string(),
            kind,
        }))
    }

    pub fn gstring(&self, strings: &[&str], values: Vec<Expr>) -> Expr {
        self.expr(ExprKind::GString {
            strings: strings.iter().map(|s| s.to_string()).collect(),
            values,
        })
    }

    // ── Names and members ────────────────────────────────────────────

    pub fn var(&self, name: &str) -> Expr {
        self.expr(ExprKind::Variable(name.to_string()))
    }

    pub fn this(&self) -> Expr {
        self.var("this")
    }

    pub fn class(&self, ty: TypeRef) -> Expr {
        self.expr(ExprKind::Class(ty))
    }

    pub fn prop(&self, object: Expr, name: &str) -> Expr {
        let property = self.string(name);
        self.expr(ExprKind::Property {
            object: Box::new(object),
            property: Box::new(property),
            safe: false,
            spread: false,
        })
    }

    pub fn attribute(&self, object: Expr, name: &str) -> Expr {
        let attribute = self.string(name);
        self.expr(ExprKind::Attribute {
            object: Box::new(object),
            attribute: Box::new(attribute),
        })
    }

    /// `receiver.name(args)`
    pub fn call(&self, receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
        let method = self.string(name);
        self.expr(ExprKind::MethodCall {
            receiver: Box::new(receiver),
            method: Box::new(method),
            args,
            implicit_this: false,
            safe: false,
            spread: false,
        })
    }

    /// `name(args)` with an implicit `this` receiver.
    pub fn call_implicit(&self, name: &str, args: Vec<Expr>) -> Expr {
        let receiver = self.this();
        let method = self.string(name);
        self.expr(ExprKind::MethodCall {
            receiver: Box::new(receiver),
            method: Box::new(method),
            args,
            implicit_this: true,
            safe: false,
            spread: false,
        })
    }

    /// `receiver*.name(args)`
    pub fn spread_call(&self, receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
        let mut call = self.call(receiver, name, args);
        if let ExprKind::MethodCall { spread, .. } = &mut call.kind {
            *spread = true;
        }
        call
    }

    pub fn static_call(&self, owner: TypeRef, name: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::StaticMethodCall {
            owner,
            method: name.to_string(),
            args,
        })
    }

    pub fn new_instance(&self, ty: TypeRef, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ConstructorCall { ty, args })
    }

    pub fn method_pointer(&self, object: Expr, name: &str) -> Expr {
        let method = self.string(name);
        self.expr(ExprKind::MethodPointer {
            object: Box::new(object),
            method: Box::new(method),
        })
    }

    // ── Operators ────────────────────────────────────────────────────

    pub fn binary(&self, left: Expr, op: BinaryOp, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn assign(&self, left: Expr, right: Expr) -> Expr {
        self.binary(left, BinaryOp::Assign, right)
    }

    pub fn index(&self, object: Expr, index: Expr) -> Expr {
        self.binary(object, BinaryOp::Index, index)
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn ternary(&self, condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        self.expr(ExprKind::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn elvis(&self, value: Expr, fallback: Expr) -> Expr {
        self.expr(ExprKind::Elvis {
            value: Box::new(value),
            fallback: Box::new(fallback),
        })
    }

    pub fn cast(&self, ty: TypeRef, expr: Expr) -> Expr {
        self.expr(ExprKind::Cast {
            ty,
            expr: Box::new(expr),
            coerce: false,
        })
    }

    pub fn as_type(&self, expr: Expr, ty: TypeRef) -> Expr {
        self.expr(ExprKind::Cast {
            ty,
            expr: Box::new(expr),
            coerce: true,
        })
    }

    // ── Collections ──────────────────────────────────────────────────

    pub fn list(&self, items: Vec<Expr>) -> Expr {
        self.expr(ExprKind::List(items))
    }

    pub fn map(&self, entries: Vec<(Expr, Expr)>) -> Expr {
        self.expr(ExprKind::Map(
            entries
                .into_iter()
                .map(|(key, value)| MapEntry { key, value })
                .collect(),
        ))
    }

    pub fn range(&self, from: Expr, to: Expr) -> Expr {
        self.expr(ExprKind::Range {
            from: Box::new(from),
            to: Box::new(to),
            inclusive: true,
        })
    }

    pub fn spread(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::Spread(Box::new(expr)))
    }

    // ── Closures and declarations ────────────────────────────────────

    /// A closure with the implicit `it` parameter.
    pub fn closure_it(&self, body: Vec<Stmt>) -> Expr {
        self.expr(ExprKind::Closure(ClosureExpr {
            params: None,
            body: Block::new(body),
        }))
    }

    pub fn closure(&self, params: Vec<Parameter>, body: Vec<Stmt>) -> Expr {
        self.expr(ExprKind::Closure(ClosureExpr {
            params: Some(params),
            body: Block::new(body),
        }))
    }

    /// `def name = init` (or `Type name = init` when `ty` is given).
    pub fn declare(&self, name: &str, ty: Option<TypeRef>, init: Option<Expr>) -> Expr {
        let var = self.var(name);
        self.expr(ExprKind::Declaration(Declaration {
            vars: vec![VarDecl { var, ty }],
            tuple: false,
            init: init.map(Box::new),
        }))
    }

    /// `def (a, b) = init`
    pub fn declare_tuple(&self, names: &[&str], init: Expr) -> Expr {
        let vars = names
            .iter()
            .map(|name| VarDecl {
                var: self.var(name),
                ty: None,
            })
            .collect();
        self.expr(ExprKind::Declaration(Declaration {
            vars,
            tuple: true,
            init: Some(Box::new(init)),
        }))
    }

    // ── Statements ───────────────────────────────────────────────────

    pub fn stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        Block::new(stmts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_sequential() {
        let b = AstBuilder::new();
        let call = b.call(b.var("xs"), "size", vec![]);
        match &call.kind {
            ExprKind::MethodCall {
                receiver, method, ..
            } => {
                assert_eq!(receiver.id, ExprId(0));
                assert_eq!(method.id, ExprId(1));
            }
            other => panic!("expected method call, got {:?}", other),
        }
        assert_eq!(call.id, ExprId(2));
    }

    #[test]
    fn implicit_this_call_marks_receiver() {
        let b = AstBuilder::new();
        let call = b.call_implicit("println", vec![b.string("hi")]);
        match &call.kind {
            ExprKind::MethodCall {
                receiver,
                implicit_this,
                ..
            } => {
                assert!(*implicit_this);
                assert!(receiver.is_this());
            }
            other => panic!("expected method call, got {:?}", other),
        }
    }
}
