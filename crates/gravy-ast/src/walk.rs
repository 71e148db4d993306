//! Mutable pre-order walk over every expression in a module.
//!
//! Used to assign expression ids to trees that did not come from
//! [`crate::AstBuilder`] (for example, trees loaded from JSON).

use crate::decl::{ClassNode, MethodNode, ModuleNode, Parameter};
use crate::expr::{Expr, ExprId, ExprKind};
use crate::stmt::{Block, Stmt};

impl ModuleNode {
    /// Give every expression a fresh id, in pre-order. Returns the number
    /// of expressions visited.
    pub fn renumber(&mut self) -> u32 {
        let mut next = 0u32;
        self.walk_exprs_mut(&mut |expr| {
            expr.id = ExprId(next);
            next += 1;
        });
        next
    }

    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        for class in &mut self.classes {
            walk_class(class, f);
        }
    }
}

fn walk_class(class: &mut ClassNode, f: &mut dyn FnMut(&mut Expr)) {
    for field in &mut class.fields {
        if let Some(init) = &mut field.initializer {
            walk_expr(init, f);
        }
    }
    for prop in &mut class.properties {
        if let Some(init) = &mut prop.initializer {
            walk_expr(init, f);
        }
    }
    for method in class.constructors.iter_mut().chain(class.methods.iter_mut()) {
        walk_method(method, f);
    }
    for init in &mut class.initializers {
        walk_block(&mut init.body, f);
    }
    for inner in &mut class.inner_classes {
        walk_class(inner, f);
    }
}

fn walk_method(method: &mut MethodNode, f: &mut dyn FnMut(&mut Expr)) {
    walk_params(&mut method.params, f);
    if let Some(body) = &mut method.body {
        walk_block(body, f);
    }
}

fn walk_params(params: &mut [Parameter], f: &mut dyn FnMut(&mut Expr)) {
    for param in params {
        if let Some(default) = &mut param.default_value {
            walk_expr(default, f);
        }
    }
}

fn walk_block(block: &mut Block, f: &mut dyn FnMut(&mut Expr)) {
    for stmt in &mut block.stmts {
        walk_stmt(stmt, f);
    }
}

fn walk_stmt(stmt: &mut Stmt, f: &mut dyn FnMut(&mut Expr)) {
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) => walk_expr(e, f),
        Stmt::Block(b) => walk_block(b, f),
        Stmt::If {
            condition,
            then_block,
            else_block,
        } => {
            walk_expr(condition, f);
            walk_block(then_block, f);
            if let Some(b) = else_block {
                walk_block(b, f);
            }
        }
        Stmt::While { condition, body } => {
            walk_expr(condition, f);
            walk_block(body, f);
        }
        Stmt::ForIn {
            var,
            collection,
            body,
        } => {
            walk_params(std::slice::from_mut(var), f);
            walk_expr(collection, f);
            walk_block(body, f);
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
        } => {
            for e in [init, condition, update].into_iter().flatten() {
                walk_expr(e, f);
            }
            walk_block(body, f);
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            walk_block(body, f);
            for c in catches {
                walk_block(&mut c.body, f);
            }
            if let Some(b) = finally {
                walk_block(b, f);
            }
        }
        Stmt::Switch {
            subject,
            cases,
            default,
        } => {
            walk_expr(subject, f);
            for case in cases {
                walk_expr(&mut case.value, f);
                walk_block(&mut case.body, f);
            }
            if let Some(b) = default {
                walk_block(b, f);
            }
        }
        Stmt::Return(e) => {
            if let Some(e) = e {
                walk_expr(e, f);
            }
        }
        Stmt::Assert { condition, message } => {
            walk_expr(condition, f);
            if let Some(m) = message {
                walk_expr(m, f);
            }
        }
        Stmt::Break | Stmt::Continue => {}
    }
}

fn walk_expr(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    f(expr);
    match &mut expr.kind {
        ExprKind::Constant(_) | ExprKind::Variable(_) | ExprKind::Class(_) => {}
        ExprKind::GString { values, .. } | ExprKind::List(values) => {
            for v in values {
                walk_expr(v, f);
            }
        }
        ExprKind::Property {
            object, property, ..
        } => {
            walk_expr(object, f);
            walk_expr(property, f);
        }
        ExprKind::Attribute { object, attribute } => {
            walk_expr(object, f);
            walk_expr(attribute, f);
        }
        ExprKind::MethodCall {
            receiver,
            method,
            args,
            ..
        } => {
            walk_expr(receiver, f);
            walk_expr(method, f);
            for a in args {
                walk_expr(a, f);
            }
        }
        ExprKind::StaticMethodCall { args, .. } | ExprKind::ConstructorCall { args, .. } => {
            for a in args {
                walk_expr(a, f);
            }
        }
        ExprKind::MethodPointer { object, method } => {
            walk_expr(object, f);
            walk_expr(method, f);
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, f),
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            walk_expr(condition, f);
            walk_expr(then_expr, f);
            walk_expr(else_expr, f);
        }
        ExprKind::Elvis { value, fallback } => {
            walk_expr(value, f);
            walk_expr(fallback, f);
        }
        ExprKind::Cast { expr, .. } | ExprKind::Spread(expr) => walk_expr(expr, f),
        ExprKind::Map(entries) => {
            for entry in entries {
                walk_expr(&mut entry.key, f);
                walk_expr(&mut entry.value, f);
            }
        }
        ExprKind::Range { from, to, .. } => {
            walk_expr(from, f);
            walk_expr(to, f);
        }
        ExprKind::Closure(closure) => {
            if let Some(params) = &mut closure.params {
                walk_params(params, f);
            }
            walk_block(&mut closure.body, f);
        }
        ExprKind::Declaration(decl) => {
            for var in &mut decl.vars {
                walk_expr(&mut var.var, f);
            }
            if let Some(init) = &mut decl.init {
                walk_expr(init, f);
            }
        }
    }
}
