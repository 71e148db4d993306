//! Statement nodes.

use gravy_common::Span;
use serde::{Deserialize, Serialize};

use crate::decl::Parameter;
use crate::expr::Expr;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block { stmts, span: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Block(Block),
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    /// `for (x in xs)`; the variable's type may be omitted.
    ForIn {
        var: Parameter,
        collection: Expr,
        body: Block,
    },
    /// Classic `for (init; condition; update)`.
    For {
        init: Option<Expr>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Block,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Switch {
        subject: Expr,
        cases: Vec<CaseClause>,
        default: Option<Block>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Assert {
        condition: Expr,
        message: Option<Expr>,
    },
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Parameter,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    pub value: Expr,
    pub body: Block,
}
