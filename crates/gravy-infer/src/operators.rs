//! Operator typing.
//!
//! Arithmetic, comparison and a few collection operators have fixed result
//! types, the same ones the compiler hard-wires. Everything else maps to a
//! method (`+` is `plus`, `[]` is `getAt`) looked up on the left operand.

use gravy_ast::{BinaryOp, UnaryOp};

use crate::class_table::ClassTable;
use crate::ty::{names, TypeDescriptor};

/// The method a binary operator dispatches to.
pub fn binary_method(op: BinaryOp) -> Option<&'static str> {
    let name = match op {
        BinaryOp::Plus => "plus",
        BinaryOp::Minus => "minus",
        BinaryOp::Multiply => "multiply",
        BinaryOp::Divide => "div",
        BinaryOp::IntDivide => "intdiv",
        BinaryOp::Remainder => "mod",
        BinaryOp::Power => "power",
        BinaryOp::LeftShift => "leftShift",
        BinaryOp::RightShift => "rightShift",
        BinaryOp::UnsignedRightShift => "rightShiftUnsigned",
        BinaryOp::BitAnd => "and",
        BinaryOp::BitOr => "or",
        BinaryOp::BitXor => "xor",
        BinaryOp::Index => "getAt",
        BinaryOp::Compare => "compareTo",
        BinaryOp::In | BinaryOp::NotIn => "isCase",
        _ => return None,
    };
    Some(name)
}

/// The method a unary operator dispatches to.
pub fn unary_method(op: UnaryOp) -> Option<&'static str> {
    match op {
        UnaryOp::Negate => Some("negative"),
        UnaryOp::Positive => Some("positive"),
        UnaryOp::BitwiseNegate => Some("bitwiseNegate"),
        UnaryOp::PreIncrement | UnaryOp::PostIncrement => Some("next"),
        UnaryOp::PreDecrement | UnaryOp::PostDecrement => Some("previous"),
        UnaryOp::Not => None,
    }
}

fn is_integral(ty: &TypeDescriptor) -> bool {
    ty.numeric_rank().is_some_and(|r| r <= 2)
}

fn is_boolean(ty: &TypeDescriptor) -> bool {
    ty.name() == "boolean" || ty.name() == names::BOOLEAN
}

fn is_collection(table: &ClassTable, ty: &TypeDescriptor) -> bool {
    !ty.is_object() && table.is_assignable(ty, &TypeDescriptor::class(names::COLLECTION))
}

fn is_builder(ty: &TypeDescriptor) -> bool {
    matches!(ty.name(), "java.lang.StringBuilder" | "java.lang.StringBuffer")
}

/// Binary numeric promotion. Sub-`int` operands widen to `int`; float
/// arithmetic is carried out in `double`. The result stays primitive
/// only when both operands are.
pub fn promote(l: &TypeDescriptor, r: &TypeDescriptor) -> Option<TypeDescriptor> {
    let (rl, rr) = (l.numeric_rank()?, r.numeric_rank()?);
    let both_primitive = l.is_primitive() && r.is_primitive();
    let primitive = |name: &str| {
        let ty = TypeDescriptor::class(name);
        if both_primitive {
            ty
        } else {
            ty.boxed()
        }
    };
    let ty = match rl.max(rr) {
        0 => primitive("int"),
        1 => primitive("long"),
        2 => TypeDescriptor::class(names::BIG_INTEGER),
        3 => TypeDescriptor::class(names::BIG_DECIMAL),
        4 | 5 => primitive("double"),
        _ => TypeDescriptor::class(names::NUMBER),
    };
    Some(ty)
}

/// `/` on two integral or decimal operands yields `BigDecimal`.
fn divide(l: &TypeDescriptor, r: &TypeDescriptor) -> Option<TypeDescriptor> {
    let wider = l.numeric_rank()?.max(r.numeric_rank()?);
    if wider <= 3 {
        Some(TypeDescriptor::class(names::BIG_DECIMAL))
    } else {
        promote(l, r)
    }
}

/// The fixed result type of `l op r`, if the operator has one for these
/// operand types. Assignment operators are not handled here.
pub fn binary_shortcut(
    table: &ClassTable,
    op: BinaryOp,
    l: &TypeDescriptor,
    r: &TypeDescriptor,
) -> Option<TypeDescriptor> {
    let both_numeric = l.is_numeric() && r.is_numeric();
    match op {
        BinaryOp::Equal
        | BinaryOp::NotEqual
        | BinaryOp::Identical
        | BinaryOp::NotIdentical
        | BinaryOp::Less
        | BinaryOp::LessEqual
        | BinaryOp::Greater
        | BinaryOp::GreaterEqual
        | BinaryOp::LogicalAnd
        | BinaryOp::LogicalOr
        | BinaryOp::RegexMatch
        | BinaryOp::In
        | BinaryOp::NotIn
        | BinaryOp::InstanceOf => Some(TypeDescriptor::boolean()),
        BinaryOp::Compare => Some(TypeDescriptor::int()),
        BinaryOp::RegexFind => Some(TypeDescriptor::class(names::MATCHER)),
        BinaryOp::Plus => {
            if l.is_string_like() {
                Some(TypeDescriptor::string())
            } else if both_numeric {
                promote(l, r)
            } else if is_collection(table, l) {
                Some(l.clone())
            } else {
                None
            }
        }
        BinaryOp::Minus => {
            if both_numeric {
                promote(l, r)
            } else if l.is_string_like() {
                Some(TypeDescriptor::string())
            } else if is_collection(table, l) {
                Some(l.clone())
            } else {
                None
            }
        }
        BinaryOp::Multiply => {
            if both_numeric {
                promote(l, r)
            } else if l.is_string_like() && r.is_numeric() {
                Some(TypeDescriptor::string())
            } else if is_collection(table, l) && r.is_numeric() {
                Some(l.clone())
            } else {
                None
            }
        }
        BinaryOp::Divide if both_numeric => divide(l, r),
        BinaryOp::IntDivide if is_integral(l) && is_integral(r) => promote(l, r),
        BinaryOp::Remainder | BinaryOp::Power if both_numeric => promote(l, r),
        BinaryOp::LeftShift => {
            if is_integral(l) && is_integral(r) {
                promote(l, &TypeDescriptor::int())
            } else if is_collection(table, l) || is_builder(l) {
                Some(l.clone())
            } else if l.is_string_like() {
                Some(TypeDescriptor::class("java.lang.StringBuffer"))
            } else {
                None
            }
        }
        BinaryOp::RightShift | BinaryOp::UnsignedRightShift if is_integral(l) && is_integral(r) => {
            promote(l, &TypeDescriptor::int())
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            if is_boolean(l) && is_boolean(r) {
                Some(TypeDescriptor::boolean())
            } else if is_integral(l) && is_integral(r) {
                promote(l, r)
            } else {
                None
            }
        }
        BinaryOp::Index => l.component().cloned(),
        _ => None,
    }
}

/// The fixed result type of a unary operator, if it has one for `operand`.
pub fn unary_shortcut(op: UnaryOp, operand: &TypeDescriptor) -> Option<TypeDescriptor> {
    match op {
        UnaryOp::Not => Some(TypeDescriptor::boolean()),
        UnaryOp::Negate
        | UnaryOp::Positive
        | UnaryOp::PreIncrement
        | UnaryOp::PostIncrement
        | UnaryOp::PreDecrement
        | UnaryOp::PostDecrement => operand.is_numeric().then(|| operand.clone()),
        UnaryOp::BitwiseNegate => is_integral(operand).then(|| operand.clone()),
    }
}
