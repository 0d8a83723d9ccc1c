//! Literals.
//!
//! Float, text and char literals have fixed types. An integer literal
//! stays untyped until it is assigned: it can become any integer kind it
//! fits in, or a float when the conversion is exact.

use rowan::TextRange;

use crate::assign::require_explicit_type;
use crate::builtins::{core_type, CHAR, FLOAT, INT, NUMBER, STRING};
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{Expr, ExprContext, ExprVal, SemiExpr, SemiExprVal};
use crate::infer::{get_certain_type, TypeArgsInferringContext};
use crate::ty::Type;

/// The largest integer magnitude an `f64` holds exactly.
pub const MAX_SAFE_INTEGER_TO_FLOAT: i128 = 9_007_199_254_740_991;

/// Parse an integer literal: decimal, or `0x` / `0o` / `0b` prefixed,
/// with an optional leading `-`.
pub fn parse_integer(literal: &str) -> Option<i128> {
    let (negative, abs) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let (radix, digits) = match abs.get(..2) {
        Some("0x" | "0X") => (16, &abs[2..]),
        Some("0o" | "0O") => (8, &abs[2..]),
        Some("0b" | "0B") => (2, &abs[2..]),
        _ => (10, abs),
    };
    // from_str_radix would accept a sign of its own.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn check_integer(digits: &str, span: TextRange) -> Result<SemiExpr, ExprError> {
    match parse_integer(digits) {
        Some(value) => Ok(SemiExpr::new(SemiExprVal::Integer(value), span)),
        None => Err(ExprError::new(
            ExprErrorKind::InvalidInteger {
                literal: digits.to_string(),
            },
            span,
        )),
    }
}

/// Whether `value` fits the sized integer kind `kind`; `None` if `kind`
/// is not one.
fn fits_sized(kind: &str, value: i128) -> Option<bool> {
    let fits = match kind {
        "Byte" => u8::try_from(value).is_ok(),
        "Word" => u16::try_from(value).is_ok(),
        "Int32" => i32::try_from(value).is_ok(),
        "Uint32" => u32::try_from(value).is_ok(),
        "Int64" => i64::try_from(value).is_ok(),
        "Uint64" => u64::try_from(value).is_ok(),
        _ => return None,
    };
    Some(fits)
}

pub fn assign_integer_to(
    expected: Option<&Type>,
    value: i128,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let expected = require_explicit_type(expected, span)?;
    let certain = get_certain_type(expected, infer, span)?;
    let overflow = |kind: &str| {
        ExprError::new(
            ExprErrorKind::IntegerOverflow {
                kind: kind.to_string(),
            },
            span,
        )
    };
    if let Type::Named { name, args } = &certain {
        if args.is_empty() && name.is_core() {
            let kind = name.name.as_str();
            if kind == INT {
                return Ok(Expr::new(certain, ExprVal::Int(value), span));
            }
            if kind == FLOAT || kind == NUMBER {
                if value.abs() > MAX_SAFE_INTEGER_TO_FLOAT {
                    return Err(overflow(kind));
                }
                return Ok(Expr::new(certain, ExprVal::Float(value as f64), span));
            }
            match fits_sized(kind, value) {
                Some(true) => return Ok(Expr::new(certain, ExprVal::Int(value), span)),
                Some(false) => return Err(overflow(kind)),
                None => {}
            }
        }
    }
    Err(ExprError::new(
        ExprErrorKind::IntegerAssignedToNonIntegerType {
            non_integer: ctx.describe_inferred(expected, infer),
        },
        span,
    ))
}

pub fn check_float(value: f64, span: TextRange) -> SemiExpr {
    SemiExpr::typed(Expr::new(core_type(FLOAT), ExprVal::Float(value), span))
}

pub fn check_text(value: &str, span: TextRange) -> SemiExpr {
    SemiExpr::typed(Expr::new(core_type(STRING), ExprVal::Text(value.to_string()), span))
}

pub fn check_char(value: char, span: TextRange) -> SemiExpr {
    SemiExpr::typed(Expr::new(core_type(CHAR), ExprVal::Char(value), span))
}
