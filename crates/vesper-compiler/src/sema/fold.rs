//! Constant folding arithmetic.
//!
//! Folding always computes at unbounded precision and narrows to the
//! result type's width afterwards, so intermediate overflow cannot change
//! the outcome.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use vesper_ast::{BinaryOp, CompareOp};

/// Why a fold could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldError {
    /// Literal division or remainder by zero.
    DivisionByZero,
    /// Shift amount is negative or absurdly large.
    ShiftOutOfRange,
}

/// Largest literal shift accepted; anything wider than the widest integer
/// type is meaningless.
const MAX_SHIFT: u64 = 512;

/// Apply a binary operator to two literal integers at full precision.
pub fn fold_binary(op: BinaryOp, left: &BigInt, right: &BigInt) -> Result<BigInt, FoldError> {
    Ok(match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => {
            if right.is_zero() {
                return Err(FoldError::DivisionByZero);
            }
            left / right
        }
        BinaryOp::Mod => {
            if right.is_zero() {
                return Err(FoldError::DivisionByZero);
            }
            left % right
        }
        BinaryOp::BitAnd => left & right,
        BinaryOp::BitOr => left | right,
        BinaryOp::BitXor => left ^ right,
        BinaryOp::Shl => left << shift_amount(right)?,
        BinaryOp::Shr => left >> shift_amount(right)?,
    })
}

fn shift_amount(amount: &BigInt) -> Result<usize, FoldError> {
    match amount.to_u64() {
        Some(n) if n <= MAX_SHIFT => Ok(n as usize),
        _ => Err(FoldError::ShiftOutOfRange),
    }
}

/// Apply a comparison operator to two literal integers.
pub fn fold_compare(op: CompareOp, left: &BigInt, right: &BigInt) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Lt => left < right,
        CompareOp::Le => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::Ge => left >= right,
    }
}

/// Wrap a value into the two's-complement range of a runtime width.
pub fn narrow_to_width(value: &BigInt, signed: bool, bits: u16) -> BigInt {
    let modulus = BigInt::one() << bits as usize;
    let mut wrapped = value % &modulus;
    if wrapped.is_negative() {
        wrapped += &modulus;
    }
    if signed && wrapped >= (BigInt::one() << (bits as usize - 1)) {
        wrapped -= &modulus;
    }
    wrapped
}
