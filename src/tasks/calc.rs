//! Four-function arithmetic.
//!
//! Add, subtract and multiply are evaluated in `i128`, which cannot overflow
//! for `i64` operands, and widened to `f64`. Divide is `x as f64 / y as f64`.

use crate::error::CalcError;

use super::model::{CalcRequest, Operand};

/// Evaluate a request. Faults are returned, never raised.
pub fn evaluate(request: &CalcRequest) -> Result<f64, CalcError> {
    let x = i128::from(request.x);
    let y = i128::from(request.y);

    let value = match request.operand {
        Operand::Add => (x + y) as f64,
        Operand::Subtract => (x - y) as f64,
        Operand::Multiply => (x * y) as f64,
        Operand::Divide => {
            if y == 0 {
                return Err(CalcError::DivisionByZero);
            }
            request.x as f64 / request.y as f64
        }
    };

    Ok(value)
}
