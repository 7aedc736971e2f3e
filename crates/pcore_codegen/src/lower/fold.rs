//! Compile time evaluation of constant expressions

use pcore_ast::{Expr, Literal};

use crate::backend::{BinaryInst, Cmp, Conversion, UnaryInst};
use crate::error::{LoweringError, LoweringResult};
use crate::lower::common_type;
use crate::types::{Constant, ValueType};

/// Parses a literal into an immediate of its declared type
pub fn literal(literal: &Literal) -> LoweringResult<Constant> {
    let invalid = || LoweringError::InvalidLiteral {
        value: literal.value.clone(),
        ty: literal.ty.clone(),
    };
    match literal.ty.as_str() {
        "Integer" => literal
            .value
            .parse::<i32>()
            .map(Constant::Int32)
            .map_err(|_| invalid()),
        "Float" => literal
            .value
            .parse::<f32>()
            .map(Constant::Float32)
            .map_err(|_| invalid()),
        "Char" => {
            let mut chars = literal.value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(Constant::Int8(c as u8 as i8)),
                _ => Err(invalid()),
            }
        }
        "String" => Err(LoweringError::Unsupported("string literal in a constant expression")),
        _ => Err(invalid()),
    }
}

/// The text a string literal stands for, with `\n`, `\t` and `\\` escapes replaced
pub fn string(literal: &Literal) -> String {
    let mut text = String::with_capacity(literal.value.len());
    let mut chars = literal.value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some('\\') => text.push('\\'),
            Some(other) => {
                text.push('\\');
                text.push(other);
            }
            None => text.push('\\'),
        }
    }
    text
}

/// Evaluates the initializer of the global `name`
pub fn evaluate(expr: &Expr, name: &str) -> LoweringResult<Constant> {
    match expr {
        Expr::Literal(l) => literal(l),
        Expr::Unary(unary) => {
            let operand = evaluate(&unary.operand, name)?;
            let inst = UnaryInst::for_operator(&unary.op, operand.ty())?;
            Ok(apply_unary(inst, operand))
        }
        Expr::Binary(binary) => {
            let left = evaluate(&binary.left, name)?;
            let right = evaluate(&binary.right, name)?;
            let (left, right) = unify(&binary.op, left, right)?;
            let inst = BinaryInst::for_operator(&binary.op, left.ty().is_float())?;
            apply_binary(inst, left, right)
        }
        _ => Err(LoweringError::NonConstantInitializer(name.to_string())),
    }
}

/// Applies the implicit conversion policy to a constant
pub fn convert(constant: Constant, to: ValueType) -> LoweringResult<Constant> {
    if constant.ty() == to {
        return Ok(constant);
    }
    match (Conversion::between(constant.ty(), to), constant) {
        (Some(Conversion::IntToFloat), Constant::Int32(i)) => Ok(Constant::Float32(i as f32)),
        (Some(Conversion::FloatToInt), Constant::Float32(f)) => Ok(Constant::Int32(f as i32)),
        _ => Err(LoweringError::UnsupportedConversion {
            from: constant.ty(),
            to,
        }),
    }
}

fn unify(op: &str, left: Constant, right: Constant) -> LoweringResult<(Constant, Constant)> {
    let ty = common_type(op, left.ty(), right.ty())?;
    Ok((convert(left, ty)?, convert(right, ty)?))
}

fn as_int(constant: Constant) -> Option<i64> {
    match constant {
        Constant::Int8(i) => Some(i as i64),
        Constant::Int32(i) => Some(i as i64),
        Constant::Bool(b) => Some(b as i64),
        Constant::Float32(_) | Constant::Float64(_) => None,
    }
}

fn as_float(constant: Constant) -> f64 {
    match constant {
        Constant::Float32(f) => f as f64,
        Constant::Float64(f) => f,
        other => as_int(other).unwrap_or_default() as f64,
    }
}

/// Truncates an integer result back into a constant of the given type
fn from_int(ty: ValueType, value: i64) -> Constant {
    match ty {
        ValueType::Int8 => Constant::Int8(value as i8),
        ValueType::Bool => Constant::Bool(value & 1 != 0),
        _ => Constant::Int32(value as i32),
    }
}

fn from_float(ty: ValueType, value: f64) -> Constant {
    match ty {
        ValueType::Float64 => Constant::Float64(value),
        _ => Constant::Float32(value as f32),
    }
}

fn compare<T: PartialOrd>(cmp: Cmp, a: T, b: T) -> bool {
    match cmp {
        Cmp::Eq => a == b,
        Cmp::Ne => a != b,
        Cmp::Lt => a < b,
        Cmp::Le => a <= b,
        Cmp::Gt => a > b,
        Cmp::Ge => a >= b,
    }
}

fn apply_binary(inst: BinaryInst, left: Constant, right: Constant) -> LoweringResult<Constant> {
    use BinaryInst::*;
    let ty = left.ty();
    if let FCmp(cmp) = inst {
        return Ok(Constant::Bool(compare(cmp, as_float(left), as_float(right))));
    }
    if ty.is_float() {
        let (a, b) = (as_float(left), as_float(right));
        let result = match inst {
            FAdd => a + b,
            FSub => a - b,
            FMul => a * b,
            FDiv => a / b,
            _ => {
                return Err(LoweringError::InvalidOperand {
                    op: inst.to_string(),
                    ty,
                })
            }
        };
        return Ok(from_float(ty, result));
    }

    let (Some(a), Some(b)) = (as_int(left), as_int(right)) else {
        return Err(LoweringError::InvalidOperand {
            op: inst.to_string(),
            ty,
        });
    };
    let bits = (ty.size().max(1) * 8) as i64;
    let result = match inst {
        IAdd => a.wrapping_add(b),
        ISub => a.wrapping_sub(b),
        IMul => a.wrapping_mul(b),
        SDiv | SRem if b == 0 => return Err(LoweringError::DivisionByZero),
        SDiv => a.wrapping_div(b),
        SRem => a.wrapping_rem(b),
        And => a & b,
        Or => a | b,
        Xor => a ^ b,
        Shl => a.wrapping_shl((b & (bits - 1)) as u32),
        Shr => a.wrapping_shr((b & (bits - 1)) as u32),
        ICmp(cmp) => return Ok(Constant::Bool(compare(cmp, a, b))),
        FAdd | FSub | FMul | FDiv | FCmp(_) => {
            return Err(LoweringError::InvalidOperand {
                op: inst.to_string(),
                ty,
            })
        }
    };
    Ok(from_int(ty, result))
}

fn apply_unary(inst: UnaryInst, operand: Constant) -> Constant {
    match inst {
        UnaryInst::INeg => from_int(operand.ty(), as_int(operand).unwrap_or_default().wrapping_neg()),
        UnaryInst::FNeg => from_float(operand.ty(), -as_float(operand)),
        UnaryInst::Not => Constant::Bool(as_int(operand) == Some(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i32) -> Expr {
        Expr::literal(i.to_string(), "Integer")
    }

    #[test]
    fn literals() {
        assert_eq!(
            literal(&Literal { value: "42".to_string(), ty: "Integer".to_string() }),
            Ok(Constant::Int32(42))
        );
        assert_eq!(
            literal(&Literal { value: "2.5".to_string(), ty: "Float".to_string() }),
            Ok(Constant::Float32(2.5))
        );
        assert_eq!(
            literal(&Literal { value: "A".to_string(), ty: "Char".to_string() }),
            Ok(Constant::Int8(65))
        );
        assert!(matches!(
            literal(&Literal { value: "99999999999".to_string(), ty: "Integer".to_string() }),
            Err(LoweringError::InvalidLiteral { .. })
        ));
        assert_eq!(
            literal(&Literal { value: "s".to_string(), ty: "String".to_string() }),
            Err(LoweringError::Unsupported("string literal in a constant expression"))
        );
    }

    #[test]
    fn string_escapes() {
        let literal = Literal { value: r"a\tb\n\\\q".to_string(), ty: "String".to_string() };
        assert_eq!(string(&literal), "a\tb\n\\\\q");
    }

    #[test]
    fn integer_arithmetic() {
        let expr = Expr::binary(int(1), "+", Expr::binary(int(2), "*", int(3)));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Int32(7)));
        let expr = Expr::binary(int(7), "%", int(4));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Int32(3)));
        let expr = Expr::unary("-", Expr::binary(int(10), "/", int(3)));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Int32(-3)));
        let expr = Expr::binary(int(i32::MAX), "+", int(1));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Int32(i32::MIN)));
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        let expr = Expr::binary(int(1), "+", Expr::literal("0.5", "Float"));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Float32(1.5)));
    }

    #[test]
    fn comparisons_and_logic() {
        let expr = Expr::binary(int(1), "<", int(2));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Bool(true)));
        let expr = Expr::unary("!", int(0));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Bool(true)));
        let expr = Expr::binary(int(6), "&", int(3));
        assert_eq!(evaluate(&expr, "x"), Ok(Constant::Int32(2)));
    }

    #[test]
    fn rejected_initializers() {
        assert_eq!(
            evaluate(&Expr::binary(int(1), "/", int(0)), "x"),
            Err(LoweringError::DivisionByZero)
        );
        assert_eq!(
            evaluate(&Expr::binary(int(1), "+", Expr::reference("y")), "x"),
            Err(LoweringError::NonConstantInitializer("x".to_string()))
        );
        assert_eq!(
            evaluate(&Expr::call("f", vec![]), "x"),
            Err(LoweringError::NonConstantInitializer("x".to_string()))
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(convert(Constant::Int32(2), ValueType::Float32), Ok(Constant::Float32(2.0)));
        assert_eq!(convert(Constant::Float32(2.9), ValueType::Int32), Ok(Constant::Int32(2)));
        assert_eq!(
            convert(Constant::Int8(1), ValueType::Int32),
            Err(LoweringError::UnsupportedConversion {
                from: ValueType::Int8,
                to: ValueType::Int32
            })
        );
    }
}
