//! `math`: numeric helpers
//!
//! Rounding functions return ints; `abs`, `min` and `max` keep the operand's type.

use std::f64::consts::PI;

use super::{Args, Exports};
use crate::executor::types::Val;
use crate::errors::ScriptResult;

fn to_int(args: &Args<'_>, x: f64) -> ScriptResult<Val> {
    if x.is_finite() && x >= i64::MIN as f64 && x <= i64::MAX as f64 {
        Ok(Val::Int(x as i64))
    } else {
        Err(args.error(format!("{} is out of integer range", x)))
    }
}

fn rounding(name: &'static str, round: fn(f64) -> f64) -> Val {
    Val::native(name, move |_, args, span| {
        let args = Args::new(name, &args, span);
        match args.required(0)? {
            Val::Int(i) => Ok(Val::Int(*i)),
            _ => to_int(&args, round(args.number(0)?)),
        }
    })
}

fn extremum(name: &'static str, pick_left: fn(f64, f64) -> bool) -> Val {
    Val::native(name, move |_, values, span| {
        let args = Args::new(name, &values, span);
        args.required(0)?;
        let mut best = 0;
        for index in 1..args.len() {
            if pick_left(args.number(index)?, args.number(best)?) {
                best = index;
            }
        }
        args.number(best)?;
        Ok(args.optional(best))
    })
}

pub fn exports() -> Exports {
    vec![
        ("floor", rounding("math.floor", f64::floor)),
        ("ceil", rounding("math.ceil", f64::ceil)),
        ("round", rounding("math.round", f64::round)),
        (
            "abs",
            Val::native("math.abs", |_, args, span| {
                let args = Args::new("math.abs", &args, span);
                match args.required(0)? {
                    Val::Int(i) => i
                        .checked_abs()
                        .map(Val::Int)
                        .ok_or_else(|| args.error("integer overflow")),
                    _ => Ok(Val::Float(args.number(0)?.abs())),
                }
            }),
        ),
        (
            "sqrt",
            Val::native("math.sqrt", |_, args, span| {
                Ok(Val::Float(Args::new("math.sqrt", &args, span).number(0)?.sqrt()))
            }),
        ),
        (
            "pow",
            Val::native("math.pow", |_, args, span| {
                let args = Args::new("math.pow", &args, span);
                Ok(Val::Float(args.number(0)?.powf(args.number(1)?)))
            }),
        ),
        ("min", extremum("math.min", |a, b| a < b)),
        ("max", extremum("math.max", |a, b| a > b)),
        ("pi", Val::Float(PI)),
    ]
}
