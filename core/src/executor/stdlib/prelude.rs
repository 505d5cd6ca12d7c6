//! Prelude globals: print, len, str, int, float, type and Task

use super::{Args, Exports};
use crate::executor::types::Val;
use crate::task::TaskRef;

pub fn exports() -> Exports {
    vec![
        (
            "print",
            Val::native("print", |interp, args, _| {
                let line: Vec<String> = args.iter().map(Val::to_string).collect();
                interp.write_output(&format!("{}\n", line.join(" ")));
                Ok(Val::Nil)
            }),
        ),
        (
            "len",
            Val::native("len", |_, args, span| {
                let args = Args::new("len", &args, span);
                match args.required(0)? {
                    Val::Str(s) => Ok(Val::Int(s.chars().count() as i64)),
                    Val::List(items) => Ok(Val::Int(items.borrow().len() as i64)),
                    Val::Obj(map) => Ok(Val::Int(map.borrow().len() as i64)),
                    other => Err(args.error(format!("{} has no length", other.type_name()))),
                }
            }),
        ),
        (
            "str",
            Val::native("str", |_, args, span| {
                let args = Args::new("str", &args, span);
                Ok(Val::string(args.required(0)?.to_string()))
            }),
        ),
        (
            "int",
            Val::native("int", |_, args, span| {
                let args = Args::new("int", &args, span);
                match args.required(0)? {
                    Val::Int(i) => Ok(Val::Int(*i)),
                    Val::Float(x) if x.is_finite() => Ok(Val::Int(x.trunc() as i64)),
                    Val::Bool(b) => Ok(Val::Int(i64::from(*b))),
                    Val::Str(s) => s
                        .trim()
                        .parse::<i64>()
                        .map(Val::Int)
                        .map_err(|_| args.error(format!("invalid integer literal {:?}", s.as_ref()))),
                    other => Err(args.error(format!("cannot convert {} to int", other.type_name()))),
                }
            }),
        ),
        (
            "float",
            Val::native("float", |_, args, span| {
                let args = Args::new("float", &args, span);
                match args.required(0)? {
                    Val::Int(i) => Ok(Val::Float(*i as f64)),
                    Val::Float(x) => Ok(Val::Float(*x)),
                    Val::Str(s) => s
                        .trim()
                        .parse::<f64>()
                        .map(Val::Float)
                        .map_err(|_| args.error(format!("invalid float literal {:?}", s.as_ref()))),
                    other => Err(args.error(format!("cannot convert {} to float", other.type_name()))),
                }
            }),
        ),
        (
            "type",
            Val::native("type", |_, args, span| {
                let args = Args::new("type", &args, span);
                Ok(Val::string(args.required(0)?.type_name()))
            }),
        ),
        (
            "Task",
            Val::native("Task", |interp, args, span| {
                let executor = Args::new("Task", &args, span).callable(0)?;
                let task = TaskRef::from_executor(interp, &executor, span)?;
                Ok(Val::Task(task))
            }),
        ),
    ]
}
