//! `fs`: file access
//!
//! Reads and writes return tasks that are already settled: fulfilled with
//! the result, or rejected with the I/O error message.

use std::fs;
use std::path::Path;

use super::{settled_task, Args, Exports};
use crate::executor::types::Val;

pub fn exports() -> Exports {
    vec![
        (
            "readText",
            Val::native("fs.readText", |_, args, span| {
                let path = Args::new("fs.readText", &args, span).string(0)?;
                Ok(settled_task(fs::read_to_string(&*path).map(Val::string)))
            }),
        ),
        (
            "writeText",
            Val::native("fs.writeText", |_, args, span| {
                let args = Args::new("fs.writeText", &args, span);
                let path = args.string(0)?;
                let text = args.string(1)?;
                Ok(settled_task(
                    fs::write(&*path, text.as_bytes()).map(|()| Val::Nil),
                ))
            }),
        ),
        (
            "exists",
            Val::native("fs.exists", |_, args, span| {
                let path = Args::new("fs.exists", &args, span).string(0)?;
                Ok(Val::Bool(Path::new(&*path).exists()))
            }),
        ),
    ]
}
