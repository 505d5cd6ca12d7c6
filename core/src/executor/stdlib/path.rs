//! `path`: file path manipulation

use std::path::{Path, PathBuf};

use super::{Args, Exports};
use crate::executor::types::Val;

fn path_string(path: &Path) -> Val {
    Val::string(path.to_string_lossy().into_owned())
}

pub fn exports() -> Exports {
    vec![
        (
            "join",
            Val::native("path.join", |_, values, span| {
                let args = Args::new("path.join", &values, span);
                let mut joined = PathBuf::new();
                for index in 0..args.len() {
                    joined.push(&*args.string(index)?);
                }
                Ok(path_string(&joined))
            }),
        ),
        (
            "basename",
            Val::native("path.basename", |_, args, span| {
                let path = Args::new("path.basename", &args, span).string(0)?;
                Ok(Path::new(&*path)
                    .file_name()
                    .map(|name| Val::string(name.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| Val::string("")))
            }),
        ),
        (
            "dirname",
            Val::native("path.dirname", |_, args, span| {
                let path = Args::new("path.dirname", &args, span).string(0)?;
                Ok(Path::new(&*path)
                    .parent()
                    .map(path_string)
                    .unwrap_or_else(|| Val::string("")))
            }),
        ),
        (
            "extname",
            Val::native("path.extname", |_, args, span| {
                let path = Args::new("path.extname", &args, span).string(0)?;
                Ok(Path::new(&*path)
                    .extension()
                    .map(|ext| Val::string(format!(".{}", ext.to_string_lossy())))
                    .unwrap_or_else(|| Val::string("")))
            }),
        ),
        (
            "isAbsolute",
            Val::native("path.isAbsolute", |_, args, span| {
                let path = Args::new("path.isAbsolute", &args, span).string(0)?;
                Ok(Val::Bool(Path::new(&*path).is_absolute()))
            }),
        ),
    ]
}
