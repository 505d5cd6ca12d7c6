//! `os`: host process information

use std::env;

use super::{Args, Exports};
use crate::executor::types::Val;

pub fn exports() -> Exports {
    vec![
        (
            "platform",
            Val::native("os.platform", |_, _, _| Ok(Val::string(env::consts::OS))),
        ),
        (
            "arch",
            Val::native("os.arch", |_, _, _| Ok(Val::string(env::consts::ARCH))),
        ),
        (
            "env",
            Val::native("os.env", |_, args, span| {
                let name = Args::new("os.env", &args, span).string(0)?;
                Ok(env::var(&*name)
                    .map(Val::string)
                    .unwrap_or_default())
            }),
        ),
        (
            "cwd",
            Val::native("os.cwd", |_, args, span| {
                let dir = env::current_dir()
                    .map_err(|err| Args::new("os.cwd", &args, span).error(err))?;
                Ok(Val::string(dir.display().to_string()))
            }),
        ),
        (
            "pid",
            Val::native("os.pid", |_, _, _| Ok(Val::Int(i64::from(std::process::id())))),
        ),
        (
            "args",
            Val::native("os.args", |_, _, _| {
                Ok(Val::list(env::args().map(Val::string).collect()))
            }),
        ),
    ]
}
