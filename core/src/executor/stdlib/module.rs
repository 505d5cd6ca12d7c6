//! `module`: introspection and programmatic loading

use super::{is_builtin_module, Args, Exports, BUILTIN_MODULES};
use crate::executor::types::Val;
use crate::modules::{classify, ModuleKind};

pub fn exports() -> Exports {
    vec![
        (
            "isBuildInModule",
            Val::native("module.isBuildInModule", |_, args, span| {
                let name = Args::new("module.isBuildInModule", &args, span).string(0)?;
                Ok(Val::Bool(is_builtin_module(&name)))
            }),
        ),
        (
            "builtinModules",
            Val::native("module.builtinModules", |_, _, _| {
                Ok(Val::list(
                    BUILTIN_MODULES.iter().map(|name| Val::string(*name)).collect(),
                ))
            }),
        ),
        (
            "kindOf",
            Val::native("module.kindOf", |_, args, span| {
                let specifier = Args::new("module.kindOf", &args, span).string(0)?;
                Ok(classify(&specifier)
                    .map(|kind| Val::string(kind.as_str()))
                    .unwrap_or_default())
            }),
        ),
        (
            "loadModule",
            Val::native("module.loadModule", |interp, args, span| {
                let specifier = Args::new("module.loadModule", &args, span).string(0)?;
                let record = interp.load_module(&specifier).map_err(|err| match err.span {
                    Some(_) => err,
                    None => err.with_span(span),
                })?;
                Ok(record.content)
            }),
        ),
        (
            "loadJSONModule",
            Val::native("module.loadJSONModule", |interp, args, span| {
                let args = Args::new("module.loadJSONModule", &args, span);
                let path = args.string(0)?;
                if classify(&path) != Some(ModuleKind::Json) {
                    return Err(args.error(format!("expected a .json path, got {:?}", path.as_ref())));
                }
                let record = interp
                    .load_module(&path)
                    .map_err(|err| err.with_span(span))?;
                Ok(record.content)
            }),
        ),
    ]
}
