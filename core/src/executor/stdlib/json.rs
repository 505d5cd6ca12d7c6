//! `json`: parse and stringify

use super::{Args, Exports};
use crate::executor::types::{json_to_val, val_to_json, Val};

pub fn exports() -> Exports {
    vec![
        (
            "parse",
            Val::native("json.parse", |_, args, span| {
                let args = Args::new("json.parse", &args, span);
                let text = args.string(0)?;
                let json: serde_json::Value = serde_json::from_str(&text)
                    .map_err(|err| args.error(format!("invalid JSON: {}", err)))?;
                Ok(json_to_val(&json))
            }),
        ),
        (
            "stringify",
            Val::native("json.stringify", |_, args, span| {
                let args = Args::new("json.stringify", &args, span);
                let json = val_to_json(args.required(0)?, span)?;
                let pretty = args.optional(1).is_truthy();
                let text = if pretty {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                text.map(Val::string).map_err(|err| args.error(err))
            }),
        ),
    ]
}
