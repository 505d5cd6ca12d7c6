//! `time`: wall clock

use chrono::{SecondsFormat, Utc};

use super::Exports;
use crate::executor::types::Val;

pub fn exports() -> Exports {
    vec![
        (
            "now",
            Val::native("time.now", |_, _, _| {
                Ok(Val::string(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)))
            }),
        ),
        (
            "timestamp",
            Val::native("time.timestamp", |_, _, _| {
                Ok(Val::Int(Utc::now().timestamp_millis()))
            }),
        ),
    ]
}
