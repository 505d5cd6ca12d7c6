//! `hash`: digests

use sha2::{Digest, Sha256};

use super::{Args, Exports};
use crate::executor::types::Val;

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn exports() -> Exports {
    vec![(
        "sha256",
        Val::native("hash.sha256", |_, args, span| {
            let text = Args::new("hash.sha256", &args, span).string(0)?;
            Ok(Val::string(sha256_hex(&text)))
        }),
    )]
}
