//! Tests for import statements and module loading

use std::path::PathBuf;

use maplit::hashmap;
use tempfile::TempDir;

use super::helpers::{interpreter, write_file, FakeFetcher};
use crate::config::Config;
use crate::errors::{ErrorKind, ScriptResult};
use crate::executor::{Interpreter, Val};

/// Lay out `files` in a fresh directory and return it with the path of `main.tempo`
fn project(main: &str, files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create project dir");
    for (name, contents) in files {
        write_file(dir.path(), name, contents);
    }
    let main = write_file(dir.path(), "main.tempo", main);
    (dir, main)
}

fn run_project(main: &str, files: &[(&str, &str)]) -> (ScriptResult<Val>, Interpreter) {
    let (_dir, path) = project(main, files);
    let mut interp = interpreter();
    let result = interp.run_file(&path);
    (result, interp)
}

const LIB: &str = r#"
var secret = 41;
func answer() { return secret + 1; }
"#;

/* ===================== File Modules ===================== */

#[test]
fn test_plain_import_binds_module_name_only() {
    let (result, mut interp) = run_project(
        "import \"./lib.tempo\";\nlib.answer()",
        &[("lib.tempo", LIB)],
    );
    assert_eq!(result.unwrap(), Val::Int(42));

    for name in ["secret", "answer"] {
        let err = interp.run_source(name, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier, "{} leaked", name);
    }
}

#[test]
fn test_alias_and_export_imports() {
    let main = r#"
import "./lib.tempo" as l;
from "./lib.tempo" import answer;
[l.answer(), answer(), l.secret]
"#;
    let (result, interp) = run_project(main, &[("lib.tempo", LIB)]);
    assert_eq!(
        result.unwrap(),
        Val::list(vec![Val::Int(42), Val::Int(42), Val::Int(41)])
    );
    assert!(interp.lookup_global("lib").is_none());
}

#[test]
fn test_missing_export() {
    let (result, _) = run_project(
        "\nfrom \"./lib.tempo\" import nope;",
        &[("lib.tempo", LIB)],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert_eq!(err.message, "Module './lib.tempo' has no export 'nope'");
    assert_eq!(err.span.map(|s| s.line()), Some(2));
}

#[test]
fn test_module_body_runs_once() {
    let main = r#"
import "module";
import "./noisy.tempo";
import "./noisy.tempo" as again;
var third = module.loadModule("./noisy.tempo");
noisy.value + again.value + third.value
"#;
    let (result, mut interp) = run_project(
        main,
        &[("noisy.tempo", "print(\"loading\");\nvar value = 1;")],
    );
    assert_eq!(result.unwrap(), Val::Int(3));
    assert_eq!(interp.take_output(), "loading\n");
}

#[test]
fn test_nested_relative_imports_resolve_against_importer() {
    let (result, _) = run_project(
        "import \"./a.tempo\";\na.value",
        &[
            ("a.tempo", "import \"./sub/b.tempo\";\nvar value = b.value * 2;"),
            ("sub/b.tempo", "from \"./c.tempo\" import base;\nvar value = base + 1;"),
            ("sub/c.tempo", "var base = 4;"),
        ],
    );
    assert_eq!(result.unwrap(), Val::Int(10));
}

#[test]
fn test_module_cannot_see_importer_scope() {
    let (dir, main) = project(
        "var shared = 1;\nimport \"./peek.tempo\";",
        &[("peek.tempo", "var seen = shared;")],
    );
    let err = interpreter().run_file(&main).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier);
    assert_eq!(err.trace.len(), 2);
    assert!(err.trace[0].ends_with("peek.tempo"));
    assert_eq!(err.trace[1], main.display().to_string());
    drop(dir);
}

#[test]
fn test_error_trace_through_nested_modules() {
    let (dir, main) = project(
        "import \"./outer.tempo\";",
        &[
            ("outer.tempo", "import \"./inner.tempo\";"),
            ("inner.tempo", "var broken = 1 / 0;"),
        ],
    );
    let err = interpreter().run_file(&main).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArithmeticError);
    assert_eq!(err.trace.len(), 3);
    assert!(err.trace[0].ends_with("inner.tempo"));
    assert!(err.trace[1].ends_with("outer.tempo"));
    assert!(err.to_string().contains("imported from"));
    drop(dir);
}

#[test]
fn test_cyclic_import() {
    let (result, _) = run_project(
        "import \"./a.tempo\";",
        &[
            ("a.tempo", "import \"./b.tempo\";"),
            ("b.tempo", "import \"./a.tempo\";"),
        ],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert!(err.message.starts_with("Cyclic import:"), "{}", err.message);
    assert!(err.message.ends_with("a.tempo"));
}

#[test]
fn test_cycle_back_to_entry_file() {
    let (result, mut interp) = run_project(
        "print(\"main body\");\nimport \"./b.tempo\";",
        &[("b.tempo", "print(\"b body\");\nimport \"./main.tempo\";")],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert!(err.message.starts_with("Cyclic import:"), "{}", err.message);
    assert!(err.message.ends_with("main.tempo"), "{}", err.message);
    // The entry body is not re-run as a module
    assert_eq!(interp.take_output(), "main body\nb body\n");

    // Loading state is released once the run ends
    let value = interp.run_source("1 + 1", None).unwrap();
    assert_eq!(value, Val::Int(2));
}

#[test]
fn test_return_in_module_body_is_an_error() {
    let (result, _) = run_project(
        "import \"./early.tempo\";",
        &[("early.tempo", "return 1;")],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlowError);
    assert!(err.trace[0].ends_with("early.tempo"));
}

#[test]
fn test_import_inside_function_and_loop() {
    let main = r#"
func load() {
    import "./lib.tempo";
    return lib.answer();
}
var total = 0;
for (var i in [1, 2]) {
    import "./lib.tempo" as l;
    total += l.answer();
    if (i == 2) { break; }
}
[load(), total]
"#;
    let (result, interp) = run_project(main, &[("lib.tempo", LIB)]);
    assert_eq!(
        result.unwrap(),
        Val::list(vec![Val::Int(42), Val::Int(84)])
    );
    assert!(interp.lookup_global("lib").is_none());
}

#[test]
fn test_module_not_found() {
    let (result, _) = run_project("import \"./missing.tempo\";", &[]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert!(err
        .message
        .starts_with("Cannot find module './missing.tempo'"));
    assert_eq!(err.span.map(|s| s.line()), Some(1));
}

#[test]
fn test_search_paths() {
    let shared = tempfile::tempdir().unwrap();
    write_file(shared.path(), "common.tempo", "var tag = \"shared\";");
    let (_dir, main) = project("import \"common.tempo\";\ncommon.tag", &[]);

    let mut config = Config::default();
    config.modules.search_paths.push(shared.path().to_path_buf());
    let mut interp = Interpreter::new(config);
    assert_eq!(interp.run_file(&main).unwrap(), Val::string("shared"));
}

/* ===================== JSON Modules ===================== */

#[test]
fn test_json_import() {
    let (result, _) = run_project(
        "import \"./data/settings.json\";\n[settings.name, settings.retries]",
        &[("data/settings.json", r#"{"name": "tempo", "retries": 3}"#)],
    );
    assert_eq!(
        result.unwrap(),
        Val::list(vec![Val::string("tempo"), Val::Int(3)])
    );
}

#[test]
fn test_load_json_module_twice_without_binding() {
    let main = r#"
import "module";
var a = module.loadJSONModule("./x.json");
var b = module.loadJSONModule("./x.json");
a == b
"#;
    let (result, mut interp) = run_project(main, &[("x.json", r#"{"items": [1, 2, {"k": null}]}"#)]);
    assert_eq!(result.unwrap(), Val::Bool(true));

    let err = interp.run_source("x", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedIdentifier);
}

#[test]
fn test_load_json_module_rejects_other_paths() {
    let (result, _) = run_project(
        "import \"module\";\nmodule.loadJSONModule(\"./lib.tempo\")",
        &[("lib.tempo", LIB)],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
}

#[test]
fn test_invalid_json_module() {
    let (result, _) = run_project(
        "import \"./bad.json\";",
        &[("bad.json", "{not json")],
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert!(err.message.starts_with("Invalid JSON in"));
}

/* ===================== Built-in Modules ===================== */

#[test]
fn test_builtin_module_introspection() {
    let mut interp = interpreter();
    interp.run_source("import \"module\";", None).unwrap();
    assert_eq!(
        interp
            .run_source("module.isBuildInModule(\"os\")", None)
            .unwrap(),
        Val::Bool(true)
    );
    assert_eq!(
        interp
            .run_source("module.isBuildInModule(\"not_a_module\")", None)
            .unwrap(),
        Val::Bool(false)
    );
}

#[test]
fn test_unknown_and_unrecognized_specifiers() {
    let err = interpreter().run_source("import \"nope\";", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert_eq!(err.message, "Unknown built-in module 'nope'");

    let err = interpreter()
        .run_source("import \"./script.js\";", None)
        .unwrap_err();
    assert_eq!(err.message, "Unrecognized module specifier './script.js'");
}

/* ===================== Remote Modules ===================== */

#[test]
fn test_http_module_with_relative_import() {
    let fetcher = FakeFetcher {
        modules: hashmap! {
            "https://example.com/lib/greet.tempo".to_string() =>
                "from \"./util.tempo\" import shout;\nfunc hello(name) { return shout(\"hi \" + name); }".to_string(),
            "https://example.com/lib/util.tempo".to_string() =>
                "func shout(s) { return s + \"!\"; }".to_string(),
        },
    };
    let mut interp = interpreter();
    interp.set_fetcher(Box::new(fetcher));

    let value = interp
        .run_source(
            "import \"https://example.com/lib/greet.tempo\";\ngreet.hello(\"tempo\")",
            None,
        )
        .unwrap();
    assert_eq!(value, Val::string("hi tempo!"));
}

#[test]
fn test_package_from_registry() {
    let fetcher = FakeFetcher::default().with(
        "https://registry.tempo-lang.dev/packages/acme/strings/main.tempo",
        "func pad(s) { return \" \" + s; }",
    );
    let mut interp = interpreter();
    interp.set_fetcher(Box::new(fetcher));

    let value = interp
        .run_source("import \"acme:strings\";\nstrings.pad(\"x\")", None)
        .unwrap();
    assert_eq!(value, Val::string(" x"));
}

#[test]
fn test_package_from_local_directory() {
    let packages = tempfile::tempdir().unwrap();
    write_file(packages.path(), "acme/strings/main.tempo", "var local = true;");

    let mut config = Config::default();
    config.modules.packages_dir = Some(packages.path().to_path_buf());
    let mut interp = Interpreter::new(config);
    // Any network access would fail with the empty fetcher
    interp.set_fetcher(Box::new(FakeFetcher::default()));

    let value = interp
        .run_source("from \"acme:strings\" import local;\nlocal", None)
        .unwrap();
    assert_eq!(value, Val::Bool(true));
}

#[test]
fn test_fetch_failure() {
    let mut interp = interpreter();
    interp.set_fetcher(Box::new(FakeFetcher::default()));
    let err = interp
        .run_source("import \"https://example.com/gone.tempo\";", None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert_eq!(
        err.message,
        "Failed to fetch 'https://example.com/gone.tempo': server responded with status 404"
    );
}

#[test]
fn test_remote_modules_disabled() {
    let mut config = Config::default();
    config.modules.allow_remote = false;
    let mut interp = Interpreter::new(config);

    let err = interp
        .run_source("import \"https://example.com/lib.tempo\";", None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportError);
    assert_eq!(
        err.message,
        "Remote module loading is disabled ('https://example.com/lib.tempo')"
    );
}
