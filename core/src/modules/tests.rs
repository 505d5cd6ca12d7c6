use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use super::*;

/// Records every URL it is asked for and serves a fixed body
struct FakeFetcher {
    body: String,
    requests: Rc<RefCell<Vec<String>>>,
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String, ModuleError> {
        self.requests.borrow_mut().push(url.to_string());
        Ok(self.body.clone())
    }
}

fn resolver(settings: ModuleSettings) -> ModuleResolver {
    ModuleResolver::new(settings)
}

fn file_origin(path: &Path) -> ModuleOrigin {
    ModuleOrigin::entry(Some(path))
}

/* ===================== Classification ===================== */

#[test]
fn test_classify() {
    assert_eq!(classify("os"), Some(ModuleKind::Builtin));
    assert_eq!(classify("_private2"), Some(ModuleKind::Builtin));
    assert_eq!(classify("./lib/util.tempo"), Some(ModuleKind::File));
    assert_eq!(classify("/abs/util.tempo"), Some(ModuleKind::File));
    assert_eq!(classify("data/settings.json"), Some(ModuleKind::Json));
    assert_eq!(
        classify("https://example.com/lib/util.tempo"),
        Some(ModuleKind::Http)
    );
    assert_eq!(classify("http://example.com/mod"), Some(ModuleKind::Http));
    assert_eq!(classify("acme:strings"), Some(ModuleKind::Package));
    assert_eq!(classify("acme-labs:str.utils"), Some(ModuleKind::Package));

    assert_eq!(classify("./lib/util.js"), None);
    assert_eq!(classify("acme:"), None);
    assert_eq!(classify("ftp://example.com/x"), None);
    assert_eq!(classify(""), None);
}

#[test]
fn test_intrinsic_name() {
    assert_eq!(intrinsic_name("os", ModuleKind::Builtin), "os");
    assert_eq!(intrinsic_name("acme:strings", ModuleKind::Package), "strings");
    assert_eq!(
        intrinsic_name("./lib/string-utils.tempo", ModuleKind::File),
        "string_utils"
    );
    assert_eq!(
        intrinsic_name("data/settings.json", ModuleKind::Json),
        "settings"
    );
    assert_eq!(
        intrinsic_name("https://example.com/v1/helpers.tempo?rev=2", ModuleKind::Http),
        "helpers"
    );
    assert_eq!(intrinsic_name("./2fa.tempo", ModuleKind::File), "_2fa");
}

#[test]
fn test_join_url() {
    assert_eq!(
        join_url("https://example.com/lib/main.tempo", "./util.tempo"),
        "https://example.com/lib/util.tempo"
    );
    assert_eq!(
        join_url("https://example.com/lib/main.tempo", "nested/deep.tempo"),
        "https://example.com/lib/nested/deep.tempo"
    );
}

/* ===================== Locating ===================== */

#[test]
fn test_locate_relative_to_origin() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/util.tempo"), "var x = 1;").unwrap();
    let main = dir.path().join("main.tempo");
    fs::write(&main, "").unwrap();

    let resolver = resolver(ModuleSettings::default());
    let location = resolver
        .locate(
            "./lib/util.tempo",
            ModuleKind::File,
            Some(&file_origin(&main)),
        )
        .unwrap();

    let expected = dir.path().join("lib/util.tempo").canonicalize().unwrap();
    assert_eq!(location, Location::Path(expected));
    assert!(!location.is_json());
}

#[test]
fn test_locate_falls_back_to_search_paths() {
    let project = tempfile::tempdir().unwrap();
    let shared = tempfile::tempdir().unwrap();
    fs::write(shared.path().join("common.tempo"), "").unwrap();
    let main = project.path().join("main.tempo");

    let settings = ModuleSettings {
        search_paths: vec![shared.path().to_path_buf()],
        ..ModuleSettings::default()
    };
    let location = resolver(settings)
        .locate("common.tempo", ModuleKind::File, Some(&file_origin(&main)))
        .unwrap();

    let expected = shared.path().join("common.tempo").canonicalize().unwrap();
    assert_eq!(location, Location::Path(expected));
}

#[test]
fn test_locate_not_found_lists_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.tempo");

    let err = resolver(ModuleSettings::default())
        .locate("./missing.tempo", ModuleKind::File, Some(&file_origin(&main)))
        .unwrap_err();

    match &err {
        ModuleError::NotFound {
            specifier,
            searched,
        } => {
            assert_eq!(specifier, "./missing.tempo");
            assert_eq!(searched.len(), 1);
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
    assert!(err.to_string().starts_with("Cannot find module './missing.tempo'"));
}

#[test]
fn test_relative_import_inside_remote_module_stays_remote() {
    let origin = ModuleOrigin::from_location(&Location::Url(
        "https://example.com/lib/main.tempo".to_string(),
    ));
    let location = resolver(ModuleSettings::default())
        .locate("./util.tempo", ModuleKind::File, Some(&origin))
        .unwrap();
    assert_eq!(
        location,
        Location::Url("https://example.com/lib/util.tempo".to_string())
    );
}

#[test]
fn test_locate_package_prefers_local_directory() {
    let packages = tempfile::tempdir().unwrap();
    let entry_dir = packages.path().join("acme").join("strings");
    fs::create_dir_all(&entry_dir).unwrap();
    fs::write(entry_dir.join(PACKAGE_ENTRY), "").unwrap();

    let settings = ModuleSettings {
        packages_dir: Some(packages.path().to_path_buf()),
        ..ModuleSettings::default()
    };
    let location = resolver(settings)
        .locate("acme:strings", ModuleKind::Package, None)
        .unwrap();
    assert_eq!(location, Location::Path(entry_dir.join(PACKAGE_ENTRY)));
}

#[test]
fn test_locate_package_from_registry() {
    let settings = ModuleSettings {
        registry_url: "https://packages.example.com/".to_string(),
        ..ModuleSettings::default()
    };
    let location = resolver(settings)
        .locate("acme:strings", ModuleKind::Package, None)
        .unwrap();
    assert_eq!(
        location,
        Location::Url("https://packages.example.com/acme/strings/main.tempo".to_string())
    );
}

#[test]
fn test_remote_disabled() {
    let settings = ModuleSettings {
        allow_remote: false,
        ..ModuleSettings::default()
    };
    let resolver = resolver(settings);

    let err = resolver
        .locate("https://example.com/x.tempo", ModuleKind::Http, None)
        .unwrap_err();
    assert!(matches!(err, ModuleError::RemoteDisabled(..)));

    let err = resolver
        .read_source(&Location::Url("https://example.com/x.tempo".to_string()))
        .unwrap_err();
    assert!(matches!(err, ModuleError::RemoteDisabled(..)));
}

/* ===================== Reading & Caching ===================== */

#[test]
fn test_read_source_uses_fetcher_for_urls() {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let mut resolver = resolver(ModuleSettings::default());
    resolver.set_fetcher(Box::new(FakeFetcher {
        body: "var answer = 42;".to_string(),
        requests: requests.clone(),
    }));

    let text = resolver
        .read_source(&Location::Url("https://example.com/a.tempo".to_string()))
        .unwrap();
    assert_eq!(text, "var answer = 42;");
    assert_eq!(*requests.borrow(), vec!["https://example.com/a.tempo"]);
}

#[test]
fn test_read_source_missing_file() {
    let err = resolver(ModuleSettings::default())
        .read_source(&Location::Path(PathBuf::from("/no/such/module.tempo")))
        .unwrap_err();
    assert!(matches!(err, ModuleError::Read { .. }));

    let script_err: ScriptError = err.into();
    assert_eq!(script_err.kind, crate::errors::ErrorKind::ImportError);
}

#[test]
fn test_cycle_detection() {
    let mut resolver = resolver(ModuleSettings::default());
    resolver.begin_loading("/a.tempo").unwrap();
    resolver.begin_loading("/b.tempo").unwrap();

    let err = resolver.begin_loading("/a.tempo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cyclic import: /a.tempo -> /b.tempo -> /a.tempo"
    );

    resolver.finish_loading("/b.tempo");
    resolver.finish_loading("/a.tempo");
    assert!(resolver.begin_loading("/a.tempo").is_ok());
}

#[test]
fn test_cache_store_and_clear() {
    let mut resolver = resolver(ModuleSettings::default());
    resolver.store(ModuleRecord {
        specifier: "./util.tempo".to_string(),
        kind: ModuleKind::File,
        key: "/project/util.tempo".to_string(),
        name: "util".to_string(),
        content: Val::Nil,
    });

    let record = resolver.cached("/project/util.tempo").unwrap();
    assert_eq!(record.kind, ModuleKind::File);
    assert_eq!(record.name, "util");

    resolver.clear();
    assert!(resolver.cached("/project/util.tempo").is_none());
}

#[test]
fn test_builtin_instantiated_once() {
    let mut resolver = resolver(ModuleSettings::default());
    let first = resolver.builtin("math").unwrap();
    let second = resolver.builtin("math").unwrap();
    match (&first, &second) {
        (Val::Obj(a), Val::Obj(b)) => assert!(Rc::ptr_eq(a, b)),
        other => panic!("Expected module objects, got {:?}", other),
    }

    let err = resolver.builtin("nope").unwrap_err();
    assert_eq!(err.to_string(), "Unknown built-in module 'nope'");
}
