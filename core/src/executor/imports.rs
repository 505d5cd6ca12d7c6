//! Import evaluation
//!
//! Loading a source module re-enters the evaluator: the importer's runtime
//! state is parked, the module body runs on the same call stack in a fresh
//! environment derived from the prelude, and the importer's state is restored
//! whether or not the module succeeded. The module's own top-level bindings
//! become its export object.

use indexmap::IndexMap;
use tracing::debug;

use super::types::{json_to_val, ImportBinding, Span, Val};
use super::{EnvId, Interpreter};
use crate::errors::{ScriptError, ScriptResult};
use crate::modules::{
    classify, intrinsic_name, Location, ModuleError, ModuleKind, ModuleOrigin, ModuleRecord,
};
use crate::parser;

impl Interpreter {
    /// Execute an import declaration in `env`
    pub fn import_module(
        &mut self,
        env: EnvId,
        specifier: &str,
        binding: &ImportBinding,
        span: Span,
    ) -> ScriptResult<()> {
        let record = self.load_module(specifier).map_err(|err| match err.span {
            Some(_) => err,
            None => err.with_span(span),
        })?;
        self.apply_module(env, &record, binding, span)
    }

    /// Resolve and load a module without binding it anywhere
    pub fn load_module(&mut self, specifier: &str) -> ScriptResult<ModuleRecord> {
        let kind =
            classify(specifier).ok_or_else(|| ModuleError::Unrecognized(specifier.to_string()))?;
        let name = intrinsic_name(specifier, kind);

        if kind == ModuleKind::Builtin {
            let content = self.modules.builtin(specifier)?;
            return Ok(ModuleRecord {
                specifier: specifier.to_string(),
                kind,
                key: specifier.to_string(),
                name,
                content,
            });
        }

        let location = self
            .modules
            .locate(specifier, kind, self.runtime.current_origin())?;
        let key = location.key();

        if let Some(cached) = self.modules.cached(&key) {
            debug!(specifier, key = %key, "module cache hit");
            return Ok(ModuleRecord {
                specifier: specifier.to_string(),
                name,
                ..cached
            });
        }

        self.modules.begin_loading(&key)?;
        let loaded = self.load_location(&location);
        self.modules.finish_loading(&key);
        let content = loaded?;

        debug!(specifier, key = %key, kind = %kind, "module loaded");
        let record = ModuleRecord {
            specifier: specifier.to_string(),
            kind,
            key,
            name,
            content,
        };
        self.modules.store(record.clone());
        Ok(record)
    }

    fn load_location(&mut self, location: &Location) -> ScriptResult<Val> {
        let source = self.modules.read_source(location)?;
        if location.is_json() {
            let json: serde_json::Value =
                serde_json::from_str(&source).map_err(|source| ModuleError::Json {
                    location: location.to_string(),
                    source,
                })?;
            return Ok(json_to_val(&json));
        }
        self.evaluate_module(&source, location)
    }

    /// Run a module body and collect its exports
    fn evaluate_module(&mut self, source: &str, location: &Location) -> ScriptResult<Val> {
        let origin = ModuleOrigin::from_location(location);
        let name = origin.name.clone();
        let program = parser::parse_program(source).map_err(|err| err.traced(&name))?;

        let module_env = {
            let prelude = self.envs.clone_env(self.prelude());
            self.envs.child(prelude)
        };

        let saved = self.runtime.save();
        self.runtime.push_origin(origin);
        let base = self.runtime.stack.cursor();
        self.push_statements(module_env, &program.body);
        let result = self.run_until(base);
        self.runtime.pop_origin();
        self.runtime.restore(saved);
        result.map_err(|err| err.traced(&name))?;

        let exports: IndexMap<String, Val> = self
            .envs
            .local_bindings(module_env)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Val::object(exports))
    }

    /// Bind a loaded module into `env` according to the import form
    pub fn apply_module(
        &mut self,
        env: EnvId,
        record: &ModuleRecord,
        binding: &ImportBinding,
        span: Span,
    ) -> ScriptResult<()> {
        match binding {
            ImportBinding::Module => {
                self.envs
                    .declare(env, record.name.clone(), record.content.clone());
            }
            ImportBinding::Alias { name } => {
                self.envs.declare(env, name.clone(), record.content.clone());
            }
            ImportBinding::Export { name } => {
                let value = match &record.content {
                    Val::Obj(map) => map.borrow().get(name).cloned(),
                    _ => None,
                };
                let value = value.ok_or_else(|| {
                    ScriptError::import(format!(
                        "Module '{}' has no export '{}'",
                        record.specifier, name
                    ))
                    .with_span(span)
                })?;
                self.envs.declare(env, name.clone(), value);
            }
        }
        Ok(())
    }
}
