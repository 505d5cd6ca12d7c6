//! Lexical environments
//!
//! Environments form parent-linked chains. Closures capture the environment
//! they were declared in, so the graph is shared and may contain cycles (a
//! function stored in the scope it closes over). Every environment of one
//! interpreter lives in an arena and is addressed by [`EnvId`]; nothing is
//! freed before the arena itself, so an environment stays valid for as long
//! as any closure might reach it.

use indexmap::IndexMap;

use super::types::{Span, Val};
use crate::errors::{ScriptError, ScriptResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<EnvId>,
    bindings: IndexMap<String, Val>,
}

/// Arena of environments owned by one interpreter
#[derive(Debug)]
pub struct Environments {
    scopes: Vec<Scope>,
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

impl Environments {
    /// Create an arena holding a single root environment
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> EnvId {
        EnvId(0)
    }

    fn create(&mut self, scope: Scope) -> EnvId {
        let id = EnvId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    /// New empty environment whose parent is `parent`
    pub fn child(&mut self, parent: EnvId) -> EnvId {
        self.create(Scope {
            parent: Some(parent),
            bindings: IndexMap::new(),
        })
    }

    /// New environment with a shallow copy of `env`'s own bindings and the same parent
    pub fn clone_env(&mut self, env: EnvId) -> EnvId {
        let source = &self.scopes[env.index()];
        let scope = Scope {
            parent: source.parent,
            bindings: source.bindings.clone(),
        };
        self.create(scope)
    }

    pub fn parent(&self, env: EnvId) -> Option<EnvId> {
        self.scopes[env.index()].parent
    }

    /// Walk outward from `env` looking for `name`
    pub fn get(&self, env: EnvId, name: &str) -> Option<&Val> {
        let mut current = Some(env);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(value) = scope.bindings.get(name) {
                return Some(value);
            }
            current = scope.parent;
        }
        None
    }

    pub fn lookup(&self, env: EnvId, name: &str, span: Span) -> ScriptResult<Val> {
        self.get(env, name)
            .cloned()
            .ok_or_else(|| ScriptError::unresolved(name, span))
    }

    /// Bind `name` in `env` itself, shadowing any outer binding
    pub fn declare(&mut self, env: EnvId, name: impl Into<String>, value: Val) {
        self.scopes[env.index()].bindings.insert(name.into(), value);
    }

    /// Update the nearest existing binding of `name`
    pub fn assign(&mut self, env: EnvId, name: &str, value: Val, span: Span) -> ScriptResult<()> {
        let mut current = Some(env);
        while let Some(id) = current {
            let scope = &mut self.scopes[id.index()];
            if let Some(slot) = scope.bindings.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            current = scope.parent;
        }
        Err(ScriptError::unresolved(name, span))
    }

    pub fn has_local(&self, env: EnvId, name: &str) -> bool {
        self.scopes[env.index()].bindings.contains_key(name)
    }

    /// Bindings declared directly in `env`, in declaration order
    pub fn local_bindings(&self, env: EnvId) -> impl Iterator<Item = (&String, &Val)> {
        self.scopes[env.index()].bindings.iter()
    }

    /// Number of environments allocated so far
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
