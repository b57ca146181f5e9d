//! Variable scopes, the native function registry, and the injected
//! capabilities (reference resolver, file system).
//!
//! Scopes form a stack, innermost last in storage and searched first.  The
//! global scope is never popped.  An `Environment` must not be shared between
//! threads; nothing here is synchronised.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use log::{debug, info};

use crate::fs::{FileSystem, LocalFileSystem};
use crate::function::Function;
use crate::resolver::Resolver;
use crate::value::{Value, ValueRef};

pub struct Environment {
    scopes: Vec<HashMap<String, ValueRef>>,
    functions: HashMap<String, Function>,
    resolver: Option<Box<dyn Resolver>>,
    file_system: Box<dyn FileSystem>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("scopes", &self.scopes)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Environment {
    /// A single global scope, no resolver, the local file system.
    pub fn new() -> Self {
        info!("Initializing Environment");

        Environment {
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            resolver: None,
            file_system: Box::new(LocalFileSystem),
        }
    }

    pub fn with_resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_file_system<F: FileSystem + 'static>(mut self, file_system: F) -> Self {
        self.file_system = Box::new(file_system);
        self
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.file_system.as_ref()
    }

    // ───────────────────────── variables ─────────────────────────

    /// Stored value, or a `false` boolean when the name is unbound.  Never
    /// fails.
    pub fn get(&self, name: &str) -> ValueRef {
        self.get_actual(name).unwrap_or_else(|| Value::bool(false))
    }

    /// Stored value from the innermost scope that binds `name`.
    pub fn get_actual(&self, name: &str) -> Option<ValueRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Overwrite the nearest existing binding, or create one in the top
    /// scope.
    pub fn set(&mut self, name: &str, value: ValueRef) {
        debug!("Setting variable '{}' to {}", name, value);

        if let Some(scope) = self.scopes.iter_mut().rev().find(|scope| scope.contains_key(name)) {
            scope.insert(name.to_owned(), value);
            return;
        }

        self.set_top(name, value);
    }

    /// Bind `name` in the top scope, shadowing any outer binding.
    pub fn set_top(&mut self, name: &str, value: ValueRef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), value);
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());

        info!("Pushed scope, depth {}", self.scopes.len());
    }

    /// Drop the top scope.  The global scope stays.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();

            info!("Popped scope, depth {}", self.scopes.len());
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a scope that is popped again when the guard drops, on every exit
    /// path.
    pub fn scope(&mut self) -> ScopeGuard<'_> {
        self.push();

        ScopeGuard { env: self }
    }

    // ───────────────────────── references ────────────────────────

    pub fn get_path(&self, path: &str, context: Option<&ValueRef>) -> Option<ValueRef> {
        self.resolver.as_ref()?.get(path, context)
    }

    /// `false` when there is no resolver or it refuses the write.
    pub fn set_path(&mut self, path: &str, context: Option<&ValueRef>, value: ValueRef) -> bool {
        match self.resolver.as_mut() {
            Some(resolver) => resolver.set(path, context, value),
            None => false,
        }
    }

    // ───────────────────────── functions ─────────────────────────

    pub fn get_function(&self, path: &str) -> Option<Function> {
        self.functions.get(path).cloned()
    }

    pub fn set_function(&mut self, path: &str, function: Function) {
        debug!("Registering function '{}'", path);

        self.functions.insert(path.to_owned(), function);
    }
}

/// Scope handle returned by [`Environment::scope`].
pub struct ScopeGuard<'e> {
    env: &'e mut Environment,
}

impl Deref for ScopeGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.pop();
    }
}
