//! Reference-resolution capability.
//!
//! Reference values (`$path`) are not looked up in the variable scopes; the
//! environment hands them to an injected [`Resolver`].  The document layer
//! that normally owns these paths lives outside this crate, so only the
//! interface and a map-backed implementation are provided here.

use std::collections::HashMap;

use log::debug;

use crate::value::{Value, ValueRef};

pub trait Resolver {
    /// Look `path` up, relative to `context` when one is given.
    fn get(&self, path: &str, context: Option<&ValueRef>) -> Option<ValueRef>;

    /// Store `value` at `path`.  Returns `false` when the path cannot be
    /// written.
    fn set(&mut self, path: &str, context: Option<&ValueRef>, value: ValueRef) -> bool;
}

/// Flat path → value map.
///
/// Paths are `.`/`/` separated.  A leading `/` makes a path absolute;
/// otherwise a string or name context is prepended as the parent path.
#[derive(Debug, Default)]
pub struct MapResolver {
    slots: HashMap<String, ValueRef>,
    read_only: bool,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that serves lookups but rejects every `set`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn insert(&mut self, path: &str, value: ValueRef) {
        self.slots.insert(normalize(path, None), value);
    }

    fn key(path: &str, context: Option<&ValueRef>) -> String {
        normalize(path, context)
    }
}

fn normalize(path: &str, context: Option<&ValueRef>) -> String {
    let absolute = path.starts_with('/');
    let relative = path.trim_start_matches('/').replace('/', ".");

    if absolute {
        return relative;
    }

    let parent = context.and_then(|ctx| match &**ctx {
        Value::String(s) => Some(s.borrow().replace('/', ".")),
        Value::Name(n) => Some(n.as_str().to_owned()),
        _ => None,
    });

    match parent {
        Some(parent) if !parent.is_empty() => format!("{}.{}", parent.trim_matches('.'), relative),
        _ => relative,
    }
}

impl Resolver for MapResolver {
    fn get(&self, path: &str, context: Option<&ValueRef>) -> Option<ValueRef> {
        let key = Self::key(path, context);

        debug!("Resolving reference {}", key);

        self.slots.get(&key).cloned()
    }

    fn set(&mut self, path: &str, context: Option<&ValueRef>, value: ValueRef) -> bool {
        if self.read_only {
            return false;
        }

        self.slots.insert(Self::key(path, context), value);
        true
    }
}
