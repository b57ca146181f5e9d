//! Ordered attribute records backing the `tuple` and `meta` value kinds.
//!
//! Attributes keep insertion order and may be unnamed.  Schema validation and
//! reference-cycle detection belong to the record subsystem proper and are not
//! implemented here.

use std::cmp::Ordering;
use std::fmt;

use crate::error::Result;
use crate::value::{Name, Value, ValueRef};

/// One slot of a record: an optional name and a shared value handle.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: Option<Name>,
    pub value: ValueRef,
}

impl Attribute {
    pub fn named(name: &str, value: ValueRef) -> Self {
        Self {
            name: Some(Name::new(name)),
            value,
        }
    }

    pub fn unnamed(value: ValueRef) -> Self {
        Self { name: None, value }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tuple {
    attributes: Vec<Attribute>,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    /// The `{success, error}` record produced by `saveto` and `delete`.
    pub fn status(success: bool, error: &str) -> Self {
        Self::from_attributes(vec![
            Attribute::named("success", Value::bool(success)),
            Attribute::named("error", Value::string(error)),
        ])
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn get(&self, index: usize) -> Option<&ValueRef> {
        self.attributes.get(index).map(|a| &a.value)
    }

    pub fn find(&self, name: &str) -> Option<&ValueRef> {
        self.attributes
            .iter()
            .find(|a| a.name.as_ref().is_some_and(|n| n.as_str() == name))
            .map(|a| &a.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Replace the value of the first attribute called `name`, or append a
    /// new named attribute.
    pub fn set(&mut self, name: &str, value: ValueRef) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.as_ref().is_some_and(|n| n.as_str() == name))
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute::named(name, value)),
        }
    }

    /// Deep clone: every attribute value is copied as well.
    pub fn copy(&self) -> Self {
        Self {
            attributes: self
                .attributes
                .iter()
                .map(|a| Attribute {
                    name: a.name.clone(),
                    value: a.value.copy(),
                })
                .collect(),
        }
    }

    /// Element-wise three-way comparison, then by length.
    pub fn compare(&self, other: &Tuple) -> Result<Ordering> {
        for (a, b) in self.attributes.iter().zip(other.attributes.iter()) {
            match a.value.actual_compare(&b.value)? {
                Ordering::Equal => {}
                unequal => return Ok(unequal),
            }
        }

        Ok(self.len().cmp(&other.len()))
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .attributes
                .iter()
                .zip(other.attributes.iter())
                .all(|(a, b)| a.name == b.name && *a.value == *b.value)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;

        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = &attr.name {
                write!(f, "{}: ", name)?;
            }
            write!(f, "{}", attr.value)?;
        }

        f.write_str("}")
    }
}
