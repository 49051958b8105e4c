//! Addresses - paths from the document root
//!
//! Change records name their target with a bracketed path in the same shape
//! the original tooling uses, e.g. `['nodes'][0]['Running']`.

use std::fmt;

use crate::error::ObservableError;
use crate::Result;

/// One step of an address: a map field or a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl Key {
    /// The field name, if this is a map key
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Key::Field(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    /// The index, if this is a sequence key
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Field(_) => None,
            Key::Index(index) => Some(*index),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => write!(f, "['{name}']"),
            Key::Index(index) => write!(f, "[{index}]"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// A path of keys from the document root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address(pub Vec<Key>);

impl Address {
    /// The root address
    pub fn root() -> Self {
        Address(Vec::new())
    }

    /// True for the document root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Extend with one more key
    #[must_use]
    pub fn child(&self, key: Key) -> Address {
        let mut keys = self.0.clone();
        keys.push(key);
        Address(keys)
    }

    /// Parse a bracketed path
    ///
    /// The empty string addresses the root. Field names may not contain a
    /// single quote; the writer never produces one.
    pub fn parse(text: &str) -> Result<Address> {
        let mut keys = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let inner = rest
                .strip_prefix('[')
                .and_then(|r| r.split_once(']'))
                .ok_or_else(|| ObservableError::AddressParse(text.to_string()))?;
            let (segment, tail) = inner;
            if let Some(quoted) = segment.strip_prefix('\'') {
                let name = quoted
                    .strip_suffix('\'')
                    .ok_or_else(|| ObservableError::AddressParse(text.to_string()))?;
                if name.contains('\'') {
                    return Err(ObservableError::AddressParse(text.to_string()));
                }
                keys.push(Key::Field(name.to_string()));
            } else {
                let index: usize = segment
                    .parse()
                    .map_err(|_| ObservableError::AddressParse(text.to_string()))?;
                keys.push(Key::Index(index));
            }
            rest = tail;
        }
        Ok(Address(keys))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.0 {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
