//! Ordered multi-value containers backing request headers, query, cookies and forms.
//!
//! A [`MultiMap`] keeps every value stored under a key in insertion order. The key
//! normalization is chosen by the [`KeyFold`] type parameter: [`Exact`] compares keys
//! byte for byte, [`Caseless`] folds ASCII case so `Content-Type` and `content-type`
//! address the same entry.
//!
//! Containers produced by the request parser are frozen: the write operations return
//! [`ContainerError::Immutable`] instead of silently mutating parsed data.

use std::fmt;
use std::marker::PhantomData;

use crate::protocol::{ContainerError, StatusError};

/// Key normalization policy of a [`MultiMap`].
pub trait KeyFold {
    fn eq(stored: &str, key: &str) -> bool;
}

/// Keys compare byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

/// Keys compare ignoring ASCII case.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caseless;

impl KeyFold for Exact {
    #[inline]
    fn eq(stored: &str, key: &str) -> bool {
        stored == key
    }
}

impl KeyFold for Caseless {
    #[inline]
    fn eq(stored: &str, key: &str) -> bool {
        stored.eq_ignore_ascii_case(key)
    }
}

/// Case-insensitive multi-value map, used for headers.
pub type CaselessMultiMap = MultiMap<Caseless>;

/// An ordered key to values mapping.
///
/// Keys keep the casing of their first insertion for iteration.
pub struct MultiMap<F = Exact> {
    entries: Vec<(String, Vec<String>)>,
    frozen: bool,
    _fold: PhantomData<F>,
}

impl<F: KeyFold> MultiMap<F> {
    pub fn new() -> Self {
        Self { entries: Vec::new(), frozen: false, _fold: PhantomData }
    }

    /// Builds a frozen map from ordered pairs, grouping repeated keys.
    pub fn frozen_from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.push(k.into(), v.into());
        }
        map.frozen = true;
        map
    }

    /// An empty frozen map.
    pub fn frozen() -> Self {
        let mut map = Self::new();
        map.frozen = true;
        map
    }

    pub fn freeze(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Appends `value` under `name`, keeping the values already stored.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) -> Result<(), ContainerError> {
        if self.frozen {
            return Err(ContainerError::Immutable);
        }
        self.push(name.into(), value.into());
        Ok(())
    }

    /// Replaces every value under `name` with `value`.
    pub fn replace<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) -> Result<(), ContainerError> {
        if self.frozen {
            return Err(ContainerError::Immutable);
        }
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = vec![value.into()],
            None => self.entries.push((name, vec![value.into()])),
        }
        Ok(())
    }

    /// Appends every pair of `other`.
    pub fn update<I, K, V>(&mut self, other: I) -> Result<(), ContainerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.frozen {
            return Err(ContainerError::Immutable);
        }
        for (k, v) in other {
            self.push(k.into(), v.into());
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<Vec<String>>, ContainerError> {
        if self.frozen {
            return Err(ContainerError::Immutable);
        }
        Ok(self.position(name).map(|idx| self.entries.remove(idx).1))
    }

    /// The first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).and_then(|values| values.first()).map(String::as_str)
    }

    /// The first value stored under `name`, or `default`.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    /// The first value of a mandatory field.
    ///
    /// A missing field is the client's fault, so it yields a `400 Bad Request` error
    /// that handlers can propagate with `?`.
    pub fn required(&self, name: &str) -> Result<&str, StatusError> {
        self.get(name).ok_or_else(|| StatusError::bad_request(format!("Must provide parameter '{name}'.")))
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Every `(key, value)` pair, grouped by key in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    fn push(&mut self, name: String, value: String) {
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| F::eq(k, name))
    }
}

impl<F: KeyFold> Default for MultiMap<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Clone for MultiMap<F> {
    fn clone(&self) -> Self {
        Self { entries: self.entries.clone(), frozen: self.frozen, _fold: PhantomData }
    }
}

impl<F> fmt::Debug for MultiMap<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<F> PartialEq for MultiMap<F> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<F> Eq for MultiMap<F> {}
