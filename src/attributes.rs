//! Typed attributes bag
//!
//! `Attributes` is a per-operation, mutable key/value store carried through every
//! stage of one execution. Keys pair a name with a value type, so reads are typed
//! without downcasting at call sites:
//!
//! ```rust,ignore
//! use siumai_runtime::attributes::{AttributeKey, Attributes};
//!
//! const REGION: AttributeKey<String> = AttributeKey::new("region");
//!
//! let mut attributes = Attributes::new();
//! attributes.set(&REGION, "eu-west-1".to_string());
//! assert_eq!(attributes.get(&REGION).map(String::as_str), Some("eu-west-1"));
//! ```
//!
//! A name is bound to a single value type. Reading or writing a name with a
//! different type is a programming error and panics immediately.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Strongly-typed attribute key.
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// A required attribute was not set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required attribute `{name}` is not set")]
pub struct MissingAttribute {
    pub name: &'static str,
}

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Per-operation typed key/value store.
#[derive(Default)]
pub struct Attributes {
    values: HashMap<&'static str, Entry>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, overwriting any prior value for the key.
    ///
    /// # Panics
    ///
    /// Panics if the key name is already bound to a different value type.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>, value: T) {
        if let Some(existing) = self.values.get(key.name) {
            check_type::<T>(key.name, existing);
        }
        self.values.insert(
            key.name,
            Entry {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                value: Box::new(value),
            },
        );
    }

    /// Read a value; `None` when the key is unset.
    ///
    /// # Panics
    ///
    /// Panics if the stored value has a different type than the key.
    pub fn get<T: 'static>(&self, key: &AttributeKey<T>) -> Option<&T> {
        let entry = self.values.get(key.name)?;
        check_type::<T>(key.name, entry);
        entry.value.downcast_ref::<T>()
    }

    /// Mutable access to a value; `None` when the key is unset.
    ///
    /// # Panics
    ///
    /// Panics if the stored value has a different type than the key.
    pub fn get_mut<T: 'static>(&mut self, key: &AttributeKey<T>) -> Option<&mut T> {
        let entry = self.values.get_mut(key.name)?;
        check_type::<T>(key.name, entry);
        entry.value.downcast_mut::<T>()
    }

    /// Read a value that must be present.
    pub fn require<T: 'static>(&self, key: &AttributeKey<T>) -> Result<&T, MissingAttribute> {
        self.get(key).ok_or(MissingAttribute { name: key.name })
    }

    pub fn contains<T: 'static>(&self, key: &AttributeKey<T>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn check_type<T: 'static>(name: &'static str, entry: &Entry) {
    if entry.type_id != TypeId::of::<T>() {
        panic!(
            "attribute `{name}` holds a `{}` but was accessed as `{}`",
            entry.type_name,
            std::any::type_name::<T>()
        );
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .values
            .iter()
            .map(|(name, entry)| (*name, entry.type_name))
            .collect();
        names.sort_unstable();
        f.debug_map().entries(names).finish()
    }
}

/// Keys the orchestrator populates during execution.
pub mod well_known {
    use super::AttributeKey;
    use crate::auth::SelectedAuthScheme;

    /// Operation name configured on the builder.
    pub const OPERATION_NAME: AttributeKey<String> = AttributeKey::new("siumai.operation_name");
    /// Service name configured on the builder.
    pub const SERVICE_NAME: AttributeKey<String> = AttributeKey::new("siumai.service_name");
    /// Retry partition the operation runs under.
    pub const PARTITION: AttributeKey<String> = AttributeKey::new("siumai.retry.partition");
    /// 1-based number of the current attempt.
    pub const ATTEMPT: AttributeKey<u32> = AttributeKey::new("siumai.retry.attempt");
    /// Maximum attempts allowed by the retry strategy.
    pub const MAX_ATTEMPTS: AttributeKey<u32> = AttributeKey::new("siumai.retry.max_attempts");
    /// Auth scheme chosen for the current attempt.
    pub const SELECTED_AUTH_SCHEME: AttributeKey<SelectedAuthScheme> =
        AttributeKey::new("siumai.auth.selected_scheme");
    /// Invocation id shared by every attempt of one operation.
    pub const INVOCATION_ID: AttributeKey<String> = AttributeKey::new("siumai.invocation_id");
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: AttributeKey<String> = AttributeKey::new("foo");
    const COUNT: AttributeKey<u32> = AttributeKey::new("count");
    const COUNT_AS_STRING: AttributeKey<String> = AttributeKey::new("count");

    #[test]
    fn set_overwrites_and_get_reads() {
        let mut attributes = Attributes::new();
        assert!(attributes.get(&FOO).is_none());

        attributes.set(&FOO, "bar".to_string());
        attributes.set(&FOO, "baz".to_string());
        assert_eq!(attributes.get(&FOO).map(String::as_str), Some("baz"));
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut attributes = Attributes::new();
        attributes.set(&COUNT, 1);
        *attributes.get_mut(&COUNT).unwrap() += 1;
        assert_eq!(attributes.get(&COUNT), Some(&2));
    }

    #[test]
    fn require_reports_missing_key() {
        let attributes = Attributes::new();
        let err = attributes.require(&FOO).unwrap_err();
        assert_eq!(err.name, "foo");
        assert_eq!(err.to_string(), "required attribute `foo` is not set");
    }

    #[test]
    #[should_panic(expected = "attribute `count` holds a `u32`")]
    fn reading_with_wrong_type_panics() {
        let mut attributes = Attributes::new();
        attributes.set(&COUNT, 7);
        let _ = attributes.get(&COUNT_AS_STRING);
    }

    #[test]
    #[should_panic(expected = "attribute `count`")]
    fn writing_with_wrong_type_panics() {
        let mut attributes = Attributes::new();
        attributes.set(&COUNT, 7);
        attributes.set(&COUNT_AS_STRING, "seven".to_string());
    }

    #[test]
    fn debug_lists_names() {
        let mut attributes = Attributes::new();
        attributes.set(&FOO, "bar".to_string());
        let rendered = format!("{attributes:?}");
        assert!(rendered.contains("foo"));
    }
}
