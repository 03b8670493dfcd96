//! Per-filesystem configuration options.
//!
//! Options participate in the filesystem cache key: resolving the same root
//! with a different option bag yields a distinct filesystem instance.

use std::collections::BTreeMap;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// An ordered bag of options, keyed by (component, option name).
///
/// The component tag scopes option names to the builder that owns them, so
/// two schemes can use the same option name without colliding. Equality and
/// hashing run over the sorted key/value sequence, which is what makes the
/// bag usable inside a filesystem cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileSystemOptions {
    entries: BTreeMap<(String, String), OptionValue>,
}

impl FileSystemOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value.
    pub fn set(&mut self, component: &str, name: &str, value: OptionValue) {
        self.entries
            .insert((component.to_string(), name.to_string()), value);
    }

    /// Looks up an option.
    pub fn get(&self, component: &str, name: &str) -> Option<&OptionValue> {
        self.entries
            .get(&(component.to_string(), name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Typed accessor surface for one component's options.
///
/// Scheme-specific builders implement this with a fixed component tag and
/// expose typed setters on top of [`FileSystemOptionBuilder::set_option`].
pub trait FileSystemOptionBuilder {
    /// The component tag scoping this builder's option names.
    fn component(&self) -> &'static str;

    fn set_option(&self, options: &mut FileSystemOptions, name: &str, value: OptionValue) {
        options.set(self.component(), name, value);
    }

    fn option<'a>(&self, options: &'a FileSystemOptions, name: &str) -> Option<&'a OptionValue> {
        options.get(self.component(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(options: &FileSystemOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        options.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = FileSystemOptions::new();
        a.set("mem", "max-size", OptionValue::Int(1024));
        a.set("mem", "strict", OptionValue::Bool(true));

        let mut b = FileSystemOptions::new();
        b.set("mem", "strict", OptionValue::Bool(true));
        b.set("mem", "max-size", OptionValue::Int(1024));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_component_scoping() {
        let mut options = FileSystemOptions::new();
        options.set("mem", "limit", OptionValue::Int(1));
        options.set("file", "limit", OptionValue::Int(2));

        assert_eq!(options.get("mem", "limit"), Some(&OptionValue::Int(1)));
        assert_eq!(options.get("file", "limit"), Some(&OptionValue::Int(2)));
        assert_eq!(options.get("ftp", "limit"), None);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_distinct_values_are_unequal() {
        let mut a = FileSystemOptions::new();
        a.set("mem", "max-size", OptionValue::Int(1024));
        let mut b = FileSystemOptions::new();
        b.set("mem", "max-size", OptionValue::Int(2048));
        assert_ne!(a, b);
        assert!(FileSystemOptions::new().is_empty());
    }
}
