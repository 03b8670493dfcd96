//! Scope rules applied when resolving a name relative to a base.

use std::fmt;

/// The validation rule applied when resolving a name relative to a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// The resolved name must be a direct child of the base.
    Child,
    /// The resolved name must be a descendant of the base, the base itself
    /// excluded.
    Descendant,
    /// As [`NameScope::Descendant`], but the base itself is also accepted.
    DescendantOrSelf,
    /// Anywhere in the filesystem of the base.
    FileSystem,
}

impl fmt::Display for NameScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameScope::Child => write!(f, "child"),
            NameScope::Descendant => write!(f, "descendant"),
            NameScope::DescendantOrSelf => write!(f, "descendant-or-self"),
            NameScope::FileSystem => write!(f, "filesystem"),
        }
    }
}

/// Checks whether `path` fits in a particular scope of `base_path`.
///
/// Both paths must be absolute and normalized. The check is purely textual:
/// a prefix match must end exactly on a separator boundary, and `Child`
/// additionally forbids any embedded separator past that boundary.
pub fn check_name(base_path: &str, path: &str, scope: NameScope) -> bool {
    if scope == NameScope::FileSystem {
        return true;
    }

    if !path.starts_with(base_path) {
        return false;
    }

    let base_len = base_path.len();
    let bytes = path.as_bytes();

    match scope {
        NameScope::Child => {
            path.len() != base_len
                && (base_len <= 1 || bytes[base_len] == b'/')
                && !bytes[(base_len + 1).min(bytes.len())..].contains(&b'/')
        }
        NameScope::Descendant => {
            path.len() != base_len && (base_len <= 1 || bytes[base_len] == b'/')
        }
        NameScope::DescendantOrSelf => {
            base_len <= 1 || path.len() <= base_len || bytes[base_len] == b'/'
        }
        NameScope::FileSystem => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_scope_exactness() {
        assert!(check_name("/a", "/a/x", NameScope::Child));
        assert!(!check_name("/a", "/a/x/y", NameScope::Child));
        assert!(!check_name("/a", "/a", NameScope::Child));
        assert!(!check_name("/a", "/ab", NameScope::Child));
        assert!(check_name("/", "/x", NameScope::Child));
        assert!(!check_name("/", "/x/y", NameScope::Child));
    }

    #[test]
    fn test_descendant_scope() {
        assert!(check_name("/a", "/a/x", NameScope::Descendant));
        assert!(check_name("/a", "/a/x/y", NameScope::Descendant));
        assert!(!check_name("/a", "/a", NameScope::Descendant));
        assert!(!check_name("/a", "/ab", NameScope::Descendant));
        assert!(!check_name("/a", "/b", NameScope::Descendant));
    }

    #[test]
    fn test_descendant_or_self_scope() {
        assert!(check_name("/a", "/a", NameScope::DescendantOrSelf));
        assert!(check_name("/a", "/a/x", NameScope::DescendantOrSelf));
        assert!(!check_name("/a", "/ab", NameScope::DescendantOrSelf));
        assert!(check_name("/", "/", NameScope::DescendantOrSelf));
    }

    #[test]
    fn test_scopes_with_multibyte_names() {
        assert!(check_name("/", "/é", NameScope::Child));
        assert!(!check_name("/", "/é/x", NameScope::Child));
        assert!(check_name("/", "/é/x", NameScope::Descendant));
        assert!(check_name("/é", "/é/x", NameScope::Child));
        assert!(!check_name("/é", "/éx", NameScope::Descendant));
    }

    #[test]
    fn test_file_system_scope() {
        assert!(check_name("/a", "/unrelated", NameScope::FileSystem));
        assert!(check_name("/a", "/a", NameScope::FileSystem));
    }
}
