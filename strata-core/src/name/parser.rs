//! Low-level tokenizing and normalization of raw path/URI strings.
//!
//! All functions here operate on plain strings; nothing in this module knows
//! about filesystems or providers. See RFC 2396 for the URI grammar.

use crate::error::{Result, VfsError};

/// The canonical separator character.
pub const SEPARATOR_CHAR: char = '/';

/// The canonical separator as a string.
pub const SEPARATOR: &str = "/";

/// The separator that gets translated to the canonical one.
const TRANS_SEPARATOR: char = '\\';

/// Whether a raw path looked like a folder (trailing separator) or a file
/// before normalization stripped the trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Folder,
    File,
}

/// Replaces every accepted separator with the canonical one.
///
/// Returns true if the string was modified.
pub fn fix_separators(name: &mut String) -> bool {
    if !name.contains(TRANS_SEPARATOR) {
        return false;
    }
    *name = name.replace(TRANS_SEPARATOR, SEPARATOR);
    true
}

/// Normalizes an absolute path in place:
///
/// - drops empty and `.` elements
/// - a `..` element pops the previous element, failing when there is none
/// - the result always starts with the separator and carries no trailing
///   separator unless it is exactly the root
///
/// Separators are assumed to be fixed already. Empty input and input
/// consisting solely of separators both normalize to the root path.
pub fn normalize_path(path: &mut String) -> Result<PathKind> {
    let kind = if path.is_empty() || path.ends_with(SEPARATOR_CHAR) {
        PathKind::Folder
    } else {
        PathKind::File
    };

    let normalized = {
        let mut elements: Vec<&str> = Vec::new();
        for element in path.split(SEPARATOR_CHAR) {
            match element {
                "" | "." => {}
                ".." => {
                    if elements.pop().is_none() {
                        return Err(VfsError::InvalidRelativePath { path: path.clone() });
                    }
                }
                other => elements.push(other),
            }
        }

        if elements.is_empty() {
            SEPARATOR.to_string()
        } else {
            let mut out = String::with_capacity(path.len());
            for element in elements {
                out.push(SEPARATOR_CHAR);
                out.push_str(element);
            }
            out
        }
    };

    *path = normalized;
    Ok(kind)
}

/// Extracts the scheme from a URI, returning the scheme and the remainder
/// after the `:` delimiter. Returns None if there is no scheme.
///
/// A scheme starts with a letter and continues with letters, digits, `+`,
/// `-` or `.` (RFC 2396).
pub fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    for (pos, ch) in uri.char_indices() {
        match ch {
            ':' => {
                if pos == 0 {
                    return None;
                }
                return Some((&uri[..pos], &uri[pos + 1..]));
            }
            'a'..='z' | 'A'..='Z' => {}
            '0'..='9' | '+' | '-' | '.' if pos > 0 => {}
            _ => return None,
        }
    }
    None
}

/// Extracts just the scheme from a URI, if any.
pub fn extract_scheme(uri: &str) -> Option<&str> {
    split_scheme(uri).map(|(scheme, _)| scheme)
}

/// Removes `%nn` encodings from a string.
///
/// Fails when a `%` is not followed by two hex digits, or when the decoded
/// bytes are not valid UTF-8.
pub fn decode(encoded: &str) -> Result<String> {
    if !encoded.contains('%') {
        return Ok(encoded.to_string());
    }

    let bytes = encoded.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let b = bytes[index];
        if b != b'%' {
            out.push(b);
            index += 1;
            continue;
        }
        if index + 2 >= bytes.len() {
            return Err(VfsError::InvalidEscapeSequence {
                input: encoded.to_string(),
                sequence: encoded[index..].to_string(),
            });
        }
        let dig1 = (bytes[index + 1] as char).to_digit(16);
        let dig2 = (bytes[index + 2] as char).to_digit(16);
        match (dig1, dig2) {
            (Some(hi), Some(lo)) => {
                out.push((hi << 4 | lo) as u8);
                index += 3;
            }
            _ => {
                // The offending bytes may cut into a multi-byte character;
                // render them lossily rather than slicing the str.
                let end = (index + 3).min(bytes.len());
                return Err(VfsError::InvalidEscapeSequence {
                    input: encoded.to_string(),
                    sequence: String::from_utf8_lossy(&bytes[index..end]).into_owned(),
                });
            }
        }
    }

    String::from_utf8(out).map_err(|_| VfsError::InvalidEscapeSequence {
        input: encoded.to_string(),
        sequence: String::new(),
    })
}

/// Converts reserved characters to their `%nn` value. Always encodes `%`.
pub fn encode(decoded: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        if ch == '%' || reserved.contains(&ch) {
            out.push('%');
            out.push_str(&format!("{:02x}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Splits the query string off a URI tail, returning it without the `?`.
pub fn extract_query_string(name: &mut String) -> Option<String> {
    if let Some(pos) = name.find('?') {
        let query = name[pos + 1..].to_string();
        name.truncate(pos);
        Some(query)
    } else {
        None
    }
}

/// Removes and returns the first path element. The remainder keeps its
/// leading separator, so repeated extraction walks the elements in order.
pub fn extract_first_element(name: &mut String) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let start = usize::from(name.starts_with(SEPARATOR_CHAR));
    match name[start..].find(SEPARATOR_CHAR) {
        Some(pos) => {
            let element = name[start..start + pos].to_string();
            *name = name[start + pos..].to_string();
            Some(element)
        }
        None => {
            let element = name[start..].to_string();
            name.clear();
            Some(element)
        }
    }
}
