//! Logical path handling. Pure helpers, no session state involved.

use crate::error::StorageError;

/// Characters that may not appear in any path segment.
const ILLEGAL: &[char] = &['*', '?', '"', '<', '>', '|'];

/// Validates a caller-supplied path before it takes part in resolution.
pub fn validate(path: &str) -> Result<(), StorageError> {
    if let Some(c) = path
        .chars()
        .find(|c| ILLEGAL.contains(c) || c.is_ascii_control())
    {
        return Err(StorageError::InvalidPath(format!(
            "'{path}' contains an illegal character ({c:?})"
        )));
    }

    Ok(())
}

/// Collapses every run of separators into a single one.
pub fn collapse(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;

    for c in path.chars() {
        if c == '/' {
            if !prev_sep {
                out.push(c);
            }
            prev_sep = true;
        } else {
            out.push(c);
            prev_sep = false;
        }
    }

    out
}

/// Resolves a root-relative logical path into the remote path.
///
/// An empty logical path resolves to the root itself. Concatenation never
/// produces doubled or trailing separators, whatever the root and the
/// logical path look like.
pub fn resolve(root: &str, logical: &str) -> String {
    let logical = logical.trim();

    let joined = if logical.is_empty() {
        collapse(root)
    } else {
        collapse(&format!("{root}/{logical}"))
    };

    trim_trailing(&joined).to_owned()
}

/// Appends an entry name to a base path with exactly one separator.
pub fn join(base: &str, name: &str) -> String {
    collapse(&format!("{base}/{name}"))
}

/// Path segments in order, with empty segments dropped.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The text after the last separator; the whole path if there is none.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn trim_trailing(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
