//! Drive-letter path handling
//!
//! Paths are `"<letter>:"` optionally followed by `/segment/...`. The letter
//! picks the mount; what follows the colon is handed to the backend
//! untouched (`"/"` for the bare drive).

use crate::{VfsError, VfsResult};

/// Separator between drive letter and path
pub const DRIVE_SEPARATOR: char = ':';

/// Path separator
pub const SEPARATOR: char = '/';

/// Number of drive letters: `A`-`Z` then `0`-`9`
pub const MAX_DRIVES: usize = 36;

/// Validate and upper-case a drive letter
pub fn normalize_letter(letter: char) -> VfsResult<char> {
    if letter.is_ascii_alphanumeric() {
        Ok(letter.to_ascii_uppercase())
    } else {
        Err(VfsError::InvalidDriveLetter)
    }
}

/// Slot of a normalized drive letter (A=0 .. Z=25, 0=26 .. 9=35)
pub fn drive_index(letter: char) -> Option<usize> {
    match letter.to_ascii_uppercase() {
        c @ 'A'..='Z' => Some(c as usize - 'A' as usize),
        c @ '0'..='9' => Some(26 + c as usize - '0' as usize),
        _ => None,
    }
}

/// Check if a character is a valid drive letter
pub fn is_drive_letter(c: char) -> bool {
    drive_index(c).is_some()
}

/// A path split into drive and backend path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivePath<'a> {
    /// Upper-case drive letter
    pub letter: char,
    /// Path on the drive, always starting with `/`
    pub path: &'a str,
}

/// Split `path` into drive letter and backend path
pub fn parse(path: &str) -> VfsResult<DrivePath<'_>> {
    let mut chars = path.chars();
    let first = chars.next().ok_or(VfsError::InvalidPath)?;
    if chars.next() != Some(DRIVE_SEPARATOR) {
        return Err(VfsError::InvalidPath);
    }
    let letter = normalize_letter(first)?;

    let rest = &path[first.len_utf8() + DRIVE_SEPARATOR.len_utf8()..];
    let rest = if rest.is_empty() {
        "/"
    } else if rest.starts_with(SEPARATOR) {
        rest
    } else {
        return Err(VfsError::InvalidPath);
    };

    Ok(DrivePath { letter, path: rest })
}
