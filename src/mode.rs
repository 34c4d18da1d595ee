//! Open-mode grammar for cache file handles
//!
//! A mode string is scanned for the letters `r`, `w`, `a`, and the
//! `+` flag; `b` is accepted and ignored (binary is the only
//! representation). Unknown letters are ignored, so a malformed mode
//! degrades to an empty one that permits nothing.

/// Parsed open mode for a cache file handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    read: bool,
    write: bool,
    append: bool,
    plus: bool,
}

impl OpenMode {
    /// Scan a mode string for its flags
    pub fn parse(mode: &str) -> Self {
        let mut parsed = Self::default();
        for ch in mode.chars() {
            match ch {
                'r' => parsed.read = true,
                'w' => parsed.write = true,
                'a' => parsed.append = true,
                '+' => parsed.plus = true,
                _ => {}
            }
        }
        parsed
    }

    /// Reading through the handle is permitted
    pub const fn can_read(&self) -> bool {
        self.read || ((self.write || self.append) && self.plus)
    }

    /// Writing through the handle is permitted
    pub const fn can_write(&self) -> bool {
        self.write || self.append || (self.read && self.plus)
    }

    /// The base `r` letter was present; open fails on a missing path
    pub const fn requires_existing(&self) -> bool {
        self.read
    }

    /// The base `w` letter was present; a miss creates an empty entry
    pub const fn truncates(&self) -> bool {
        self.write
    }

    /// The base `a` letter was present; the cursor snaps to the end on
    /// every write
    pub const fn appends(&self) -> bool {
        self.append
    }
}
