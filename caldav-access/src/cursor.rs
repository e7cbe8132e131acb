// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential access over serialized ACL text.

/// Terminates the privilege fragment of an encoded ACE.
pub const FRAGMENT_SEPARATOR: char = ' ';

/// Marks the privilege fragment of an encoded ACE as inherited, also terminating it.
pub const INHERITED_MARKER: char = '^';

/// A cursor over the characters of an encoded ACL.
///
/// The cursor only moves forward, except for a single step back with [`AclCursor::back`] which
/// lets a reader "unread" a character it peeked at while looking for a fragment terminator.
#[derive(Clone, Debug)]
pub struct AclCursor<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> AclCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    /// Returns `true` if there are unread characters left.
    pub fn has_more(&self) -> bool {
        self.pos < self.chars.len()
    }

    /// Number of unread characters.
    pub fn remaining(&self) -> usize {
        self.chars.len() - self.pos
    }

    /// Consume and return the next character.
    pub fn get_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    /// Return the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Step back over the last consumed character.
    pub fn back(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Index of the next character to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Human-readable description of the current position, for error messages.
    pub fn error_info(&self) -> String {
        format!("at position {} in acl {:?}", self.pos, self.text)
    }
}
