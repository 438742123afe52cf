//! Fixed-capacity word buffer.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;

/// Error returned when a code point is written outside of the occupied prefix of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordOverflow {
    /// Slot the write was attempted at.
    pub slot: usize,
    /// Word capacity.
    pub capacity: usize,
}

impl fmt::Display for WordOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} is out of the word bounds (capacity: {})", self.slot, self.capacity)
    }
}

impl std::error::Error for WordOverflow {}

/// A word of at most `capacity` code points.
///
/// Slots are allocated once and reused: [`Word::reset`] only drops the occupied length.
/// Slots past the occupied length are unset and compare less than any code point, so comparing
/// two words yields plain lexicographic order where a proper prefix sorts first.
#[derive(Clone)]
#[cfg_attr(feature = "memory-limit", derive(deepsize::DeepSizeOf))]
pub struct Word {
    slots: Vec<char>,
    len: usize,
}

impl Word {
    pub fn new(capacity: usize) -> Self {
        Word {
            slots: vec!['\0'; capacity],
            len: 0,
        }
    }

    /// Writes a code point at `slot`.
    /// Slots are filled left to right, so `slot` may overwrite an occupied slot or extend the word by one.
    pub fn set(&mut self, slot: usize, ch: char) -> Result<(), WordOverflow> {
        if slot >= self.slots.len() || slot > self.len {
            return Err(WordOverflow {
                slot,
                capacity: self.slots.len(),
            });
        }

        self.slots[slot] = ch;
        if slot == self.len {
            self.len += 1;
        }

        return Ok(());
    }

    /// Appends a code point to the end of the word.
    pub fn push(&mut self, ch: char) -> Result<(), WordOverflow> {
        self.set(self.len, ch)
    }

    /// Marks all slots as unset.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied code points.
    pub fn as_chars(&self) -> &[char] {
        &self.slots[..self.len]
    }

    /// Copies the content of another word into this one.
    pub fn copy_from(&mut self, other: &Word) -> Result<(), WordOverflow> {
        if other.len > self.slots.len() {
            return Err(WordOverflow {
                slot: other.len - 1,
                capacity: self.slots.len(),
            });
        }

        self.slots[..other.len].copy_from_slice(other.as_chars());
        self.len = other.len;

        return Ok(());
    }

    /// Writes the word followed by a line terminator. Empty words are not written at all.
    pub fn emit<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut encoded = [0u8; 4];
        for ch in self.as_chars() {
            sink.write_all(ch.encode_utf8(&mut encoded).as_bytes())?;
        }
        sink.write_all(b"\n")
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.as_chars() == other.as_chars()
    }
}

impl Eq for Word {}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_chars().cmp(other.as_chars())
    }
}

impl Hash for Word {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_chars().hash(state);
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_chars().iter().try_for_each(|ch| fmt::Write::write_char(f, *ch))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:?}, capacity: {})", self.to_string(), self.capacity())
    }
}
