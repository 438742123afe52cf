//! Preallocated batch buffer.

use crate::word::Word;

/// Batch buffer builder.
pub struct WordBatchBuilder {
    batch_size: usize,
    word_length: usize,
}

impl WordBatchBuilder {
    pub fn new(batch_size: usize, word_length: usize) -> Self {
        WordBatchBuilder {
            batch_size,
            word_length,
        }
    }

    /// Creates a new buffer with all word slots allocated upfront.
    pub fn build(&self) -> WordBatch {
        WordBatch::new(self.batch_size, self.word_length)
    }
}

/// Buffer of at most `limit` words.
///
/// The words are allocated once and reused for every batch, so the buffer is the only structure
/// whose size depends on the batch size and word length.
pub struct WordBatch {
    words: Vec<Word>,
    filled: usize,
}

impl WordBatch {
    pub fn new(limit: usize, word_length: usize) -> Self {
        WordBatch {
            words: (0..limit).map(|_| Word::new(word_length)).collect(),
            filled: 0,
        }
    }

    /// Returns the next free word slot, already reset. The slot is not counted until [`WordBatch::commit`].
    pub fn next_slot(&mut self) -> Option<&mut Word> {
        let word = self.words.get_mut(self.filled)?;
        word.reset();
        Some(word)
    }

    /// Counts the slot returned by the last [`WordBatch::next_slot`] call as filled.
    pub fn commit(&mut self) {
        if self.filled < self.words.len() {
            self.filled += 1;
        }
    }

    /// Returns buffer length
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.filled >= self.words.len()
    }

    pub fn limit(&self) -> usize {
        self.words.len()
    }

    /// Filled words, in insertion order.
    pub fn filled(&self) -> &[Word] {
        &self.words[..self.filled]
    }

    /// Resets every word slot and empties the buffer.
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(Word::reset);
        self.filled = 0;
    }
}

#[cfg(test)]
mod test {
    use super::WordBatchBuilder;

    #[test]
    fn test_word_batch() {
        let builder = WordBatchBuilder::new(2, 4);
        let mut batch = builder.build();
        assert_eq!(batch.limit(), 2);
        assert!(batch.is_empty());

        batch.next_slot().unwrap().push('b').unwrap();
        batch.commit();
        assert_eq!(batch.is_full(), false);

        let slot = batch.next_slot().unwrap();
        slot.push('a').unwrap();
        assert_eq!(slot.capacity(), 4);
        batch.commit();
        assert_eq!(batch.is_full(), true);
        assert!(batch.next_slot().is_none());

        let data: Vec<String> = batch.filled().iter().map(ToString::to_string).collect();
        assert_eq!(data, vec!["b", "a"]);

        batch.reset();
        assert!(batch.is_empty());
        assert!(batch.next_slot().unwrap().is_empty());
    }

    #[test]
    fn test_uncommitted_slot_is_not_counted() {
        let mut batch = WordBatchBuilder::new(3, 4).build();
        batch.next_slot().unwrap().push('x').unwrap();
        assert_eq!(batch.len(), 0);
        assert!(batch.filled().is_empty());
    }
}

#[cfg(feature = "memory-limit")]
pub mod mem {
    use deepsize::DeepSizeOf;

    use super::WordBatch;

    impl WordBatch {
        /// Deep size of the word slots in bytes, including every preallocated word.
        pub fn mem_size(&self) -> u64 {
            self.words.deep_size_of() as u64
        }
    }

    #[cfg(test)]
    mod test {
        use super::super::WordBatchBuilder;

        #[test]
        fn test_mem_size_does_not_grow() {
            let mut batch = WordBatchBuilder::new(4, 8).build();
            let initial = batch.mem_size();
            // 4 words of 8 chars each
            assert!(initial >= 4 * 8 * 4);

            for _ in 0..4 {
                let slot = batch.next_slot().unwrap();
                for ch in "abcdefgh".chars() {
                    slot.push(ch).unwrap();
                }
                batch.commit();
            }
            assert_eq!(batch.mem_size(), initial);
        }
    }
}
