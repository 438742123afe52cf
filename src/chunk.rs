//! Sorted batch files.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;

use crate::buffer::WordBatch;
use crate::chars::CharReader;
use crate::sort::SortError;
use crate::word::Word;
use crate::workspace::{Region, Workspace};

pub(crate) fn buf_writer(file: fs::File, buf_size: Option<usize>) -> io::BufWriter<fs::File> {
    match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
        None => io::BufWriter::new(file),
    }
}

pub(crate) fn buf_reader(file: fs::File, buf_size: Option<usize>) -> io::BufReader<fs::File> {
    match buf_size {
        Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
        None => io::BufReader::new(file),
    }
}

/// Reads whitespace separated words from a file into reusable word buffers.
pub struct WordReader<R> {
    chars: CharReader<R>,
}

impl WordReader<io::BufReader<fs::File>> {
    pub fn open(path: &Path, buf_size: Option<usize>) -> io::Result<Self> {
        Ok(WordReader::new(buf_reader(fs::File::open(path)?, buf_size)))
    }
}

impl<R: BufRead> WordReader<R> {
    pub fn new(inner: R) -> Self {
        WordReader {
            chars: CharReader::new(inner),
        }
    }

    /// Reads the next word into `word`, skipping blank lines.
    /// At the end of the stream `word` is left empty and `false` is returned.
    pub fn read_word(&mut self, word: &mut Word) -> Result<bool, SortError> {
        word.reset();

        while let Some(ch) = self.chars.next_char()? {
            if ch.is_whitespace() {
                if word.is_empty() {
                    continue;
                }
                return Ok(true);
            }
            word.push(ch)?;
        }

        return Ok(!word.is_empty());
    }
}

/// Writes sorted words, skipping a word equal to the one written right before it.
pub struct DedupWriter<W> {
    inner: W,
    last: Word,
    written: u64,
}

impl<W: Write> DedupWriter<W> {
    pub fn new(inner: W, word_length: usize) -> Self {
        DedupWriter {
            inner,
            last: Word::new(word_length),
            written: 0,
        }
    }

    /// Writes `word` unless it equals the last written word. Returns `true` if the word was written.
    pub fn write(&mut self, word: &Word) -> Result<bool, SortError> {
        if word.is_empty() || (self.written > 0 && self.last == *word) {
            return Ok(false);
        }

        word.emit(&mut self.inner)?;
        self.last.copy_from(word)?;
        self.written += 1;

        return Ok(true);
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the sink and returns it.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Batch sorting statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Number of words read from the short-word stream.
    pub words: u64,
    /// Number of sorted batch files written.
    pub batches: u64,
}

/// Splits the short-word stream into batches, sorts and deduplicates every batch in memory
/// and saves each of them to its own sorted batch file.
pub struct BatchSorter<'a> {
    workspace: &'a Workspace,
    batch: WordBatch,
    rw_buf_size: Option<usize>,
}

impl<'a> BatchSorter<'a> {
    pub fn new(workspace: &'a Workspace, batch: WordBatch, rw_buf_size: Option<usize>) -> Self {
        #[cfg(feature = "memory-limit")]
        log::debug!("batch buffer of {} words allocated ({} bytes)", batch.limit(), batch.mem_size());

        BatchSorter {
            workspace,
            batch,
            rw_buf_size,
        }
    }

    pub fn sort(&mut self, short_words: &Path) -> Result<BatchStats, SortError> {
        let mut reader = WordReader::open(short_words, self.rw_buf_size)?;
        let mut stats = BatchStats::default();

        self.batch.reset();
        loop {
            let word_read = match self.batch.next_slot() {
                Some(slot) => reader.read_word(slot)?,
                None => false,
            };
            if word_read {
                self.batch.commit();
                stats.words += 1;
            }

            if self.batch.is_full() || (!word_read && !self.batch.is_empty()) {
                let path = self.create_batch_file()?;
                log::debug!("batch {} saved to {}", stats.batches, path.display());
                stats.batches += 1;
                self.batch.reset();
            }

            if !word_read {
                break;
            }
        }

        return Ok(stats);
    }

    fn create_batch_file(&self) -> Result<PathBuf, SortError> {
        log::debug!("sorting batch data ({} words) ...", self.batch.len());
        let sorted: BTreeSet<&Word> = self.batch.filled().iter().filter(|word| !word.is_empty()).collect();

        let (file, path) = self.workspace.create_file(Region::SortedBatches)?;
        let mut writer = buf_writer(file, self.rw_buf_size);
        for word in sorted {
            word.emit(&mut writer)?;
        }
        writer.flush()?;

        return Ok(path);
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io::Cursor;

    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rstest::*;

    use super::{BatchSorter, DedupWriter, WordReader};
    use crate::buffer::WordBatchBuilder;
    use crate::sort::SortError;
    use crate::word::Word;
    use crate::workspace::{Region, Workspace};

    #[fixture]
    fn workspace() -> Workspace {
        Workspace::new(None).unwrap()
    }

    fn read_words(input: &str, capacity: usize) -> Result<Vec<String>, SortError> {
        let mut reader = WordReader::new(Cursor::new(input));
        let mut word = Word::new(capacity);
        let mut words = Vec::new();
        while reader.read_word(&mut word)? {
            words.push(word.to_string());
        }
        assert!(word.is_empty());
        Ok(words)
    }

    fn batch_files(workspace: &Workspace) -> Vec<Vec<String>> {
        let mut batches: Vec<Vec<String>> = workspace
            .files(Region::SortedBatches)
            .unwrap()
            .map(|path| fs::read_to_string(path.unwrap()).unwrap().lines().map(String::from).collect())
            .collect();
        batches.sort();
        batches
    }

    #[rstest]
    #[case("a\nbb\nccc\n", vec!["a", "bb", "ccc"])]
    #[case("a\n\n\nb", vec!["a", "b"])]
    #[case("", vec![])]
    #[case("\n", vec![])]
    fn test_read_word(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(read_words(input, 4).unwrap(), expected);
    }

    #[test]
    fn test_read_word_overflow() {
        match read_words("abcde\n", 4) {
            Err(SortError::WordOverflow(err)) => assert_eq!(err.capacity, 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_dedup_writer() {
        let mut writer = DedupWriter::new(Vec::new(), 4);
        for text in ["a", "a", "b", "", "b", "c", "c"] {
            let mut word = Word::new(4);
            text.chars().for_each(|ch| word.push(ch).unwrap());
            writer.write(&word).unwrap();
        }
        assert_eq!(writer.written(), 3);
        assert_eq!(writer.finish().unwrap(), b"a\nb\nc\n");
    }

    #[rstest]
    fn test_batch_sorter(workspace: Workspace) {
        let (_, stream) = workspace.create_file(Region::Root).unwrap();
        fs::write(&stream, "pear\napple\npear\nfig\nkiwi\nfig\nplum\n").unwrap();

        let mut sorter = BatchSorter::new(&workspace, WordBatchBuilder::new(3, 5).build(), None);
        let stats = sorter.sort(&stream).unwrap();

        assert_eq!(stats.words, 7);
        assert_eq!(stats.batches, 3);
        assert_eq!(
            batch_files(&workspace),
            vec![vec!["apple", "pear"], vec!["fig", "kiwi"], vec!["plum"]]
        );
    }

    #[rstest]
    fn test_batch_sorter_empty_stream(workspace: Workspace) {
        let (_, stream) = workspace.create_file(Region::Root).unwrap();

        let mut sorter = BatchSorter::new(&workspace, WordBatchBuilder::new(3, 5).build(), None);
        let stats = sorter.sort(&stream).unwrap();

        assert_eq!(stats.batches, 0);
        assert!(batch_files(&workspace).is_empty());
    }

    #[rstest]
    fn test_batch_sorter_shuffled(workspace: Workspace) {
        let mut words: Vec<String> = (0..500).map(|n| format!("w{}", n % 170)).collect();
        words.shuffle(&mut StdRng::seed_from_u64(7));

        let (_, stream) = workspace.create_file(Region::Root).unwrap();
        fs::write(&stream, words.join("\n")).unwrap();

        let mut sorter = BatchSorter::new(&workspace, WordBatchBuilder::new(64, 4).build(), Some(128));
        let stats = sorter.sort(&stream).unwrap();
        assert_eq!(stats.words, 500);
        assert_eq!(stats.batches, 8);

        let mut union = BTreeSet::new();
        for batch in batch_files(&workspace) {
            let mut sorted = batch.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(batch, sorted);
            union.extend(batch);
        }
        assert_eq!(union.len(), 170);
    }
}
