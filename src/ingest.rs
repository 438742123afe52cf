//! Input partitioning into short and long words.

use std::io;
use std::io::prelude::*;
use std::path::PathBuf;

use log;

use crate::chars::CharReader;
use crate::chunk::buf_writer;
use crate::workspace::{Region, Workspace};

/// Partitioning result.
#[derive(Debug)]
pub struct Partition {
    /// Short-word stream, one word per line.
    pub short_words: PathBuf,
    /// Number of words written to the short-word stream.
    pub short_count: u64,
    /// Number of long word files created.
    pub long_count: u64,
}

/// Splits the input into a stream of short words and one file per long word.
///
/// A word is long once it has more than `word_length` code points. Short words are accumulated in
/// a buffer of `word_length` code points, long words are streamed to their own file without being buffered.
pub struct Partitioner<'a> {
    workspace: &'a Workspace,
    word_length: usize,
    rw_buf_size: Option<usize>,
}

impl<'a> Partitioner<'a> {
    pub fn new(workspace: &'a Workspace, word_length: usize, rw_buf_size: Option<usize>) -> Self {
        Partitioner {
            workspace,
            word_length,
            rw_buf_size,
        }
    }

    pub fn partition<R: BufRead>(&self, input: R) -> io::Result<Partition> {
        let mut input = CharReader::new(input);

        let (stream_file, short_words) = self.workspace.create_file(Region::Root)?;
        let mut stream_writer = buf_writer(stream_file, self.rw_buf_size);

        let mut word = String::with_capacity(self.word_length * 4);
        let mut word_len = 0;
        let mut short_count = 0;
        let mut long_count = 0;

        while let Some(ch) = input.next_char()? {
            if ch.is_whitespace() {
                if word_len > 0 {
                    flush_word(&mut stream_writer, &word)?;
                    short_count += 1;
                    word.clear();
                    word_len = 0;
                }
                continue;
            }

            word_len += 1;
            if word_len > self.word_length {
                self.spill_long_word(&word, ch, &mut input)?;
                long_count += 1;
                word.clear();
                word_len = 0;
            } else {
                word.push(ch);
            }
        }

        if word_len > 0 {
            flush_word(&mut stream_writer, &word)?;
            short_count += 1;
        }

        stream_writer.flush()?;

        log::debug!(
            "input partitioned (short words: {}, long words: {})",
            short_count,
            long_count
        );

        return Ok(Partition {
            short_words,
            short_count,
            long_count,
        });
    }

    /// Writes the buffered prefix, the current code point and the rest of the word up to the next whitespace
    /// into a new long word file.
    fn spill_long_word<R: BufRead>(&self, prefix: &str, current: char, input: &mut CharReader<R>) -> io::Result<()> {
        let (file, path) = self.workspace.create_file(Region::LongWords)?;
        let mut writer = buf_writer(file, self.rw_buf_size);

        writer.write_all(prefix.as_bytes())?;

        let mut encoded = [0u8; 4];
        writer.write_all(current.encode_utf8(&mut encoded).as_bytes())?;
        while let Some(ch) = input.next_char()? {
            if ch.is_whitespace() {
                break;
            }
            writer.write_all(ch.encode_utf8(&mut encoded).as_bytes())?;
        }

        writer.flush()?;
        log::trace!("long word saved to {}", path.display());

        return Ok(());
    }
}

fn flush_word<W: Write>(writer: &mut W, word: &str) -> io::Result<()> {
    writer.write_all(word.as_bytes())?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io::Cursor;

    use rstest::*;

    use super::Partitioner;
    use crate::workspace::{Region, Workspace};

    #[fixture]
    fn workspace() -> Workspace {
        Workspace::new(None).unwrap()
    }

    fn long_words(workspace: &Workspace) -> BTreeSet<String> {
        workspace
            .files(Region::LongWords)
            .unwrap()
            .map(|path| fs::read_to_string(path.unwrap()).unwrap())
            .collect()
    }

    #[rstest]
    #[case("banana apple banana", "banana\napple\nbanana\n", 3)]
    #[case("  \t\n leading and\ttrailing \n", "leading\nand\ntrailing\n", 3)]
    #[case("no-final-whitespace", "no-final-whitespace\n", 1)]
    #[case("", "", 0)]
    #[case(" \n\t ", "", 0)]
    #[case("ünï cödé", "ünï\ncödé\n", 2)]
    fn test_short_words(
        workspace: Workspace,
        #[case] input: &str,
        #[case] expected_stream: &str,
        #[case] expected_count: u64,
    ) {
        let partitioner = Partitioner::new(&workspace, 50, None);
        let partition = partitioner.partition(Cursor::new(input)).unwrap();

        assert_eq!(fs::read_to_string(&partition.short_words).unwrap(), expected_stream);
        assert_eq!(partition.short_count, expected_count);
        assert_eq!(partition.long_count, 0);
    }

    #[rstest]
    fn test_long_words(workspace: Workspace) {
        let partitioner = Partitioner::new(&workspace, 4, Some(16));
        let partition = partitioner
            .partition(Cursor::new("abcd abcde x éééééé\tabcdefghij"))
            .unwrap();

        assert_eq!(fs::read_to_string(&partition.short_words).unwrap(), "abcd\nx\n");
        assert_eq!(partition.short_count, 2);
        assert_eq!(partition.long_count, 3);

        let expected: BTreeSet<String> = ["abcde", "éééééé", "abcdefghij"].iter().map(|w| w.to_string()).collect();
        assert_eq!(long_words(&workspace), expected);
    }

    #[rstest]
    fn test_long_word_boundary_keeps_following_word(workspace: Workspace) {
        let partitioner = Partitioner::new(&workspace, 2, None);
        let partition = partitioner.partition(Cursor::new("abc de")).unwrap();

        assert_eq!(fs::read_to_string(&partition.short_words).unwrap(), "de\n");
        assert_eq!(long_words(&workspace).into_iter().collect::<Vec<_>>(), vec!["abc"]);
    }
}
