//! Long word reinsertion.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;

use crate::chars::CharReader;
use crate::chunk::{buf_reader, buf_writer};
use crate::sort::SortError;
use crate::workspace::{PingPong, Region, Workspace};

/// Position of a long word in a sorted accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Insert before the zero-based line.
    Before(u64),
    /// The accumulator already contains the word.
    Duplicate,
    /// Every accumulator word is smaller, append to the end.
    Append,
}

/// Order of an accumulator line relative to a long word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOrder {
    Less,
    Equal,
    Greater,
    Exhausted,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReinsertStats {
    /// Long words spliced into the accumulator.
    pub inserted: u64,
    /// Long words dropped because the accumulator already contained them.
    pub duplicates: u64,
}

/// Inserts long words into a sorted accumulator one by one.
///
/// Long words are never loaded into memory: every accumulator line is compared with the long word
/// file re-read from its start, and the insertion rewrites the whole accumulator into a new snapshot.
/// Each long word therefore costs a full scan of the accumulator.
pub struct LongWordInserter {
    rw_buf_size: Option<usize>,
}

impl LongWordInserter {
    pub fn new(rw_buf_size: Option<usize>) -> Self {
        LongWordInserter { rw_buf_size }
    }

    /// Inserts every file of the long words region into `accumulator`.
    /// Returns the path of the resulting snapshot.
    pub fn insert_all(&self, workspace: &Workspace, accumulator: PathBuf) -> Result<(PathBuf, ReinsertStats), SortError> {
        let (_, spare) = workspace.create_file(Region::Root)?;
        let mut pair = PingPong::new(accumulator, spare);
        let mut stats = ReinsertStats::default();

        for long_word in workspace.files(Region::LongWords)? {
            let long_word = long_word?;

            match self.locate(pair.source(), &long_word)? {
                Placement::Duplicate => {
                    log::debug!("long word {} is a duplicate", long_word.display());
                    stats.duplicates += 1;
                }
                placement => {
                    log::debug!("inserting long word {} ({:?})", long_word.display(), placement);
                    self.splice(pair.source(), &long_word, pair.target(), placement)?;
                    pair.swap();
                    stats.inserted += 1;
                }
            }
        }

        log::info!(
            "long words reinserted (inserted: {}, duplicates: {})",
            stats.inserted,
            stats.duplicates
        );

        return Ok((pair.into_source(), stats));
    }

    /// Finds the position of the long word stored in `long_word` within the sorted `accumulator`.
    pub fn locate(&self, accumulator: &Path, long_word: &Path) -> Result<Placement, SortError> {
        let mut lines = CharReader::new(buf_reader(fs::File::open(accumulator)?, self.rw_buf_size));
        let mut word = CharReader::new(buf_reader(fs::File::open(long_word)?, self.rw_buf_size));

        let mut line = 0;
        loop {
            word.get_mut().rewind()?;

            match compare_line(&mut lines, &mut word)? {
                LineOrder::Less => line += 1,
                LineOrder::Equal => return Ok(Placement::Duplicate),
                LineOrder::Greater => return Ok(Placement::Before(line)),
                LineOrder::Exhausted => return Ok(Placement::Append),
            }
        }
    }

    /// Writes `accumulator` into `output` with the long word inserted at `placement`.
    /// A [`Placement::Duplicate`] copies the accumulator unchanged.
    pub fn splice(&self, accumulator: &Path, long_word: &Path, output: &Path, placement: Placement) -> Result<(), SortError> {
        let mut reader = buf_reader(fs::File::open(accumulator)?, self.rw_buf_size);
        let mut writer = buf_writer(fs::File::create(output)?, self.rw_buf_size);

        match placement {
            Placement::Before(line) => {
                copy_lines(&mut reader, &mut writer, line)?;
                self.write_long_word(long_word, &mut writer)?;
                io::copy(&mut reader, &mut writer)?;
            }
            Placement::Append => {
                io::copy(&mut reader, &mut writer)?;
                self.write_long_word(long_word, &mut writer)?;
            }
            Placement::Duplicate => {
                io::copy(&mut reader, &mut writer)?;
            }
        }

        writer.flush()?;

        return Ok(());
    }

    fn write_long_word<W: Write>(&self, long_word: &Path, writer: &mut W) -> io::Result<()> {
        let mut word = buf_reader(fs::File::open(long_word)?, self.rw_buf_size);
        io::copy(&mut word, writer)?;
        writer.write_all(b"\n")
    }
}

/// Compares the next accumulator line with the long word code point by code point.
/// The accumulator is left positioned at the start of the next line unless the line is not smaller.
fn compare_line<A: BufRead, L: BufRead>(lines: &mut CharReader<A>, word: &mut CharReader<L>) -> io::Result<LineOrder> {
    loop {
        let line_ch = lines.next_char()?;
        let word_ch = word.next_char()?.filter(|ch| !ch.is_whitespace());

        let word_ch = match word_ch {
            Some(ch) => ch,
            None => {
                return Ok(match line_ch {
                    Some(ch) if !ch.is_whitespace() => LineOrder::Greater,
                    _ => LineOrder::Equal,
                })
            }
        };

        match line_ch {
            None => return Ok(LineOrder::Exhausted),
            Some(ch) if ch.is_whitespace() => return Ok(LineOrder::Less),
            Some(ch) if ch == word_ch => continue,
            Some(ch) if ch > word_ch => return Ok(LineOrder::Greater),
            Some(_) => {
                lines.skip_word()?;
                return Ok(LineOrder::Less);
            }
        }
    }
}

/// Copies `count` complete lines without buffering any of them.
fn copy_lines<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, mut count: u64) -> io::Result<()> {
    while count > 0 {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        let (consumed, line_end) = match buf.iter().position(|byte| *byte == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buf.len(), false),
        };
        writer.write_all(&buf[..consumed])?;
        reader.consume(consumed);

        if line_end {
            count -= 1;
        }
    }

    return Ok(());
}
