//! External word sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::buffer::WordBatchBuilder;
use crate::chunk::{buf_reader, BatchSorter};
use crate::ingest::Partitioner;
use crate::merger::FoldMerger;
use crate::reinsert::LongWordInserter;
use crate::word::WordOverflow;
use crate::workspace::{Region, Workspace};

/// Default maximum number of code points of a word sorted in memory.
pub const DEFAULT_WORD_LENGTH: usize = 50;
/// Default maximum number of words of a single in-memory batch.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Invalid sorter configuration.
    Config(String),
    /// Input file is missing, unreadable or not a regular file.
    InvalidInput { path: PathBuf, reason: String },
    /// Output file can not be written.
    InvalidOutput { path: PathBuf, reason: String },
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Common I/O error.
    IO(io::Error),
    /// A word does not fit its buffer.
    WordOverflow(WordOverflow),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::Config(_) => None,
            SortError::InvalidInput { .. } => None,
            SortError::InvalidOutput { .. } => None,
            SortError::TempDir(err) => Some(err),
            SortError::IO(err) => Some(err),
            SortError::WordOverflow(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            SortError::InvalidInput { path, reason } => write!(f, "invalid input file {}: {}", path.display(), reason),
            SortError::InvalidOutput { path, reason } => {
                write!(f, "invalid output file {}: {}", path.display(), reason)
            }
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::WordOverflow(err) => write!(f, "word buffer overflow: {}", err),
        }
    }
}

impl From<io::Error> for SortError {
    fn from(err: io::Error) -> Self {
        SortError::IO(err)
    }
}

impl From<WordOverflow> for SortError {
    fn from(err: WordOverflow) -> Self {
        SortError::WordOverflow(err)
    }
}

/// Summary of a sorting run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    /// Input words not longer than the word length.
    pub short_words: u64,
    /// Input words longer than the word length.
    pub long_words: u64,
    /// Sorted batch files written.
    pub batches: u64,
    /// Long words inserted into the result. The rest were duplicates.
    pub inserted_long_words: u64,
}

/// Word sorter builder. Provides methods for [`WordSorter`] initialization.
#[derive(Clone)]
pub struct WordSorterBuilder {
    /// Maximum number of code points of a word kept in memory.
    word_length: usize,
    /// Maximum number of words sorted in memory at once.
    batch_size: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// File read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl WordSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        WordSorterBuilder::default()
    }

    /// Builds a [`WordSorter`] instance using provided configuration.
    pub fn build(self) -> Result<WordSorter, SortError> {
        WordSorter::new(self.word_length, self.batch_size, self.tmp_dir.as_deref(), self.rw_buf_size)
    }

    /// Sets the word length threshold. Longer words are not sorted in memory.
    pub fn with_word_length(mut self, word_length: usize) -> WordSorterBuilder {
        self.word_length = word_length;
        return self;
    }

    /// Sets the number of words sorted in memory at once.
    pub fn with_batch_size(mut self, batch_size: usize) -> WordSorterBuilder {
        self.batch_size = batch_size;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> WordSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> WordSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl Default for WordSorterBuilder {
    fn default() -> Self {
        WordSorterBuilder {
            word_length: DEFAULT_WORD_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            tmp_dir: None,
            rw_buf_size: None,
        }
    }
}

/// Sorts and deduplicates the whitespace separated words of a text using bounded memory.
///
/// Peak memory is proportional to `batch_size * word_length` regardless of the input size:
/// 1. the input is split into a stream of short words and one file per long word;
/// 2. the short words are sorted and deduplicated batch by batch, each batch saved to its own file;
/// 3. the batch files are folded into a single sorted and deduplicated accumulator;
/// 4. long words are inserted into the accumulator one by one;
/// 5. the accumulator is copied to the output.
pub struct WordSorter {
    word_length: usize,
    batch_builder: WordBatchBuilder,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// File read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl WordSorter {
    /// Creates a new word sorter instance.
    ///
    /// # Arguments
    /// * `word_length` - Maximum number of code points of a word sorted in memory.
    /// * `batch_size` - Maximum number of words sorted in memory at once.
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Files read/write buffer size.
    pub fn new(
        word_length: usize,
        batch_size: usize,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        if word_length == 0 {
            return Err(SortError::Config("word length must be positive".to_string()));
        }
        if batch_size == 0 {
            return Err(SortError::Config("batch size must be positive".to_string()));
        }
        if rw_buf_size == Some(0) {
            return Err(SortError::Config("read/write buffer size must be positive".to_string()));
        }

        log::debug!(
            "word sorter configured (word length: {}, batch size: {})",
            word_length,
            batch_size
        );

        return Ok(WordSorter {
            word_length,
            batch_builder: WordBatchBuilder::new(batch_size, word_length),
            tmp_dir: tmp_path.map(Into::into),
            rw_buf_size,
        });
    }

    /// Sorts the words of the input and writes them to the output one per line.
    ///
    /// # Arguments
    /// * `input` - Input stream data to be fetched from
    /// * `output` - Stream the result is written to once every other stage succeeded
    pub fn sort<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<SortStats, SortError> {
        self.with_workspace(|workspace| {
            let (result, stats) = self.run(workspace, input)?;
            self.assemble(&result, &mut output)?;
            Ok(stats)
        })
    }

    /// Sorts the words of the input file into the output file.
    ///
    /// Both paths are validated before any processing. The result is assembled in a temporary file next to
    /// the output and renamed over it only once fully written, so a failed run leaves the output untouched.
    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortStats, SortError> {
        let input_file = open_input(input)?;
        check_output(output)?;

        self.with_workspace(|workspace| {
            let (result, stats) = self.run(workspace, input_file)?;
            replace_file(output, |output_file| self.assemble(&result, output_file))?;
            Ok(stats)
        })
    }

    fn with_workspace<T, F>(&self, f: F) -> Result<T, SortError>
    where
        F: FnOnce(&Workspace) -> Result<T, SortError>,
    {
        let workspace = Workspace::new(self.tmp_dir.as_deref()).map_err(SortError::TempDir)?;
        let result = f(&workspace);

        if let Err(err) = workspace.close() {
            log::warn!("temporary directory cleanup failed: {}", err);
        }

        return result;
    }

    fn run<R: Read>(&self, workspace: &Workspace, input: R) -> Result<(PathBuf, SortStats), SortError> {
        let input = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, input),
            None => io::BufReader::new(input),
        };

        log::info!("partitioning input ...");
        let partition = Partitioner::new(workspace, self.word_length, self.rw_buf_size).partition(input)?;

        log::info!("sorting batches ...");
        let batch_stats = BatchSorter::new(workspace, self.batch_builder.build(), self.rw_buf_size)
            .sort(&partition.short_words)?;
        fs::remove_file(&partition.short_words)?;

        log::info!("merging {} sorted batches ...", batch_stats.batches);
        let accumulator = FoldMerger::new(self.word_length, self.rw_buf_size).merge(workspace)?;
        workspace.remove(Region::SortedBatches)?;

        if partition.long_count > 0 {
            log::info!("reinserting {} long words ...", partition.long_count);
        }
        let (result, reinsert_stats) = LongWordInserter::new(self.rw_buf_size).insert_all(workspace, accumulator)?;
        workspace.remove(Region::LongWords)?;

        let stats = SortStats {
            short_words: batch_stats.words,
            long_words: partition.long_count,
            batches: batch_stats.batches,
            inserted_long_words: reinsert_stats.inserted,
        };
        log::info!("words sorted: {:?}", stats);

        return Ok((result, stats));
    }

    fn assemble<W: Write>(&self, result: &Path, output: &mut W) -> Result<u64, SortError> {
        let mut reader = buf_reader(fs::File::open(result)?, self.rw_buf_size);
        let copied = io::copy(&mut reader, output)?;
        output.flush()?;

        log::debug!("{} bytes written to the output", copied);

        return Ok(copied);
    }
}

fn open_input(path: &Path) -> Result<fs::File, SortError> {
    let invalid = |reason: String| SortError::InvalidInput {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = fs::metadata(path).map_err(|err| invalid(err.to_string()))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file".to_string()));
    }

    return fs::File::open(path).map_err(|err| invalid(err.to_string()));
}

/// Writes a new content of `path` into a sibling temporary file and renames it over `path`
/// once `write` succeeded. On error the temporary file is removed and `path` is not modified.
fn replace_file<F, T>(path: &Path, write: F) -> Result<T, SortError>
where
    F: FnOnce(&mut fs::File) -> Result<T, SortError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new().prefix(".word-sort-").tempfile_in(dir)?;
    let written = write(staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(staged.path(), metadata.permissions())?;
    }
    staged.persist(path).map_err(io::Error::from)?;

    return Ok(written);
}

fn check_output(path: &Path) -> Result<(), SortError> {
    let invalid = |reason: &str| SortError::InvalidOutput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => Err(invalid("not a regular file")),
        Ok(metadata) if metadata.permissions().readonly() => Err(invalid("file is read-only")),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if parent.is_dir() {
                Ok(())
            } else {
                Err(invalid("parent directory does not exist"))
            }
        }
        Err(err) => Err(invalid(&err.to_string())),
    }
}
