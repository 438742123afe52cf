//! Sequential fold merger.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use log;

use crate::chunk::{buf_writer, DedupWriter, WordReader};
use crate::sort::SortError;
use crate::word::Word;
use crate::workspace::{PingPong, Region, Workspace};

/// Merges sorted batch files into a single sorted and deduplicated accumulator.
///
/// Batch files are folded one by one into the accumulator using a two-way merge, so only three word buffers
/// are held in memory at any time. Time complexity is *n* \* *m* in worst case where *n* is the number of
/// items and *m* is the number of batches. Batches may be visited in any order.
pub struct FoldMerger {
    left: Word,
    right: Word,
    word_length: usize,
    rw_buf_size: Option<usize>,
}

impl FoldMerger {
    pub fn new(word_length: usize, rw_buf_size: Option<usize>) -> Self {
        FoldMerger {
            left: Word::new(word_length),
            right: Word::new(word_length),
            word_length,
            rw_buf_size,
        }
    }

    /// Folds every file of the sorted batches region into an accumulator and returns its path.
    /// If the region is empty the accumulator is an empty file.
    pub fn merge(&mut self, workspace: &Workspace) -> Result<PathBuf, SortError> {
        let mut accumulator: Option<PingPong> = None;
        let mut folds = 0;

        for batch in workspace.files(Region::SortedBatches)? {
            let batch = batch?;

            if let Some(pair) = accumulator.as_mut() {
                let written = self.merge_pair(&batch, pair.source(), pair.target())?;
                pair.swap();
                folds += 1;
                log::debug!("batch {} folded into accumulator ({} words)", batch.display(), written);
                continue;
            }

            let (_, first) = workspace.create_file(Region::Root)?;
            let (_, second) = workspace.create_file(Region::Root)?;
            fs::copy(&batch, &first)?;
            log::debug!("accumulator seeded from {}", batch.display());
            accumulator = Some(PingPong::new(first, second));
        }

        log::info!("merged sorted batches ({} folds)", folds);

        match accumulator {
            Some(pair) => Ok(pair.into_source()),
            None => {
                let (_, empty) = workspace.create_file(Region::Root)?;
                Ok(empty)
            }
        }
    }

    /// Merges two sorted files into `output` dropping duplicates. Returns the number of words written.
    pub fn merge_pair(&mut self, batch: &Path, accumulator: &Path, output: &Path) -> Result<u64, SortError> {
        let mut left_reader = WordReader::open(batch, self.rw_buf_size)?;
        let mut right_reader = WordReader::open(accumulator, self.rw_buf_size)?;
        let writer = buf_writer(fs::File::create(output)?, self.rw_buf_size);
        let mut writer = DedupWriter::new(writer, self.word_length);

        left_reader.read_word(&mut self.left)?;
        right_reader.read_word(&mut self.right)?;

        while !self.left.is_empty() || !self.right.is_empty() {
            let take_left = if self.left.is_empty() {
                false
            } else if self.right.is_empty() {
                true
            } else {
                self.left.cmp(&self.right) != Ordering::Greater
            };

            if take_left {
                writer.write(&self.left)?;
                left_reader.read_word(&mut self.left)?;
            } else {
                writer.write(&self.right)?;
                right_reader.read_word(&mut self.right)?;
            }
        }

        let written = writer.written();
        writer.finish()?;

        return Ok(written);
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use std::fs;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use super::FoldMerger;
    use crate::workspace::{Region, Workspace};

    #[fixture]
    fn workspace() -> Workspace {
        Workspace::new(None).unwrap()
    }

    fn add_batch(workspace: &Workspace, words: &[&str]) {
        let (_, path) = workspace.create_file(Region::SortedBatches).unwrap();
        let content: String = words.iter().map(|word| format!("{}\n", word)).collect();
        fs::write(path, content).unwrap();
    }

    #[rstest]
    #[case(vec![], "")]
    #[case(vec![vec!["a", "b"]], "a\nb\n")]
    #[case(vec![vec!["a", "c", "e"], vec!["b", "c", "d"], vec!["a", "f"]], "a\nb\nc\nd\ne\nf\n")]
    #[case(vec![vec!["same"], vec!["same"], vec!["same"]], "same\n")]
    #[case(vec![vec!["ab"], vec!["a", "abc"], vec![]], "a\nab\nabc\n")]
    fn test_merger(workspace: Workspace, #[case] batches: Vec<Vec<&str>>, #[case] expected: &str) {
        for batch in &batches {
            add_batch(&workspace, batch);
        }

        let result = FoldMerger::new(8, None).merge(&workspace).unwrap();
        assert_eq!(fs::read_to_string(result).unwrap(), expected);
    }

    #[rstest]
    fn test_merge_pair_ties(workspace: Workspace) {
        let (_, left) = workspace.create_file(Region::Root).unwrap();
        let (_, right) = workspace.create_file(Region::Root).unwrap();
        let (_, output) = workspace.create_file(Region::Root).unwrap();
        fs::write(&left, "a\nb\nd\n").unwrap();
        fs::write(&right, "a\nb\nc\nd\n").unwrap();

        let written = FoldMerger::new(4, Some(8)).merge_pair(&left, &right, &output).unwrap();

        assert_eq!(written, 4);
        assert_eq!(fs::read_to_string(output).unwrap(), "a\nb\nc\nd\n");
    }

    #[rstest]
    fn test_merger_random(workspace: Workspace) {
        let mut rng = StdRng::seed_from_u64(42);
        let mut expected = BTreeSet::new();

        for _ in 0..12 {
            let batch: BTreeSet<String> = (0..rng.gen_range(0..40))
                .map(|_| {
                    let len = rng.gen_range(1..=3);
                    (0..len).map(|_| rng.gen_range('a'..='e')).collect()
                })
                .collect();
            expected.extend(batch.iter().cloned());

            let batch: Vec<&str> = batch.iter().map(String::as_str).collect();
            add_batch(&workspace, &batch);
        }

        let result = FoldMerger::new(3, None).merge(&workspace).unwrap();
        let actual: Vec<String> = fs::read_to_string(result).unwrap().lines().map(String::from).collect();
        assert_eq!(actual, expected.into_iter().collect::<Vec<_>>());
    }
}
