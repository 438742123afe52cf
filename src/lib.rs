//! `ext-word-sort` sorts and deduplicates the words of a text file that does not fit into memory.
//!
//! Words are whitespace separated sequences of Unicode code points and are ordered by code point values,
//! so the result does not depend on any locale. Memory consumption is bounded by the batch size times
//! the word length no matter how large the input is: all intermediate state is kept in a temporary
//! directory on disk.
//!
//! # Overview
//!
//! Sorting is done in four passes:
//!
//! * **Partitioning:**
//!   the input is scanned once and split into a stream of short words and a file per long word,
//!   a word is long if it has more code points than the word length.
//! * **Batch sorting:**
//!   short words are loaded batch by batch into a preallocated buffer, every batch is sorted,
//!   deduplicated and saved to its own file.
//! * **Merging:**
//!   batch files are folded one by one into a sorted accumulator, dropping the words repeated across batches.
//! * **Long word reinsertion:**
//!   long words are inserted into the accumulator at their position without ever being loaded into memory.
//!
//! # Example
//!
//! ```no_run
//! use std::path;
//!
//! use ext_word_sort::{WordSorter, WordSorterBuilder};
//!
//! fn main() {
//!     let sorter: WordSorter = WordSorterBuilder::new()
//!         .with_tmp_dir(path::Path::new("./"))
//!         .with_word_length(50)
//!         .with_batch_size(2000)
//!         .build()
//!         .unwrap();
//!
//!     let stats = sorter
//!         .sort_file(path::Path::new("input.txt"), path::Path::new("output.txt"))
//!         .unwrap();
//!     println!("{} batches sorted", stats.batches);
//! }
//! ```

pub mod buffer;
pub mod chars;
pub mod chunk;
pub mod ingest;
pub mod merger;
pub mod reinsert;
pub mod sort;
pub mod word;
pub mod workspace;

pub use buffer::{WordBatch, WordBatchBuilder};
pub use merger::FoldMerger;
pub use reinsert::{LongWordInserter, Placement};
pub use sort::{SortError, SortStats, WordSorter, WordSorterBuilder};
pub use word::{Word, WordOverflow};
