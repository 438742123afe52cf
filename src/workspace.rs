//! Working storage of a single sorting run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log;

const LONG_WORDS_DIR: &str = "long";
const SORTED_BATCHES_DIR: &str = "sorted";

/// Region of the working tree a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Short-word stream and merge accumulators.
    Root,
    /// One file per long word.
    LongWords,
    /// One file per sorted batch.
    SortedBatches,
}

/// Uniquely named temporary directory holding all intermediate artifacts.
/// The whole tree is removed when the workspace is closed or dropped.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Creates a new working tree inside `tmp_path` or inside the default OS temporary directory.
    pub fn new(tmp_path: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("word-sort-");

        let dir = if let Some(tmp_path) = tmp_path {
            builder.tempdir_in(tmp_path)
        } else {
            builder.tempdir()
        }?;

        let workspace = Workspace { dir };
        fs::create_dir(workspace.region_path(Region::LongWords))?;
        fs::create_dir(workspace.region_path(Region::SortedBatches))?;

        log::info!("using {} as a temporary directory", workspace.path().display());

        return Ok(workspace);
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn region_path(&self, region: Region) -> PathBuf {
        match region {
            Region::Root => self.dir.path().to_path_buf(),
            Region::LongWords => self.dir.path().join(LONG_WORDS_DIR),
            Region::SortedBatches => self.dir.path().join(SORTED_BATCHES_DIR),
        }
    }

    /// Creates a new uniquely named empty file in the region.
    /// The file is kept on disk until its region or the whole workspace is removed.
    pub fn create_file(&self, region: Region) -> io::Result<(fs::File, PathBuf)> {
        let file = tempfile::Builder::new()
            .prefix(match region {
                Region::Root => "stage-",
                Region::LongWords => "long-",
                Region::SortedBatches => "batch-",
            })
            .tempfile_in(self.region_path(region))?;

        return Ok(file.keep()?);
    }

    /// Lists regular files of the region in directory order.
    pub fn files(&self, region: Region) -> io::Result<RegionFiles> {
        Ok(RegionFiles {
            entries: fs::read_dir(self.region_path(region))?,
        })
    }

    /// Removes the region with all of its files. Removing the root region is not allowed,
    /// use [`Workspace::close`] instead.
    pub fn remove(&self, region: Region) -> io::Result<()> {
        if region == Region::Root {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "the root region is removed with the workspace",
            ));
        }

        let path = self.region_path(region);
        log::debug!("removing {}", path.display());
        fs::remove_dir_all(path)
    }

    /// Removes the whole working tree.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Iterator over the regular files of a workspace region.
pub struct RegionFiles {
    entries: fs::ReadDir,
}

impl Iterator for RegionFiles {
    type Item = io::Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };

            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => return Some(Ok(entry.path())),
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Pair of files alternating between the source and the target of a stage step.
///
/// Every step reads the source snapshot and writes a complete new one into the target;
/// [`PingPong::swap`] then promotes the target. The source is never modified in place.
pub struct PingPong {
    paths: [PathBuf; 2],
    source: usize,
}

impl PingPong {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        PingPong {
            paths: [source, target],
            source: 0,
        }
    }

    /// The latest complete snapshot.
    pub fn source(&self) -> &Path {
        &self.paths[self.source]
    }

    /// The file the next snapshot is written into.
    pub fn target(&self) -> &Path {
        &self.paths[1 - self.source]
    }

    /// Promotes the target to be the latest snapshot.
    pub fn swap(&mut self) {
        self.source = 1 - self.source;
    }

    /// Consumes the pair returning the latest snapshot path.
    pub fn into_source(self) -> PathBuf {
        let [first, second] = self.paths;
        if self.source == 0 {
            first
        } else {
            second
        }
    }
}
