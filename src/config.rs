//! Process-level configuration for opening or rebuilding a tree.

use std::path::{Path, PathBuf};

/// Configuration for a tree instance: dataset dimensionality, file
/// locations, source delimiter and whether to rebuild from source instead
/// of reopening existing files.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub dimensions: usize,
    pub data_path: PathBuf,
    pub index_path: PathBuf,
    pub delimiter: char,
    pub rebuild: bool,
}

impl TreeConfig {
    pub fn new(
        dimensions: usize,
        data_path: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dimensions,
            data_path: data_path.into(),
            index_path: index_path.into(),
            delimiter: ',',
            rebuild: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}
