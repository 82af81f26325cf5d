// Backing storage for the visit collection

use crate::csv;
use crate::record::Visit;
use std::io;
use std::path::{Path, PathBuf};

/// Whole-collection load/save
pub trait Repository {
    fn load(&self) -> io::Result<Vec<Visit>>;

    /// Replace the stored collection with `visits`, in order
    fn save(&self, visits: &[Visit]) -> io::Result<()>;

    fn exists(&self) -> bool;

    /// Where the data lives, for diagnostics
    fn location(&self) -> &Path;
}

/// Visits stored in a comma-delimited text file
#[derive(Debug, Clone)]
pub struct CsvRepository {
    path: PathBuf,
}

impl CsvRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Repository for CsvRepository {
    fn load(&self) -> io::Result<Vec<Visit>> {
        csv::read_csv(&self.path)
    }

    fn save(&self, visits: &[Visit]) -> io::Result<()> {
        csv::write_csv(&self.path, visits)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
