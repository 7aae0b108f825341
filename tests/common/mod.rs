#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up after each test case.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Five-row numeric fixture: feature2 is a perfect linear transform of
    /// feature1, feature3 is V-shaped.
    pub fn write_sample_csv(&self) -> PathBuf {
        self.write(
            "sample.csv",
            "feature1,feature2,feature3\n1,2,5\n2,4,3\n3,6,1\n4,8,3\n5,10,5\n",
        )
    }

    /// Imbalanced two-class fixture: six 'a' rows, two 'b' rows.
    pub fn write_classes_csv(&self) -> PathBuf {
        self.write(
            "classes.csv",
            "x,class\n1,a\n2,a\n3,a\n4,a\n5,a\n6,a\n10,b\n11,b\n",
        )
    }
}
