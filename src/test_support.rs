//! Fake collaborators shared by unit tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::archive::{ActiveApplication, CompressError, Compressor, EnvironmentProvider};
use crate::logging::{Severity, StructuredSink};

/// Sink that keeps every line it receives
#[derive(Default)]
pub(crate) struct RecordingSink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub(crate) fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl StructuredSink for RecordingSink {
    fn emit(&self, severity: Severity, line: &str) {
        self.lines.lock().unwrap().push((severity, line.to_string()));
    }
}

/// Writes `== <name> ==\n<content>` for each input file instead of a real archive
pub(crate) struct ListingCompressor;

impl Compressor for ListingCompressor {
    fn compress(&self, files: &[PathBuf], destination: &Path) -> Result<(), CompressError> {
        let mut listing = String::new();
        for file in files {
            let name = file.file_name().unwrap().to_string_lossy();
            let content = fs::read_to_string(file).unwrap();
            listing.push_str(&format!("== {} ==\n{}", name, content));
        }
        fs::write(destination, listing).unwrap();
        Ok(())
    }
}

/// Always exits with a failure status
pub(crate) struct FailingCompressor;

impl Compressor for FailingCompressor {
    fn compress(&self, _files: &[PathBuf], _destination: &Path) -> Result<(), CompressError> {
        Err(CompressError::Failed {
            program: "fake-zip".to_string(),
            code: 2,
            stderr: "simulated failure".to_string(),
        })
    }
}

/// Deterministic environment report
pub(crate) struct FakeEnvironment;

impl EnvironmentProvider for FakeEnvironment {
    fn snapshot(&self) -> String {
        "OS: TestOS 1.0\n".to_string()
    }

    fn active_applications(&self) -> Vec<ActiveApplication> {
        vec![ActiveApplication {
            name: "fake".to_string(),
            identifier: "com.example.fake".to_string(),
            pid: 4242,
        }]
    }
}
