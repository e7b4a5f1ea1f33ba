//! CSV recorder for generation reports.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::schema::{GenerationReport, RunSummary};

pub const OEE_FILE: &str = "oee.csv";
pub const FITNESS_FILE: &str = "fitness.csv";
pub const SYSTEMATICS_FILE: &str = "systematics.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Errors raised while writing run output.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes the per-generation records of one run.
///
/// Usage:
/// ```ignore
/// let mut recorder = RunRecorder::create(&config.output.directory)?;
/// let summary = world.run_with_callback(|report| recorder.record(report))?;
/// recorder.finalize(&summary)?;
/// ```
pub struct RunRecorder {
    directory: PathBuf,
    oee: Writer<File>,
    fitness: Writer<File>,
    systematics: Writer<File>,
    stats: RecorderStats,
}

impl RunRecorder {
    /// Create the output directory if needed and open all CSV files.
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self, OutputError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| OutputError::Io {
            path: directory.clone(),
            source,
        })?;

        Ok(Self {
            oee: Writer::from_path(directory.join(OEE_FILE))?,
            fitness: Writer::from_path(directory.join(FITNESS_FILE))?,
            systematics: Writer::from_path(directory.join(SYSTEMATICS_FILE))?,
            directory,
            stats: RecorderStats::default(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write whatever parts of `report` are present.
    pub fn record(&mut self, report: &GenerationReport) -> Result<(), OutputError> {
        if let Some(oee) = &report.oee {
            self.oee.serialize(oee)?;
            self.stats.oee_rows += 1;
        }
        if let Some(fitness) = &report.fitness {
            self.fitness.serialize(fitness)?;
            self.stats.fitness_rows += 1;
        }
        if let Some(systematics) = &report.systematics {
            self.systematics.serialize(systematics)?;
            self.stats.systematics_rows += 1;
        }
        Ok(())
    }

    /// Flush the CSV files and write the run summary.
    pub fn finalize(mut self, summary: &RunSummary) -> Result<RecorderStats, OutputError> {
        self.oee.flush().map_err(|e| self.io_error(OEE_FILE, e))?;
        self.fitness
            .flush()
            .map_err(|e| self.io_error(FITNESS_FILE, e))?;
        self.systematics
            .flush()
            .map_err(|e| self.io_error(SYSTEMATICS_FILE, e))?;

        let path = self.directory.join(SUMMARY_FILE);
        let file = File::create(&path).map_err(|e| self.io_error(SUMMARY_FILE, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.flush().map_err(|e| self.io_error(SUMMARY_FILE, e))?;

        Ok(self.stats)
    }

    /// Rows written so far.
    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    fn io_error(&self, file: &str, source: io::Error) -> OutputError {
        OutputError::Io {
            path: self.directory.join(file),
            source,
        }
    }
}

/// Row counts from a recording session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub oee_rows: u64,
    pub fitness_rows: u64,
    pub systematics_rows: u64,
}

impl std::fmt::Display for RecorderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} OEE rows, {} fitness rows, {} systematics rows",
            self.oee_rows, self.fitness_rows, self.systematics_rows
        )
    }
}
