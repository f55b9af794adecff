use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::common::io_error_msg;

/// Pipeline stage that detected a failure. Printed as the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Plan,
    Read,
    Aggregate,
    Output,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Plan => "plan",
            Stage::Read => "read",
            Stage::Aggregate => "aggregate",
            Stage::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every failure the pipeline can report. All of them abort the run.
#[derive(Debug, Error)]
pub enum BrcError {
    /// The input could not be opened, sized, mapped or read.
    #[error("{stage}: {}: {}", .path.display(), io_error_msg(.source))]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line is not of the form `key;value`.
    #[error("aggregate: malformed line at byte {offset}: {line:?}")]
    Format { offset: u64, line: String },

    /// The value field is not a fixed-point number with one fractional digit.
    #[error("aggregate: invalid value at byte {offset}: {value:?}")]
    Parse { offset: u64, value: String },

    /// A computed byte range falls outside the file.
    #[error("read: byte range {start}..{end} is outside the file (size {file_size})")]
    Range { start: u64, end: u64, file_size: u64 },

    #[error("config: {0}")]
    Config(String),

    #[error("config: cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl BrcError {
    pub fn io(stage: Stage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BrcError::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            BrcError::Io { stage, .. } => *stage,
            BrcError::Format { .. } | BrcError::Parse { .. } => Stage::Aggregate,
            BrcError::Range { .. } => Stage::Read,
            BrcError::Config(_) | BrcError::ThreadPool(_) => Stage::Config,
        }
    }
}
