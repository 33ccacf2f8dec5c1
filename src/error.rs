use serde::Serialize;
use thiserror::Error;

use crate::selection::Operation;

/// Everything that can abort an iteration, plus corpus loading failures.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{op}: expected status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        op: Operation,
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("{op}: response has no `{field}`: {body}")]
    MissingField {
        op: Operation,
        field: &'static str,
        body: String,
    },

    #[error("read {id}: expected data {expected:?}, got {actual:?}")]
    DataMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("search {id}: term {term:?} in {text:?}: expected found={expected}, got found={actual}")]
    SearchMismatch {
        id: String,
        term: String,
        text: String,
        expected: bool,
        actual: bool,
    },

    #[error("{op}: request failed: {source}")]
    Transport {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read corpus {path}: {source}")]
    Corpus {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus {path}: {source}")]
    CorpusFormat {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("corpus {0} has no usable records")]
    EmptyCorpus(String),
}

/// Coarse grouping of iteration failures used in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transport,
    Status,
    Payload,
    Semantic,
    Setup,
}

impl DriverError {
    pub fn class(&self) -> FailureClass {
        match self {
            DriverError::Transport { .. } => FailureClass::Transport,
            DriverError::UnexpectedStatus { .. } => FailureClass::Status,
            DriverError::MissingField { .. } => FailureClass::Payload,
            DriverError::DataMismatch { .. } | DriverError::SearchMismatch { .. } => {
                FailureClass::Semantic
            }
            DriverError::Corpus { .. }
            | DriverError::CorpusFormat { .. }
            | DriverError::EmptyCorpus(_) => FailureClass::Setup,
        }
    }
}
