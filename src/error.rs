use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error opening input file {path:?}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error writing output file {path:?}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed body list at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker {rank} is no longer reachable")]
    Disconnected { rank: usize },

    #[error("worker {rank} received an unexpected message while waiting for {expected}")]
    UnexpectedMessage { rank: usize, expected: &'static str },

    #[error("worker {rank} received bodies from worker {from} at offset {received}, expected {expected}")]
    OffsetMismatch {
        rank: usize,
        from: usize,
        expected: usize,
        received: usize,
    },

    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },

    #[error("worker {rank} received {received} bodies, expected {expected}")]
    BodyCountMismatch {
        rank: usize,
        expected: usize,
        received: usize,
    },
}
