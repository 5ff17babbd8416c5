use crate::graph_store::{NodeLabel, StoreError};
use crate::importer::ImportStage;
use thiserror::Error;

/// Fatal import errors. Anything per-record is counted instead of raised.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid input file {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("No properties to import; check the data directory")]
    EmptyProperties,

    #[error("Failed to declare uniqueness constraint for {label:?}: {source}")]
    Constraint {
        label: NodeLabel,
        #[source]
        source: StoreError,
    },

    #[error("Graph store error after {stage:?}: {source}")]
    Store {
        stage: ImportStage,
        #[source]
        source: StoreError,
    },
}

pub type ImportResult<T> = Result<T, ImportError>;
