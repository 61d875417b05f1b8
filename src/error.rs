use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("linear_update and dcfr are mutually exclusive discount modes")]
    ConflictingDiscountModes,

    #[error("params request {expected} but this solver is {actual}")]
    WrongSolverKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("non-final leaf at {state}: provide a value net or increase max_depth")]
    NonFinalLeaf { state: String },

    #[error("num_iters must be positive")]
    NoIterations,

    #[error("Invalid die face: {0}")]
    InvalidFace(String),

    #[error("Need exactly {need} dice, got {got}")]
    WrongDiceCount { need: usize, got: usize },

    #[error("Public hand index {index} out of range (max {max})")]
    PublicHandOutOfRange { index: usize, max: usize },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
