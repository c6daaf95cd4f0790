use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Degenerate Distribution: sample weights do not sum to a positive finite value")]
    DegenerateDistribution,

    #[error("Frame Unavailable: {0}")]
    FrameUnavailable(String),

    #[error("Invalid Configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Model Update Failure: {0}")]
    ModelUpdateFailure(String),

    #[error("Invalid Image: {0}")]
    InvalidImage(String),

    #[error("Tracker has been terminated")]
    Terminated,

    #[error("Image Shape Error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}
