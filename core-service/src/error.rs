use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] core_pipeline::PipelineError),

    #[error("Player error: {0}")]
    Player(#[from] core_player::PlayerError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
