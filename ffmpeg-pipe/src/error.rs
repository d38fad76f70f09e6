use thiserror::Error;

/// Every failure the pipeline can report.
///
/// `SourceOpen`, `StreamSelection` and `DecoderInit` happen during startup,
/// before any thread exists. `Decode` and `Conversion` end the decode worker.
/// `Presentation` ends the whole player.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ffmpeg init: {0}")]
    Init(#[source] ffmpeg_next::Error),

    #[error("cannot open {path}: {source}")]
    SourceOpen {
        path: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("no decodable video stream in {path}")]
    StreamSelection { path: String },

    #[error("cannot configure {codec} decoder: {source}")]
    DecoderInit {
        codec: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("decode failed: {0}")]
    Decode(#[source] ffmpeg_next::Error),

    #[error("pixel conversion failed: {0}")]
    Conversion(#[source] ffmpeg_next::Error),

    #[error("presentation failed: {0}")]
    Presentation(String),

    #[error("spawn decode worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("decode worker panicked")]
    WorkerPanicked,
}

impl PipelineError {
    /// True for the errors that can only happen before the pipeline runs.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            PipelineError::Init(_)
                | PipelineError::SourceOpen { .. }
                | PipelineError::StreamSelection { .. }
                | PipelineError::DecoderInit { .. }
        )
    }
}
