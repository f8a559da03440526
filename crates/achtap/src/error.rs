use thiserror::Error;

use crate::decode::DecodeError;
use crate::process::InjectStage;
use crate::resolve::ResolveError;

/// Process exit codes for fatal conditions.
pub mod exit_code {
    pub const GENERIC: i32 = 1;
    pub const LAUNCH_FAILED: i32 = 10;
    pub const INJECT_FAILED: i32 = 11;
    pub const RESUME_FAILED: i32 = 12;
    pub const STREAM_CORRUPTED: i32 = 20;
    pub const NO_DATA: i32 = 21;
    pub const DECODE_FAILED: i32 = 30;
    pub const INSUFFICIENT_SAMPLES: i32 = 31;
    pub const MAPPING_INCONCLUSIVE: i32 = 32;
    pub const UNSUPPORTED: i32 = 40;
    /// The target went away before sending the finish message.
    pub const UNEXPECTED_TERMINATION: i32 = 114514;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to launch {path}: {message}")]
    LaunchFailed { path: String, message: String },

    #[error("Module injection failed at stage {stage}: {message}")]
    InjectFailed { stage: InjectStage, message: String },

    #[error("Failed to resume main thread: {0}")]
    ResumeFailed(String),

    #[error("Failed to open channel {name}: {message}")]
    ChannelFailed { name: String, message: String },

    #[error("Stream corrupted: {0}")]
    StreamCorrupted(String),

    #[error("Target process exited before sending results")]
    UnexpectedTermination,

    #[error("Channel closed before the finish message")]
    PeerDisconnected,

    #[error("No achievement data received")]
    NoData,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Game executable not found: {0}")]
    GamePathNotFound(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Exit code the process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::LaunchFailed { .. } | Error::GamePathNotFound(_) => exit_code::LAUNCH_FAILED,
            Error::InjectFailed { .. } => exit_code::INJECT_FAILED,
            Error::ResumeFailed(_) => exit_code::RESUME_FAILED,
            Error::ChannelFailed { .. } | Error::StreamCorrupted(_) => exit_code::STREAM_CORRUPTED,
            Error::UnexpectedTermination | Error::PeerDisconnected => {
                exit_code::UNEXPECTED_TERMINATION
            }
            Error::NoData => exit_code::NO_DATA,
            Error::Decode(_) => exit_code::DECODE_FAILED,
            Error::Resolve(ResolveError::InsufficientSamples { .. }) => {
                exit_code::INSUFFICIENT_SAMPLES
            }
            Error::Resolve(ResolveError::Inconclusive { .. }) => exit_code::MAPPING_INCONCLUSIVE,
            Error::Unsupported(_) => exit_code::UNSUPPORTED,
            Error::Config(_) | Error::Io(_) | Error::Json(_) => exit_code::GENERIC,
        }
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolveStep;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_exit_codes_are_distinct_per_stage() {
        let inject = Error::InjectFailed {
            stage: InjectStage::Write,
            message: "denied".to_string(),
        };
        assert_eq!(inject.exit_code(), exit_code::INJECT_FAILED);
        assert_eq!(
            Error::UnexpectedTermination.exit_code(),
            exit_code::UNEXPECTED_TERMINATION
        );
        assert_eq!(
            Error::Resolve(ResolveError::InsufficientSamples { count: 3 }).exit_code(),
            exit_code::INSUFFICIENT_SAMPLES
        );
        assert_eq!(
            Error::Resolve(ResolveError::Inconclusive {
                step: ResolveStep::Identifier
            })
            .exit_code(),
            exit_code::MAPPING_INCONCLUSIVE
        );
    }

    #[test]
    fn test_inject_error_names_stage() {
        let err = Error::InjectFailed {
            stage: InjectStage::CreateRemoteThread,
            message: "access denied".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("CreateRemoteThread"), "{text}");
    }
}
