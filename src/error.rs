//! Error types for sitefx

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning markup or wiring up page behaviors
#[derive(Error, Debug)]
pub enum Error {
    /// A player container carries no `data-player-src`
    #[error("Player container {0} has no media source")]
    MissingSource(String),

    /// A player container has no inner video element
    #[error("Player container {0} has no video element")]
    MissingMedia(String),

    /// The contact button carries no `data-email`
    #[error("Contact button {0} has no email address")]
    MissingEmail(String),

    /// Markup could not be interpreted
    #[error("Markup error: {0}")]
    Markup(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A platform primitive failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by the browser-side collaborators (media element,
/// streaming client, observers, clipboard).
///
/// The player controller never propagates these: play rejections and teardown
/// failures are logged and absorbed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// A play request was refused, e.g. by an autoplay policy
    #[error("play request rejected: {0}")]
    PlayRejected(String),

    /// Tearing down a resource failed (already destroyed, invalid state)
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// The clipboard refused a write
    #[error("clipboard write failed: {0}")]
    Clipboard(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_errors_convert_into_library_errors() {
        let err: Error = PlatformError::Teardown("already destroyed".into()).into();
        assert!(matches!(err, Error::Platform(PlatformError::Teardown(_))));
        assert_eq!(err.to_string(), "Platform error: teardown failed: already destroyed");
    }

    #[test]
    fn missing_markup_errors_name_the_container() {
        let err = Error::MissingSource("hero-video".into());
        assert!(err.to_string().contains("hero-video"));
    }
}
