//! SVG pipeline errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvgError {
    /// Input is not well-formed (namespaced) XML. Never recovered from.
    #[error("malformed SVG at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("root element is `{0}`, expected `svg`")]
    NotSvg(String),

    /// A width/height/viewBox token could not be read as a number.
    #[error("cannot read SVG dimensions: {0}")]
    Dimension(String),

    /// Internal invariant broken by the link compositor or serializer.
    #[error("internal consistency error: {0}")]
    Consistency(String),

    #[error("failed to write SVG: {0}")]
    Write(String),
}

impl SvgError {
    pub(crate) fn parse(position: u64, message: impl ToString) -> Self {
        Self::Parse {
            position,
            message: message.to_string(),
        }
    }
}
