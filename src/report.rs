//! HTML issue report with source previews.

pub mod html;
pub mod preview;

mod css;

use std::io;

/// Errors while rendering the report or its previews.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("issue with unspecified component")]
    UnspecifiedComponent,

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("issue with unspecified project")]
    UnspecifiedProject,

    #[error("unknown project '{0}'")]
    UnknownProject(String),

    #[error("cannot decode '{path}' as {encoding}")]
    Decode {
        path: String,
        encoding: &'static str,
    },

    /// The analysis range points outside the file's actual text. The
    /// sources on disk no longer match what the server analyzed.
    #[error("cannot create preview, synchronize analysis data with the sources")]
    OutOfSync,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, RenderError>;
