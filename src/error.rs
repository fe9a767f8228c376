//! Error types for encoding, rendering, scanning and link opening.

use thiserror::Error;

/// Failure to turn content into a module matrix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("found empty contents")]
    EmptyContent,

    #[error("requested size must be between 1 and {max}, got {size}")]
    InvalidSize { size: u32, max: u32 },

    #[error("character {0:?} cannot be represented in the requested character set")]
    UnsupportedCharacter(char),

    #[error("data too long for a QR code at this error correction level")]
    DataTooLong,

    /// The encoded symbol plus margin does not fit in the requested size.
    #[error("a {required}px square is needed to hold the symbol, only {requested}px requested")]
    SizeTooSmall { required: u32, requested: u32 },

    #[error("encoder returned a {actual_width}x{actual_height} matrix for a {size}px request")]
    MatrixTooSmall {
        size: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("encoder failure: {0}")]
    Encoder(String),
}

impl From<qrcode::types::QrError> for EncodeError {
    fn from(err: qrcode::types::QrError) -> Self {
        match err {
            qrcode::types::QrError::DataTooLong => EncodeError::DataTooLong,
            other => EncodeError::Encoder(other.to_string()),
        }
    }
}

/// Failure while compositing a logo onto a rendered code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OverlayError {
    #[error("no source bitmap to draw the logo on")]
    MissingSource,

    #[error("source bitmap is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("logo ratio must be a finite, non-negative number, got {0}")]
    InvalidRatio(f32),

    #[error("failed to draw logo: {0}")]
    Draw(String),
}

/// Failure of a full render call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

/// Failure of a scan that is neither a decode nor a cancellation.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    AlreadyInFlight,

    #[error("scan was interrupted before producing a result")]
    Interrupted,

    #[error("failed to read scan source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode scan source as an image: {0}")]
    Image(#[from] image::ImageError),

    #[error("found a QR code but could not decode it: {0}")]
    Decode(String),
}

/// Failure to hand a link to the platform.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("invalid link {input:?}: {source}")]
    InvalidUri {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no application could open {uri}: {source}")]
    Launch {
        uri: String,
        #[source]
        source: std::io::Error,
    },
}
