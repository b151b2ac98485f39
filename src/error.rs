//! Error types for rasterization, encoding and the render backends

use thiserror::Error;

/// Result type alias for linebench operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering or encoding a frame
#[derive(Error, Debug)]
pub enum Error {
    /// Width or height is zero
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A pixel buffer does not hold `width * height * 4` bytes
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// The PNG framing for this size does not fit a 32-bit chunk length
    #[error("Image too large to encode: {width}x{height}")]
    ImageTooLarge { width: u32, height: u32 },

    /// Palette depth outside 1..=256
    #[error("Invalid palette depth: {0}")]
    InvalidPaletteDepth(u16),

    /// Every palette slot is taken and a new color was registered
    #[error("Palette exhausted: all {depth} slots are in use")]
    PaletteExhausted { depth: u16 },

    /// A palette index at or beyond the palette depth
    #[error("Palette index {index} out of range for depth {depth}")]
    InvalidPaletteIndex { index: u8, depth: u16 },

    /// `set_pixel` outside the image
    #[error("Pixel ({x}, {y}) outside {width}x{height} image")]
    PixelOutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    /// A background worker failed or went away
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// Malformed message between a renderer and its worker
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ProtocolError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::WorkerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = Error::InvalidDimensions { width: 0, height: 4 };
        assert_eq!(e.to_string(), "Invalid dimensions: 0x4");
        let e = Error::PaletteExhausted { depth: 256 };
        assert!(e.to_string().contains("256"));
    }

    #[test]
    fn json_errors_become_protocol_errors() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(Error::from(err), Error::ProtocolError(_)));
    }
}
