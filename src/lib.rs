//! linebench
//!
//! The drawing core of a line-rendering benchmark: random line sets are
//! rasterized into an RGBA buffer and, optionally, packed into an
//! indexed-color PNG that a browser can show straight from a `data:` URL.
//!
//! # Features
//!
//! - **Rasterizer**: aliased (Bresenham) and anti-aliased (Wu) lines over a
//!   shared straight-alpha blend primitive
//! - **PNG encoder**: palette PNGs built by hand, with stored DEFLATE blocks,
//!   CRC-32, Adler-32 and Base64 written from scratch
//! - **Render backends** (`workers` feature, default): a background thread, a
//!   thread pool splitting frames into row bands, a child process
//!   speaking JSON lines, and an async handle
//!
//! # Example
//!
//! ```
//! use linebench::{BenchConfig, OutputMode, Renderer, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BenchConfig {
//!     viewport: Viewport { width: 320, height: 200 },
//!     lines_to_draw: 500,
//!     algorithm: OutputMode::Png,
//!     ..Default::default()
//! };
//!
//! let mut renderer = linebench::new_renderer(config)?;
//! let frame = renderer.render_frame()?;
//! println!("frame digest: {}", frame.digest());
//! renderer.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

// Line rasterization (Bresenham, Wu, blend primitive)
pub mod raster;
pub use raster::{Canvas, Clipping, Color, Line, LineMode, PixelBuffer, Point};

// Indexed PNG encoding
pub mod encode;
pub use encode::{PaletteOverflow, PngEncoder};

// Frame messages and the single-threaded pipeline
pub mod job;
pub use job::{FrameRequest, FrameResponse, OutputMode};

// Worker protocol (always) and worker backends (`workers` feature)
pub mod worker;

// Async-friendly handle over a worker thread
#[cfg(feature = "workers")]
pub mod async_api;

#[cfg(feature = "workers")]
pub use async_api::Bench;

/// Configuration for a benchmark run
///
/// The defaults are the classic benchmark settings: 5000
/// anti-aliased opaque red lines on a 1280x720 surface, eight workers, raw
/// pixel output.
///
/// # Examples
///
/// ```
/// let cfg = linebench::BenchConfig::default();
/// assert_eq!(cfg.lines_to_draw, 5000);
/// assert!(cfg.anti_aliasing);
/// ```
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Surface dimensions
    pub viewport: Viewport,
    /// Lines per frame
    pub lines_to_draw: u32,
    /// Threads used by the pool backend (0 => one per CPU)
    pub number_of_workers: usize,
    /// Raw pixels or a PNG data URL
    pub algorithm: OutputMode,
    /// Wu lines instead of Bresenham
    pub anti_aliasing: bool,
    /// Line color
    pub color: Color,
    /// Bounds rule of the blend primitive
    pub clipping: Clipping,
    /// Behaviour once a PNG palette is full
    pub palette_overflow: PaletteOverflow,
    /// Seed for line endpoints
    pub seed: u64,
    /// Binary spawned by the process backend (defaults to the current exe)
    pub worker_exe: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            lines_to_draw: 5000,
            number_of_workers: 8,
            algorithm: OutputMode::Pixel,
            anti_aliasing: true,
            color: Color::RED,
            clipping: Clipping::Inclusive,
            palette_overflow: PaletteOverflow::Transparent,
            seed: 0,
            worker_exe: None,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }

    /// The frame this configuration describes
    pub fn frame_request(&self) -> FrameRequest {
        FrameRequest {
            width: self.viewport.width,
            height: self.viewport.height,
            lines_to_draw: self.lines_to_draw,
            algorithm: self.algorithm,
            anti_aliasing: self.anti_aliasing,
            seed: self.seed,
            color: self.color,
            clipping: self.clipping,
            palette_overflow: self.palette_overflow,
            data: None,
        }
    }
}

/// Surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Core trait for render backends
pub trait Renderer {
    /// Create a backend with the given configuration
    fn new(config: BenchConfig) -> Result<Self>
    where
        Self: Sized;

    /// The configuration the backend was created with
    fn config(&self) -> &BenchConfig;

    /// Render one frame
    fn render(&mut self, request: &FrameRequest) -> Result<FrameResponse>;

    /// Render the frame described by the configuration
    fn render_frame(&mut self) -> Result<FrameResponse> {
        let request = self.config().frame_request();
        self.render(&request)
    }

    /// Shut the backend down and release its workers
    fn close(self) -> Result<()>;
}

/// Renders on the caller's thread
#[derive(Debug, Clone)]
pub struct InlineRenderer {
    config: BenchConfig,
}

impl Renderer for InlineRenderer {
    fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn render(&mut self, request: &FrameRequest) -> Result<FrameResponse> {
        job::render_frame(request)
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Create a renderer with the default backend
///
/// This is the worker pool when the `workers` feature is enabled (default)
/// and the inline renderer otherwise.
#[cfg(feature = "workers")]
pub fn new_renderer(config: BenchConfig) -> Result<impl Renderer> {
    worker::WorkerPool::new(config)
}

#[cfg(not(feature = "workers"))]
pub fn new_renderer(config: BenchConfig) -> Result<impl Renderer> {
    InlineRenderer::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.number_of_workers, 8);
        assert_eq!(config.algorithm, OutputMode::Pixel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_viewport_rejected() {
        let config = BenchConfig {
            viewport: Viewport { width: 0, height: 10 },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
        assert!(InlineRenderer::new(config).is_err());
    }

    #[test]
    fn test_frame_request_from_config() {
        let config = BenchConfig {
            viewport: Viewport { width: 64, height: 32 },
            lines_to_draw: 12,
            anti_aliasing: false,
            seed: 99,
            ..Default::default()
        };
        let req = config.frame_request();
        assert_eq!((req.width, req.height, req.lines_to_draw), (64, 32, 12));
        assert!(!req.anti_aliasing);
        assert_eq!(req.seed, 99);
        assert!(req.data.is_none());
    }

    #[test]
    fn test_inline_renderer() {
        let config = BenchConfig {
            viewport: Viewport { width: 20, height: 10 },
            lines_to_draw: 30,
            ..Default::default()
        };
        let mut r = InlineRenderer::new(config).unwrap();
        let a = r.render_frame().unwrap();
        let b = r.render_frame().unwrap();
        assert_eq!(a, b);
        r.close().unwrap();
    }
}
