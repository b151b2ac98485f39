//! Frame jobs: draw a set of random lines into a pixel buffer and hand the
//! result back either as raw pixels or as a PNG `data:` URL.
//!
//! [`FrameRequest`] and [`FrameResponse`] are the messages exchanged with
//! worker threads and worker processes, so they serialize with serde
//! (camelCase field names, pixel bytes as Base64).

use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encode::{PaletteOverflow, PngEncoder, DATA_URL_PREFIX};
use crate::raster::{Clipping, Color, Line, LineMode, PixelBuffer};
use crate::{Error, Result};

/// Lines drawn by [`render_with_seed`]
pub const SEEDED_LINE_COUNT: u32 = 64;

/// What a frame hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// The RGBA buffer itself
    #[default]
    Pixel,
    /// A PNG `data:` URL
    Png,
}

fn default_true() -> bool {
    true
}

fn default_overflow() -> PaletteOverflow {
    PaletteOverflow::Transparent
}

/// One frame to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    pub width: u32,
    pub height: u32,
    pub lines_to_draw: u32,
    #[serde(default)]
    pub algorithm: OutputMode,
    #[serde(default = "default_true")]
    pub anti_aliasing: bool,
    /// Seed for the line endpoints
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub clipping: Clipping,
    #[serde(default = "default_overflow")]
    pub palette_overflow: PaletteOverflow,
    /// Existing pixels to draw over. A transparent buffer is used when absent.
    #[serde(default, with = "wire::opt_bytes", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl FrameRequest {
    /// A request with the benchmark's defaults: anti-aliased opaque red
    /// lines, pixel output
    pub fn new(width: u32, height: u32, lines_to_draw: u32) -> Self {
        Self {
            width,
            height,
            lines_to_draw,
            algorithm: OutputMode::default(),
            anti_aliasing: true,
            seed: 0,
            color: Color::RED,
            clipping: Clipping::default(),
            palette_overflow: default_overflow(),
            data: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn line_mode(&self) -> LineMode {
        LineMode::from_anti_alias(self.anti_aliasing)
    }

    /// The frame's line set, in draw order
    pub fn lines(&self) -> Vec<Line> {
        LineGenerator::from_seed(self.seed).lines(self.width, self.height, self.lines_to_draw as usize)
    }

    /// The buffer lines are drawn onto: `data` if given, else transparent
    pub fn initial_buffer(&self) -> Result<PixelBuffer> {
        match &self.data {
            Some(data) => PixelBuffer::from_vec(self.width, self.height, data.clone()),
            None => PixelBuffer::new(self.width, self.height),
        }
    }
}

/// A rendered frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrameResponse {
    Pixels {
        width: u32,
        height: u32,
        #[serde(with = "wire::bytes")]
        data: Vec<u8>,
    },
    Png {
        /// `data:image/png;base64,...`
        png: String,
    },
}

impl FrameResponse {
    /// Decoded PNG file bytes for a `Png` response
    pub fn png_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self {
            FrameResponse::Pixels { .. } => Ok(None),
            FrameResponse::Png { png } => {
                let payload = png
                    .strip_prefix(DATA_URL_PREFIX)
                    .ok_or_else(|| Error::ProtocolError("not a PNG data URL".to_string()))?;
                wire::decode(payload).map(Some)
            }
        }
    }

    /// Hex SHA-256 of the payload (pixel bytes, or the data URL text)
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            FrameResponse::Pixels { data, .. } => hasher.update(data),
            FrameResponse::Png { png } => hasher.update(png.as_bytes()),
        }
        hex::encode(hasher.finalize())
    }
}

/// Deterministic endpoint stream (SplitMix64)
#[derive(Debug, Clone)]
pub struct LineGenerator {
    state: u64,
}

impl LineGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from arbitrary content via SHA-256
    pub fn from_seed_bytes(bytes: &[u8]) -> Self {
        Self::from_seed(seed_from_bytes(bytes))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `[0, bound)`
    pub fn below(&mut self, bound: u32) -> i32 {
        (((self.next_u64() >> 32) * bound as u64) >> 32) as i32
    }

    pub fn next_line(&mut self, width: u32, height: u32) -> Line {
        let x0 = self.below(width);
        let y0 = self.below(height);
        let x1 = self.below(width);
        let y1 = self.below(height);
        Line::new(x0, y0, x1, y1)
    }

    pub fn lines(&mut self, width: u32, height: u32, count: usize) -> Vec<Line> {
        (0..count).map(|_| self.next_line(width, height)).collect()
    }
}

/// First 8 bytes (little endian) of the SHA-256 of `bytes`
pub fn seed_from_bytes(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Draw `lines` in order onto `buffer` with the request's color and mode
pub fn draw_lines(buffer: &mut PixelBuffer, lines: &[Line], request: &FrameRequest) {
    buffer
        .canvas()
        .with_clipping(request.clipping)
        .draw_lines(lines, request.color, request.line_mode());
}

/// Turn a drawn buffer into the response the request asked for
pub fn finish(buffer: PixelBuffer, request: &FrameRequest) -> Result<FrameResponse> {
    match request.algorithm {
        OutputMode::Pixel => Ok(FrameResponse::Pixels {
            width: buffer.width(),
            height: buffer.height(),
            data: buffer.into_vec(),
        }),
        OutputMode::Png => {
            let started = Instant::now();
            let mut png = PngEncoder::from_rgba(
                buffer.width(),
                buffer.height(),
                buffer.as_bytes(),
                request.palette_overflow,
            )?;
            let url = png.data_url();
            info!("Creating PNG: {}ms", started.elapsed().as_millis());
            Ok(FrameResponse::Png { png: url })
        }
    }
}

/// Render one frame on the current thread
pub fn render_frame(request: &FrameRequest) -> Result<FrameResponse> {
    request.validate()?;
    let mut buffer = request.initial_buffer()?;
    let lines = request.lines();

    let started = Instant::now();
    draw_lines(&mut buffer, &lines, request);
    debug!(
        "drew {} lines into {}x{} (anti-aliasing: {}) in {:?}",
        lines.len(),
        request.width,
        request.height,
        request.anti_aliasing,
        started.elapsed()
    );

    finish(buffer, request)
}

/// Content-addressed frame: anti-aliased lines seeded from `seed`, encoded
/// as a PNG file. The same inputs always give the same bytes.
pub fn render_with_seed(width: u32, height: u32, seed: &[u8]) -> Result<Vec<u8>> {
    let mut request = FrameRequest::new(width, height, SEEDED_LINE_COUNT);
    request.seed = seed_from_bytes(seed);
    request.validate()?;

    let mut buffer = request.initial_buffer()?;
    draw_lines(&mut buffer, &request.lines(), &request);
    let mut png = PngEncoder::from_rgba(width, height, buffer.as_bytes(), request.palette_overflow)?;
    Ok(png.encode())
}

/// Base64 transport for pixel payloads
pub(crate) mod wire {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    use crate::{Error, Result};

    pub fn decode(text: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(text)
            .map_err(|e| Error::ProtocolError(format!("invalid base64 payload: {}", e)))
    }

    pub mod bytes {
        use super::STANDARD;
        use base64::Engine as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(data: &[u8], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&STANDARD.encode(data))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
            let text = String::deserialize(d)?;
            STANDARD.decode(text).map_err(serde::de::Error::custom)
        }
    }

    pub mod opt_bytes {
        use super::STANDARD;
        use base64::Engine as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
            match data {
                Some(data) => s.serialize_some(&STANDARD.encode(data)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(text) => STANDARD.decode(text).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_deterministic_and_in_range() {
        let a = LineGenerator::from_seed(7).lines(40, 30, 200);
        let b = LineGenerator::from_seed(7).lines(40, 30, 200);
        assert_eq!(a, b);
        for line in &a {
            for p in [line.from, line.to] {
                assert!((0..40).contains(&p.x));
                assert!((0..30).contains(&p.y));
            }
        }
        assert_ne!(a, LineGenerator::from_seed(8).lines(40, 30, 200));
    }

    #[test]
    fn seed_bytes_are_hashed() {
        assert_eq!(seed_from_bytes(b"page"), seed_from_bytes(b"page"));
        assert_ne!(seed_from_bytes(b"page"), seed_from_bytes(b"page2"));
    }

    #[test]
    fn request_wire_format_is_camel_case() {
        let mut req = FrameRequest::new(4, 2, 10);
        req.algorithm = OutputMode::Png;
        req.data = Some(vec![1, 2, 3]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["linesToDraw"], 10);
        assert_eq!(json["antiAliasing"], true);
        assert_eq!(json["algorithm"], "png");
        assert_eq!(json["data"], "AQID");

        let back: FrameRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn minimal_request_uses_defaults() {
        let req: FrameRequest =
            serde_json::from_str(r#"{"width":3,"height":3,"linesToDraw":1}"#).unwrap();
        assert_eq!(req.algorithm, OutputMode::Pixel);
        assert!(req.anti_aliasing);
        assert_eq!(req.color, Color::RED);
        assert_eq!(req.palette_overflow, PaletteOverflow::Transparent);
        assert!(req.data.is_none());
    }

    #[test]
    fn render_pixels() {
        let mut req = FrameRequest::new(16, 16, 20);
        req.anti_aliasing = false;
        match render_frame(&req).unwrap() {
            FrameResponse::Pixels { width, height, data } => {
                assert_eq!((width, height), (16, 16));
                assert_eq!(data.len(), 16 * 16 * 4);
                // aliased opaque red: every touched pixel is exactly red
                for px in data.chunks_exact(4) {
                    assert!(px == [0, 0, 0, 0] || px == [255, 0, 0, 255]);
                }
                assert!(data.chunks_exact(4).any(|px| px[3] == 255));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn render_png_data_url() {
        let mut req = FrameRequest::new(8, 8, 5);
        req.algorithm = OutputMode::Png;
        let resp = render_frame(&req).unwrap();
        let bytes = resp.png_bytes().unwrap().expect("png payload");
        assert_eq!(&bytes[..8], &crate::encode::SIGNATURE);
    }

    #[test]
    fn render_draws_over_supplied_pixels() {
        let mut req = FrameRequest::new(2, 2, 0);
        req.data = Some(vec![9; 16]);
        match render_frame(&req).unwrap() {
            FrameResponse::Pixels { data, .. } => assert_eq!(data, vec![9; 16]),
            other => panic!("unexpected response {:?}", other),
        }

        req.data = Some(vec![9; 15]);
        assert!(matches!(render_frame(&req), Err(Error::BufferSize { .. })));
    }

    #[test]
    fn invalid_dimensions_fail_fast() {
        let req = FrameRequest::new(0, 10, 5);
        assert!(matches!(render_frame(&req), Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn response_round_trips_through_json() {
        let resp = FrameResponse::Pixels {
            width: 1,
            height: 1,
            data: vec![255, 0, 0, 255],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""kind":"pixels""#));
        let back: FrameResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
        assert_eq!(back.digest(), resp.digest());
        assert_eq!(resp.digest().len(), 64);
    }

    #[test]
    fn seeded_render_is_stable() {
        let a = render_with_seed(32, 16, b"seed").unwrap();
        let b = render_with_seed(32, 16, b"seed").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, render_with_seed(32, 16, b"other").unwrap());
    }
}
