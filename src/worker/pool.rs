use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::debug;

use crate::job::{self, FrameRequest, FrameResponse};
use crate::raster::{Canvas, Line, PixelBuffer, BYTES_PER_PIXEL};
use crate::{BenchConfig, Error, Renderer, Result};

// A band of whole rows, drawn with every line of the frame
struct BandJob {
    slot: usize,
    first_row: u32,
    pixels: Vec<u8>,
    request: Arc<FrameRequest>,
    lines: Arc<Vec<Line>>,
    resp: Sender<(usize, Result<Vec<u8>>)>,
}

// Both rasterizers stay within one row of a line's endpoints, and a point
// at x == width lands on the next row, so a margin of two rows is enough.
fn touches_rows(line: &Line, first: i64, last: i64) -> bool {
    let lo = line.from.y.min(line.to.y) as i64 - 2;
    let hi = line.from.y.max(line.to.y) as i64 + 2;
    hi >= first && lo <= last
}

fn draw_band(job: &mut BandJob) -> Result<()> {
    let request = &job.request;
    let rows = (job.pixels.len() / (request.width as usize * BYTES_PER_PIXEL)) as i64;
    let first = job.first_row as i64;
    let last = first + rows - 1;

    let mut canvas = Canvas::band(&mut job.pixels, request.width, request.height, job.first_row)?
        .with_clipping(request.clipping);
    canvas.draw_lines(
        job.lines.iter().filter(|l| touches_rows(l, first, last)),
        request.color,
        request.line_mode(),
    );
    Ok(())
}

fn spawn_band_worker(n: usize) -> Result<(Sender<BandJob>, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel::<BandJob>();
    let handle = thread::Builder::new()
        .name(format!("linebench-band-{}", n))
        .spawn(move || {
            while let Ok(mut job) = rx.recv() {
                let res = draw_band(&mut job).map(|_| job.pixels);
                let _ = job.resp.send((job.slot, res));
            }
        })?;
    Ok((tx, handle))
}

/// Splits each frame across a fixed set of threads by rows.
///
/// The image is cut into horizontal bands, one per thread. Every thread
/// draws the whole line list in order but only writes inside its band, and
/// the bands are stitched back together. Each pixel receives the same
/// blends in the same order as on a single thread, so the output is
/// identical to [`job::render_frame`] for any color, alpha or line mode.
pub struct WorkerPool {
    config: BenchConfig,
    workers: Vec<(Sender<BandJob>, JoinHandle<()>)>,
}

impl WorkerPool {
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Renderer for WorkerPool {
    fn new(config: BenchConfig) -> Result<Self>
    where
        Self: Sized,
    {
        config.validate()?;
        let n = super::effective_workers(config.number_of_workers);
        let workers = (0..n).map(spawn_band_worker).collect::<Result<Vec<_>>>()?;
        debug!("worker pool started with {} threads", n);
        Ok(Self { config, workers })
    }

    fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn render(&mut self, request: &FrameRequest) -> Result<FrameResponse> {
        request.validate()?;
        let base = request.initial_buffer()?.into_vec();
        let lines = Arc::new(request.lines());
        let started = Instant::now();

        let rows_per_band = (request.height as usize).div_ceil(self.workers.len()).max(1);
        let band_len = rows_per_band * request.width as usize * BYTES_PER_PIXEL;
        let shared = Arc::new(FrameRequest {
            data: None,
            ..request.clone()
        });
        let (resp_tx, resp_rx) = mpsc::channel();

        let mut sent = 0;
        for (slot, (pixels, (tx, _))) in base.chunks(band_len).zip(&self.workers).enumerate() {
            tx.send(BandJob {
                slot,
                first_row: (slot * rows_per_band) as u32,
                pixels: pixels.to_vec(),
                request: Arc::clone(&shared),
                lines: Arc::clone(&lines),
                resp: resp_tx.clone(),
            })
            .map_err(|_| Error::WorkerError(format!("band worker {} has stopped", slot)))?;
            sent += 1;
        }
        drop(resp_tx);

        let mut bands: Vec<Option<Vec<u8>>> = vec![None; sent];
        for _ in 0..sent {
            let (slot, band) = resp_rx
                .recv()
                .map_err(|_| Error::WorkerError("band worker dropped a job".to_string()))?;
            bands[slot] = Some(band?);
        }
        let data: Vec<u8> = bands.into_iter().flatten().flatten().collect();
        debug!(
            "pool drew {} lines in {} bands in {:?}",
            lines.len(),
            sent,
            started.elapsed()
        );

        job::finish(PixelBuffer::from_vec(request.width, request.height, data)?, request)
    }

    fn close(self) -> Result<()> {
        let mut panicked = 0;
        for (tx, handle) in self.workers {
            drop(tx);
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(Error::WorkerError(format!("{} band workers panicked", panicked)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Viewport};

    fn config(workers: usize, anti_aliasing: bool) -> BenchConfig {
        BenchConfig {
            viewport: Viewport { width: 48, height: 32 },
            lines_to_draw: 90,
            number_of_workers: workers,
            anti_aliasing,
            seed: 3,
            ..Default::default()
        }
    }

    #[test]
    fn opaque_aliased_lines_match_single_threaded() {
        let mut pool = WorkerPool::new(config(4, false)).unwrap();
        assert_eq!(pool.size(), 4);
        let request = pool.config().frame_request();
        assert_eq!(pool.render(&request).unwrap(), job::render_frame(&request).unwrap());
        pool.close().unwrap();
    }

    #[test]
    fn anti_aliased_lines_match_single_threaded_for_any_worker_count() {
        for workers in [1, 2, 3, 8] {
            let mut pool = WorkerPool::new(config(workers, true)).unwrap();
            let request = pool.config().frame_request();
            assert_eq!(
                pool.render(&request).unwrap(),
                job::render_frame(&request).unwrap(),
                "{} workers",
                workers
            );
            pool.close().unwrap();
        }
    }

    #[test]
    fn translucent_lines_over_an_opaque_background_match_single_threaded() {
        let mut pool = WorkerPool::new(config(8, true)).unwrap();
        let mut request = FrameRequest::new(64, 64, 200);
        request.color = Color::rgba(255, 0, 0, 140);
        request.data = Some([255, 255, 255, 255].repeat(64 * 64));
        assert_eq!(pool.render(&request).unwrap(), job::render_frame(&request).unwrap());

        request.clipping = crate::Clipping::Strict;
        request.data = None;
        assert_eq!(pool.render(&request).unwrap(), job::render_frame(&request).unwrap());
        pool.close().unwrap();
    }

    #[test]
    fn more_workers_than_rows() {
        let mut pool = WorkerPool::new(config(8, true)).unwrap();
        let mut request = FrameRequest::new(40, 3, 30);
        request.seed = 5;
        assert_eq!(pool.render(&request).unwrap(), job::render_frame(&request).unwrap());
        pool.close().unwrap();
    }

    #[test]
    fn row_filter_keeps_lines_near_the_band() {
        let line = Line::new(0, 10, 5, 12);
        assert!(touches_rows(&line, 12, 20));
        assert!(touches_rows(&line, 14, 20));
        assert!(!touches_rows(&line, 15, 20));
        assert!(touches_rows(&line, 0, 8));
        assert!(!touches_rows(&line, 0, 7));
    }

    #[test]
    fn output_is_deterministic_across_runs() {
        let mut pool = WorkerPool::new(config(3, true)).unwrap();
        let a = pool.render_frame().unwrap();
        let b = pool.render_frame().unwrap();
        assert_eq!(a, b);
        pool.close().unwrap();
    }

    #[test]
    fn lines_are_drawn_over_the_starting_buffer() {
        let mut pool = WorkerPool::new(config(2, false)).unwrap();
        let mut request = FrameRequest::new(6, 4, 5);
        request.anti_aliasing = false;
        request.color = Color::rgb(0, 0, 255);
        request.data = Some([10, 20, 30, 255].repeat(24));
        let resp = pool.render(&request).unwrap();
        assert_eq!(resp, job::render_frame(&request).unwrap());
        match resp {
            FrameResponse::Pixels { data, .. } => {
                assert!(data.chunks(4).all(|px| px == [10, 20, 30, 255] || px == [0, 0, 255, 255]));
            }
            other => panic!("unexpected response {:?}", other),
        }
        pool.close().unwrap();
    }

    #[test]
    fn fewer_lines_than_workers() {
        let mut pool = WorkerPool::new(config(8, true)).unwrap();
        let mut request = pool.config().frame_request();
        request.lines_to_draw = 0;
        let resp = pool.render(&request).unwrap();
        match resp {
            FrameResponse::Pixels { data, .. } => assert!(data.iter().all(|&b| b == 0)),
            other => panic!("unexpected response {:?}", other),
        }
        pool.close().unwrap();
    }
}
