use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::job::{self, FrameRequest, FrameResponse};
use crate::{BenchConfig, Error, Renderer, Result};

// Job sent to the frame worker thread
struct FrameJob {
    request: FrameRequest,
    resp: Sender<Result<FrameResponse>>,
}

// Spawn a worker that renders whole frames until its channel closes
fn spawn_frame_worker() -> Result<(Sender<FrameJob>, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel::<FrameJob>();
    let handle = thread::Builder::new()
        .name("linebench-frame".to_string())
        .spawn(move || {
            while let Ok(job) = rx.recv() {
                let res = job::render_frame(&job.request);
                let _ = job.resp.send(res);
            }
            debug!("frame worker exiting");
        })?;
    Ok((tx, handle))
}

/// Renders each frame on a dedicated background thread, like a page
/// handing its pixel buffer to a web worker and waiting for the answer.
pub struct ThreadWorker {
    config: BenchConfig,
    tx: Option<Sender<FrameJob>>,
    handle: Option<JoinHandle<()>>,
}

impl Renderer for ThreadWorker {
    fn new(config: BenchConfig) -> Result<Self>
    where
        Self: Sized,
    {
        config.validate()?;
        let (tx, handle) = spawn_frame_worker()?;
        Ok(Self {
            config,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn render(&mut self, request: &FrameRequest) -> Result<FrameResponse> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::WorkerError("frame worker is closed".to_string()))?;

        let (resp_tx, resp_rx) = mpsc::channel();
        tx.send(FrameJob {
            request: request.clone(),
            resp: resp_tx,
        })
        .map_err(|_| Error::WorkerError("frame worker has stopped".to_string()))?;

        resp_rx
            .recv()
            .map_err(|_| Error::WorkerError("frame worker dropped the job".to_string()))?
    }

    fn close(mut self) -> Result<()> {
        // closing the channel ends the worker loop
        drop(self.tx.take());
        if let Some(h) = self.handle.take() {
            h.join()
                .map_err(|_| Error::WorkerError("frame worker panicked".to_string()))?;
        }
        Ok(())
    }
}
