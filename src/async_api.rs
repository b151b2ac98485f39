use crate::job::{FrameRequest, FrameResponse};
use crate::worker::WorkerPool;
use crate::{BenchConfig, Error, Renderer, Result};
use futures::future::join_all;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Render(FrameRequest, oneshot::Sender<Result<FrameResponse>>),
    RenderFrame(oneshot::Sender<Result<FrameResponse>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly benchmark handle backed by a dedicated thread.
///
/// The thread owns a [`WorkerPool`] and runs frames sent from async tasks,
/// so callers can await renders without blocking the runtime. Clones share
/// the same pool; frames are rendered one at a time in arrival order.
#[derive(Clone)]
pub struct Bench {
    cmd_tx: Sender<Command>,
}

impl Bench {
    /// Start a bench (spawns a background thread that owns the pool).
    pub async fn new(config: Option<BenchConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name("linebench-bench".to_string())
            .spawn(move || {
                let mut pool = match WorkerPool::new(config) {
                    Ok(p) => p,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Render(request, resp) => {
                            let _ = resp.send(pool.render(&request));
                        }
                        Command::RenderFrame(resp) => {
                            let _ = resp.send(pool.render_frame());
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(pool.close());
                            return;
                        }
                    }
                }
                // every handle dropped without close
                let _ = pool.close();
            })?;

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Render an arbitrary frame
    pub async fn render(&self, request: FrameRequest) -> Result<FrameResponse> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Render(request, tx))
            .map_err(|_| Error::WorkerError("bench is closed".to_string()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Render canceled: {}", e)))?
    }

    /// Render the frame described by the bench's configuration
    pub async fn render_frame(&self) -> Result<FrameResponse> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::RenderFrame(tx))
            .map_err(|_| Error::WorkerError("bench is closed".to_string()))?;
        rx.await
            .map_err(|e| Error::Other(format!("RenderFrame canceled: {}", e)))?
    }

    /// Queue several frames at once; results come back in request order.
    pub async fn render_many(&self, requests: Vec<FrameRequest>) -> Vec<Result<FrameResponse>> {
        join_all(requests.into_iter().map(|r| self.render(r))).await
    }

    /// Shut the pool down. Other clones of this handle stop working.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::WorkerError("bench is closed".to_string()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;

    #[tokio::test]
    async fn renders_and_closes() {
        let bench = Bench::new(Some(BenchConfig {
            viewport: Viewport { width: 16, height: 16 },
            lines_to_draw: 10,
            number_of_workers: 2,
            ..Default::default()
        }))
        .await
        .unwrap();

        let a = bench.render_frame().await.unwrap();
        let b = bench.render_frame().await.unwrap();
        assert_eq!(a, b);
        bench.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_fails_init() {
        let res = Bench::new(Some(BenchConfig {
            viewport: Viewport { width: 0, height: 4 },
            ..Default::default()
        }))
        .await;
        assert!(matches!(res, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn clones_fail_after_close() {
        let bench = Bench::new(Some(BenchConfig {
            viewport: Viewport { width: 8, height: 8 },
            lines_to_draw: 1,
            number_of_workers: 1,
            ..Default::default()
        }))
        .await
        .unwrap();
        let other = bench.clone();
        bench.close().await.unwrap();
        assert!(other.render_frame().await.is_err());
    }
}
