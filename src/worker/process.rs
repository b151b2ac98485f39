use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use log::{debug, warn};

use super::protocol::{WorkerJob, WorkerReply};
use crate::job::{FrameRequest, FrameResponse};
use crate::{BenchConfig, Error, Renderer, Result};

/// Renders frames in a `linebench --worker` child process.
///
/// Jobs go out on the child's stdin as JSON lines and replies come back on
/// its stdout, one per job, in order. The child is killed if the worker is
/// dropped without [`Renderer::close`].
pub struct ProcessWorker {
    config: BenchConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

fn worker_exe(config: &BenchConfig) -> Result<PathBuf> {
    match &config.worker_exe {
        Some(path) => Ok(path.clone()),
        None => Ok(std::env::current_exe()?),
    }
}

impl ProcessWorker {
    /// Id of the child process
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    fn send(&mut self, job: &WorkerJob) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::WorkerError("worker process is closed".to_string()))?;
        let line = serde_json::to_string(job)?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<WorkerReply> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(Error::WorkerError("worker process exited".to_string()));
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

impl Renderer for ProcessWorker {
    fn new(config: BenchConfig) -> Result<Self>
    where
        Self: Sized,
    {
        config.validate()?;
        let exe = worker_exe(&config)?;
        let mut child = Command::new(&exe)
            .arg("--worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        debug!("spawned worker process {} ({})", child.id(), exe.display());

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                let _ = child.kill();
                return Err(Error::WorkerError("worker process has no stdio".to_string()));
            }
        };

        Ok(Self {
            config,
            child: Some(child),
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            next_id: 1,
        })
    }

    fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn render(&mut self, request: &FrameRequest) -> Result<FrameResponse> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&WorkerJob {
            id,
            request: request.clone(),
        })?;

        let reply = self.receive()?;
        if reply.id != id {
            return Err(Error::ProtocolError(format!(
                "expected reply {}, got {}",
                id, reply.id
            )));
        }
        match (reply.response, reply.error) {
            (Some(response), None) => Ok(response),
            (_, Some(error)) => Err(Error::WorkerError(error)),
            (None, None) => Err(Error::ProtocolError(format!("reply {} is empty", id))),
        }
    }

    fn close(mut self) -> Result<()> {
        // EOF on stdin ends the worker loop
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(Error::WorkerError(format!("worker process exited with {}", status)));
            }
        }
        Ok(())
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to kill worker process: {}", e);
            }
            let _ = child.wait();
        }
    }
}
