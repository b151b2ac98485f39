//! Newline-delimited JSON between a [`ProcessWorker`](super::ProcessWorker)
//! and a `linebench --worker` child.
//!
//! Each job line carries an id and a [`FrameRequest`]; the child answers
//! with one line echoing the id and holding either a [`FrameResponse`] or an
//! error message.

use std::io::{self, BufRead, Write};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::job::{self, FrameRequest, FrameResponse};

/// A frame sent to a worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub id: u64,
    pub request: FrameRequest,
}

/// A worker process' answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReply {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<FrameResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn ok(id: u64, response: FrameResponse) -> Self {
        Self {
            id,
            response: Some(response),
            error: None,
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            response: None,
            error: Some(error.into()),
        }
    }
}

/// Worker-side loop: read jobs until EOF, render each one, write one reply
/// per job. Malformed lines are answered with an error under id 0. Returns
/// the number of frames rendered.
pub fn serve<R: BufRead, W: Write>(reader: R, mut writer: W) -> io::Result<u64> {
    let mut served = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<WorkerJob>(&line) {
            Ok(job) => {
                debug!("worker job {}: {}x{}", job.id, job.request.width, job.request.height);
                served += 1;
                match job::render_frame(&job.request) {
                    Ok(response) => WorkerReply::ok(job.id, response),
                    Err(e) => WorkerReply::err(job.id, e.to_string()),
                }
            }
            Err(e) => {
                warn!("malformed worker job: {}", e);
                WorkerReply::err(0, format!("malformed job: {}", e))
            }
        };

        serde_json::to_writer(&mut writer, &reply)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::OutputMode;
    use std::io::Cursor;

    fn job_line(id: u64, request: FrameRequest) -> String {
        serde_json::to_string(&WorkerJob { id, request }).unwrap()
    }

    #[test]
    fn serves_one_reply_per_job() {
        let mut png = FrameRequest::new(8, 8, 3);
        png.algorithm = OutputMode::Png;
        let input = format!(
            "{}\n\n{}\n",
            job_line(1, FrameRequest::new(4, 4, 2)),
            job_line(2, png)
        );

        let mut out = Vec::new();
        let served = serve(Cursor::new(input), &mut out).unwrap();
        assert_eq!(served, 2);

        let replies: Vec<WorkerReply> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].id, 1);
        assert!(matches!(replies[0].response, Some(FrameResponse::Pixels { .. })));
        assert_eq!(replies[1].id, 2);
        assert!(matches!(replies[1].response, Some(FrameResponse::Png { .. })));
    }

    #[test]
    fn render_errors_are_reported() {
        let input = job_line(5, FrameRequest::new(0, 4, 1));
        let mut out = Vec::new();
        serve(Cursor::new(input), &mut out).unwrap();
        let reply: WorkerReply = serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();
        assert_eq!(reply.id, 5);
        assert!(reply.response.is_none());
        assert!(reply.error.unwrap().contains("Invalid dimensions"));
    }

    #[test]
    fn malformed_lines_get_an_error_reply() {
        let mut out = Vec::new();
        let served = serve(Cursor::new("{not json}\n"), &mut out).unwrap();
        assert_eq!(served, 0);
        let reply: WorkerReply = serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();
        assert_eq!(reply.id, 0);
        assert!(reply.error.is_some());
    }
}
