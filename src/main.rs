use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use linebench::job::FrameResponse;
use linebench::worker::protocol;
use linebench::{BenchConfig, Color, InlineRenderer, OutputMode, Renderer, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Inline,
    Thread,
    Pool,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Pixel,
    Png,
}

/// Draw random lines and time how long each frame takes
#[derive(Debug, Parser)]
#[command(name = "linebench", version)]
struct Cli {
    /// Serve frames over stdin/stdout as a worker process
    #[arg(long, hide = true)]
    worker: bool,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Lines per frame
    #[arg(long, default_value_t = 5000)]
    lines: u32,

    /// Pool threads (0 = one per CPU)
    #[arg(long, default_value_t = 8)]
    workers: usize,

    #[arg(long, value_enum, default_value_t = Output::Pixel)]
    algorithm: Output,

    /// Draw aliased lines
    #[arg(long)]
    no_aa: bool,

    /// Line color as RRGGBB or RRGGBBAA
    #[arg(long, default_value = "ff0000", value_parser = parse_color)]
    color: Color,

    #[arg(long, value_enum, default_value_t = Backend::Pool)]
    backend: Backend,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Frames to render
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Write the last frame here (.png for PNG output, raw RGBA otherwise)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_color(s: &str) -> Result<Color, String> {
    let s = s.trim_start_matches('#');
    let bytes = hex::decode(s).map_err(|e| format!("invalid color {:?}: {}", s, e))?;
    match *bytes.as_slice() {
        [r, g, b] => Ok(Color::rgb(r, g, b)),
        [r, g, b, a] => Ok(Color::rgba(r, g, b, a)),
        _ => Err(format!("expected RRGGBB or RRGGBBAA, got {:?}", s)),
    }
}

fn worker_main() -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    protocol::serve(stdin.lock(), stdout.lock())?;
    Ok(())
}

fn run_frames<R: Renderer>(mut renderer: R, repeat: u32) -> anyhow::Result<(FrameResponse, Vec<Duration>)> {
    let mut times = Vec::with_capacity(repeat as usize);
    let mut last = None;
    for _ in 0..repeat.max(1) {
        let started = Instant::now();
        last = Some(renderer.render_frame()?);
        times.push(started.elapsed());
    }
    renderer.close()?;
    match last {
        Some(frame) => Ok((frame, times)),
        None => bail!("no frame rendered"),
    }
}

#[cfg(feature = "workers")]
fn render(cli: &Cli, config: BenchConfig) -> anyhow::Result<(FrameResponse, Vec<Duration>)> {
    use linebench::worker::{ProcessWorker, ThreadWorker, WorkerPool};
    match cli.backend {
        Backend::Inline => run_frames(InlineRenderer::new(config)?, cli.repeat),
        Backend::Thread => run_frames(ThreadWorker::new(config)?, cli.repeat),
        Backend::Pool => run_frames(WorkerPool::new(config)?, cli.repeat),
        Backend::Process => run_frames(ProcessWorker::new(config)?, cli.repeat),
    }
}

#[cfg(not(feature = "workers"))]
fn render(cli: &Cli, config: BenchConfig) -> anyhow::Result<(FrameResponse, Vec<Duration>)> {
    if cli.backend != Backend::Inline {
        bail!("{:?} backend needs the `workers` feature", cli.backend);
    }
    run_frames(InlineRenderer::new(config)?, cli.repeat)
}

fn write_frame(frame: &FrameResponse, path: &PathBuf) -> anyhow::Result<()> {
    let bytes = match frame {
        FrameResponse::Pixels { data, .. } => data.clone(),
        FrameResponse::Png { .. } => frame.png_bytes()?.unwrap_or_default(),
    };
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.worker {
        return worker_main().context("worker failed");
    }

    let config = BenchConfig {
        viewport: Viewport {
            width: cli.width,
            height: cli.height,
        },
        lines_to_draw: cli.lines,
        number_of_workers: cli.workers,
        algorithm: match cli.algorithm {
            Output::Pixel => OutputMode::Pixel,
            Output::Png => OutputMode::Png,
        },
        anti_aliasing: !cli.no_aa,
        color: cli.color,
        seed: cli.seed,
        ..Default::default()
    };

    let (frame, times) = render(&cli, config)?;
    for (i, t) in times.iter().enumerate() {
        println!("frame {}: {:.2}ms", i + 1, t.as_secs_f64() * 1000.0);
    }
    let total: Duration = times.iter().sum();
    println!(
        "{:?} backend, {} lines, {}x{}: mean {:.2}ms",
        cli.backend,
        cli.lines,
        cli.width,
        cli.height,
        total.as_secs_f64() * 1000.0 / times.len() as f64
    );
    println!("digest: {}", frame.digest());

    if let Some(path) = &cli.out {
        write_frame(&frame, path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
