//! `mol3d` command-line tool: inspect structure files and run headless
//! playback against the recording viewer.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mol3d::{
    atom_sites, auto_labels, split_xyz_frames, FileFormat, LabelText,
    LoopMode, Mol3dViewer, Options, PlaybackStrategy, RecordingFactory,
    UploadedFile,
};
use serde_json::json;
use web_time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "mol3d", about = "Molecular viewer widget tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the atom labels a structure file would get, as JSON.
    Labels {
        /// Structure file (.xyz, .pdb, .sdf, .mol).
        path: PathBuf,
        /// Override the format detected from the extension.
        #[arg(long)]
        format: Option<FileFormat>,
        /// Label text: index, element or element_index.
        #[arg(long, default_value = "index")]
        text: String,
    },
    /// Count the frames of an XYZ trajectory, optionally writing each one
    /// to its own file.
    Frames {
        /// Concatenated multi-frame XYZ file.
        path: PathBuf,
        /// Directory receiving frame_NNNN.xyz files.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Play a trajectory against an in-memory viewer and print the frames
    /// shown.
    Play {
        /// Concatenated multi-frame XYZ file.
        path: PathBuf,
        /// Number of timer expiries to simulate.
        #[arg(long, default_value_t = 10)]
        steps: usize,
        /// Options preset (TOML).
        #[arg(long)]
        options: Option<PathBuf>,
        /// Interval between frames in milliseconds.
        #[arg(long)]
        speed: Option<u32>,
        /// Loop mode: forward, backward or pingpong.
        #[arg(long)]
        mode: Option<String>,
        /// Let the viewer run its own loop instead of the host timer.
        #[arg(long)]
        native: bool,
        /// Also print every recorded viewer call.
        #[arg(long)]
        calls: bool,
    },
    /// Print the JSON schema of the widget options.
    Schema,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();

    match Cli::parse().command {
        Command::Labels { path, format, text } => {
            labels(&path, format, &text)
        }
        Command::Frames { path, out_dir } => frames(&path, out_dir.as_deref()),
        Command::Play {
            path,
            steps,
            options,
            speed,
            mode,
            native,
            calls,
        } => {
            let mut opts = match options {
                Some(preset) => Options::load(&preset)
                    .with_context(|| format!("loading {}", preset.display()))?,
                None => Options::default(),
            };
            if let Some(speed) = speed {
                opts.animation.speed_ms = speed;
            }
            if let Some(mode) = mode {
                opts.animation.loop_mode = LoopMode::from_name(&mode)
                    .with_context(|| format!("unknown loop mode '{mode}'"))?;
            }
            if native {
                opts.animation.strategy = PlaybackStrategy::Native;
            }
            play(&path, steps, opts, calls)
        }
        Command::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&Options::json_schema())?
            );
            Ok(())
        }
    }
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(UploadedFile::from_bytes(name, &bytes))
}

fn labels(path: &Path, format: Option<FileFormat>, text: &str) -> Result<()> {
    let file = read_upload(path)?;
    let format = format.unwrap_or(file.format);
    let text: LabelText = serde_json::from_value(json!(text))
        .with_context(|| format!("unknown label text '{text}'"))?;
    let style = Options::default().labels.style;
    let labels: Vec<_> =
        auto_labels(atom_sites(&file.content, &format), text, &style)
            .map(|label| json!({"text": label.text, "position": label.position}))
            .collect();
    log::info!("{} labels from {}", labels.len(), path.display());
    println!("{}", serde_json::to_string_pretty(&labels)?);
    Ok(())
}

fn frames(path: &Path, out_dir: Option<&Path>) -> Result<()> {
    let file = read_upload(path)?;
    if file.format != FileFormat::Xyz {
        bail!("{} is not an XYZ trajectory", path.display());
    }
    let frames = split_xyz_frames(&file.content);
    println!("{} frame(s)", frames.len());
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        for (i, frame) in frames.iter().enumerate() {
            let target = dir.join(format!("frame_{i:04}.xyz"));
            std::fs::write(&target, format!("{frame}\n"))
                .with_context(|| format!("writing {}", target.display()))?;
        }
    }
    Ok(())
}

fn play(path: &Path, steps: usize, options: Options, calls: bool) -> Result<()> {
    let file = read_upload(path)?;
    let factory = RecordingFactory::default();
    let speed = Duration::from_millis(u64::from(options.animation.speed_ms));
    let mut widget = Mol3dViewer::builder(factory.clone())
        .with_options(options)
        .with_structure(file.content, file.format)
        .build()?;
    let _ = widget.initialize()?.start_animation();
    if !widget.is_playing() {
        bail!("{} has a single frame, nothing to play", path.display());
    }

    let start = Instant::now();
    let mut shown = Vec::with_capacity(steps);
    for step in 1..=steps {
        let now = start + speed * u32::try_from(step)?;
        if factory.is_animating() {
            // Stand in for the viewer's own loop moving on.
            factory.set_viewer_frame(step % widget.total_frames());
        }
        shown.push(widget.tick(now).current_frame());
    }
    let _ = widget.stop_animation();

    println!("{}", serde_json::to_string(&shown)?);
    if calls {
        println!("{}", serde_json::to_string_pretty(&factory.calls())?);
    }
    Ok(())
}
