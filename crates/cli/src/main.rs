use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use playback::{active_clip, active_visual_clip};
use timeline::{Timeline, MIN_CLIP_DURATION};

/// Inspection tool for serialized timeline documents.
#[derive(Parser)]
#[command(name = "compose-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print tracks and clips of a timeline document.
    Inspect { file: PathBuf },
    /// Check clip invariants and report violations.
    Validate { file: PathBuf },
    /// Show the active clip per track at a given time.
    Active {
        file: PathBuf,
        #[arg(long)]
        time: f64,
    },
}

fn load(path: &PathBuf) -> Result<Timeline> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn inspect(tl: &Timeline) {
    println!(
        "{} tracks, {} clips, {:.3}s total",
        tl.tracks().len(),
        tl.clip_count(),
        tl.total_duration()
    );
    for (idx, track) in tl.tracks().iter().enumerate() {
        println!(
            "[{idx}] {:?} \"{}\" muted={} volume={:.2}",
            track.kind, track.name, track.muted, track.volume
        );
        for clip in tl.clips_on_track(track.id) {
            println!(
                "    {} [{:.3}s..{:.3}s) in={:.3}s src={}",
                clip.id,
                clip.start_time,
                clip.end_time(),
                clip.in_point,
                clip.source_asset_id
            );
        }
    }
}

fn validate(tl: &Timeline) -> Vec<String> {
    let mut problems = Vec::new();
    for clip in tl.clips() {
        if clip.duration < MIN_CLIP_DURATION {
            problems.push(format!(
                "clip {} duration {:.3}s is below the {MIN_CLIP_DURATION}s minimum",
                clip.id, clip.duration
            ));
        }
        if clip.in_point < 0.0 || clip.start_time < 0.0 {
            problems.push(format!("clip {} has a negative time field", clip.id));
        }
        if let Some(sd) = clip.source_duration {
            if clip.out_point() > sd + 1e-9 {
                problems.push(format!(
                    "clip {} reads past its source ({:.3}s > {:.3}s)",
                    clip.id,
                    clip.out_point(),
                    sd
                ));
            }
        }
        if tl.track(clip.track_id).is_none() {
            problems.push(format!("clip {} references missing track {}", clip.id, clip.track_id));
        }
    }
    for track in tl.tracks() {
        let clips = tl.clips_on_track(track.id);
        for pair in clips.windows(2) {
            if pair[0].end_time() > pair[1].start_time + 1e-9 {
                problems.push(format!(
                    "clips {} and {} overlap on track \"{}\"",
                    pair[0].id, pair[1].id, track.name
                ));
            }
        }
    }
    problems
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { file } => {
            let tl = load(&file)?;
            inspect(&tl);
        }
        Command::Validate { file } => {
            let tl = load(&file)?;
            let problems = validate(&tl);
            if problems.is_empty() {
                println!("ok: {} clips on {} tracks", tl.clip_count(), tl.tracks().len());
            } else {
                for p in &problems {
                    eprintln!("{p}");
                }
                anyhow::bail!("{} invariant violation(s)", problems.len());
            }
        }
        Command::Active { file, time } => {
            let tl = load(&file)?;
            for track in tl.tracks() {
                match active_clip(&tl, track.id, time) {
                    Some(clip) => println!(
                        "{:?} \"{}\": {} [{:.3}s..{:.3}s)",
                        track.kind, track.name, clip.id, clip.start_time, clip.end_time()
                    ),
                    None => println!("{:?} \"{}\": -", track.kind, track.name),
                }
            }
            match active_visual_clip(&tl, time) {
                Some(clip) => println!("visual: {}", clip.id),
                None => println!("visual: -"),
            }
        }
    }
    Ok(())
}
