//! # lottie-probe
//!
//! Loads a Lottie document and prints what the engine resolves for it.
//!
//! ## Commands
//! - `inspect`: Timeline, layer tree and bound shape items
//! - `sample`: Layer matrices, opacity and painted path lengths at chosen progress values

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Mat3;
use kurbo::ParamCurveArclen;
use lottie_core::{EngineConfig, LottieAsset, LottiePlayer, Paint, ResolvedFrame, ShapeNode};
use lottie_data::model::LottieJson;
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "lottie-probe")]
#[command(about = "Inspect keyframe evaluation of Lottie documents")]
#[command(version)]
struct Cli {
    /// Engine config overrides (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the timeline and the bound layer tree
    Inspect {
        /// Path to the Lottie document
        file: PathBuf,
    },

    /// Resolve the document at one or more progress values
    Sample {
        /// Path to the Lottie document
        file: PathBuf,

        /// Progress values in [0,1], comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "0,0.5,1")]
        progress: Vec<f32>,

        /// Sample at composition frames instead of progress
        #[arg(short, long, value_delimiter = ',', conflicts_with = "progress")]
        frames: Option<Vec<f32>>,

        /// Only report this layer
        #[arg(short, long)]
        layer: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lottie_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&load_asset(&file, config)?),
        Commands::Sample {
            file,
            progress,
            frames,
            layer,
            json,
        } => {
            let asset = Arc::new(load_asset(&file, config)?);
            let progress = match frames {
                Some(frames) => frames
                    .iter()
                    .map(|f| asset.timeline.progress_for_frame(*f))
                    .collect(),
                None => progress,
            };
            cmd_sample(asset, &progress, layer.as_deref(), json)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_json_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn load_asset(path: &Path, config: EngineConfig) -> Result<LottieAsset> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let model: LottieJson =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let asset = LottieAsset::with_config(&model, config)
        .with_context(|| format!("binding {}", path.display()))?;
    info!(layers = asset.layers.len(), "loaded {}", path.display());
    Ok(asset)
}

fn cmd_inspect(asset: &LottieAsset) -> Result<()> {
    let tl = &asset.timeline;
    println!(
        "Composition {}x{}  frames {}..{} @ {} fps ({:.2}s)",
        asset.width,
        asset.height,
        tl.start_frame(),
        tl.end_frame(),
        tl.frame_rate(),
        tl.duration_secs()
    );
    println!("==========================================");
    for (pos, layer) in asset.layers.iter().enumerate() {
        let parent = layer
            .parent
            .map(|p| format!(" -> parent #{p}"))
            .unwrap_or_default();
        println!(
            "#{pos} {} [{}..{}]{}{}",
            layer.name.as_deref().unwrap_or("unnamed"),
            layer.span.in_frame,
            layer.span.out_frame,
            parent,
            if layer.hidden { " (hidden)" } else { "" }
        );
        print_shapes(&layer.contents, 1);
    }
    Ok(())
}

fn print_shapes(items: &[ShapeNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        let kind = match item {
            ShapeNode::Group { .. } => "group",
            ShapeNode::Path { shape, .. } => {
                if shape.is_constant() {
                    "path"
                } else {
                    "path (morphing)"
                }
            }
            ShapeNode::Fill { .. } => "fill",
            ShapeNode::Stroke { .. } => "stroke",
            ShapeNode::GradientFill { .. } => "gradient fill",
            ShapeNode::Trim(_) => "trim",
            ShapeNode::Repeater(_) => "repeater",
        };
        match item.name() {
            Some(name) => println!("{indent}• {kind} \"{name}\""),
            None => println!("{indent}• {kind}"),
        }
        if let ShapeNode::Group { items, .. } = item {
            print_shapes(items, depth + 1);
        }
    }
}

fn cmd_sample(
    asset: Arc<LottieAsset>,
    progress: &[f32],
    layer: Option<&str>,
    as_json: bool,
) -> Result<()> {
    if let Some(name) = layer {
        if asset.layer(name).is_none() {
            bail!("no layer named {name:?}");
        }
    }
    let accuracy = asset.config.arclen_accuracy;
    let mut player = LottiePlayer::new(asset);
    let mut samples = Vec::with_capacity(progress.len());

    for &p in progress {
        let frame = player.render_frame(p);
        if as_json {
            samples.push(frame_json(&frame, layer, accuracy));
        } else {
            print_frame(&frame, layer, accuracy);
        }
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
    }
    Ok(())
}

fn path_length(path: &kurbo::BezPath, accuracy: f64) -> f64 {
    path.segments().map(|seg| seg.arclen(accuracy)).sum()
}

fn paint_label(paint: &Paint) -> String {
    match paint {
        Paint::Fill { color } => format!("fill #{:08X}", color.argb()),
        Paint::Stroke { color, width } => format!("stroke #{:08X} w{width}", color.argb()),
        Paint::Gradient { linear, colors, .. } => format!(
            "{} gradient ({} stops)",
            if *linear { "linear" } else { "radial" },
            colors.len()
        ),
    }
}

fn matrix_cols(m: &Mat3) -> [f32; 6] {
    [m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, m.z_axis.x, m.z_axis.y]
}

fn print_frame(frame: &ResolvedFrame, only: Option<&str>, accuracy: f64) {
    println!("progress {:.4} (frame {:.2})", frame.progress, frame.frame);
    for layer in &frame.layers {
        if only.is_some_and(|name| layer.name.as_deref() != Some(name)) {
            continue;
        }
        let [a, b, c, d, tx, ty] = matrix_cols(&layer.matrix);
        println!(
            "  {} {} opacity {:.3} matrix [{a:.3} {b:.3} {c:.3} {d:.3} {tx:.2} {ty:.2}]",
            layer.name.as_deref().unwrap_or("unnamed"),
            if layer.visible { "visible" } else { "hidden" },
            layer.opacity
        );
        for shape in &layer.shapes {
            println!(
                "    {} opacity {:.3} length {:.2}",
                paint_label(&shape.paint),
                shape.opacity,
                path_length(&shape.path, accuracy)
            );
        }
    }
}

fn frame_json(frame: &ResolvedFrame, only: Option<&str>, accuracy: f64) -> serde_json::Value {
    let layers: Vec<serde_json::Value> = frame
        .layers
        .iter()
        .filter(|layer| only.map_or(true, |name| layer.name.as_deref() == Some(name)))
        .map(|layer| {
            let shapes: Vec<serde_json::Value> = layer
                .shapes
                .iter()
                .map(|shape| {
                    json!({
                        "paint": paint_label(&shape.paint),
                        "opacity": shape.opacity,
                        "matrix": matrix_cols(&shape.matrix),
                        "length": path_length(&shape.path, accuracy),
                    })
                })
                .collect();
            json!({
                "name": layer.name,
                "visible": layer.visible,
                "opacity": layer.opacity,
                "matrix": matrix_cols(&layer.matrix),
                "shapes": shapes,
            })
        })
        .collect();
    json!({
        "progress": frame.progress,
        "frame": frame.frame,
        "layers": layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sample_arguments() {
        let cli = Cli::parse_from([
            "lottie-probe",
            "sample",
            "anim.json",
            "-p",
            "0,0.25,1",
            "--json",
        ]);
        match cli.command {
            Commands::Sample { progress, json, .. } => {
                assert_eq!(progress, vec![0.0, 0.25, 1.0]);
                assert!(json);
            }
            Commands::Inspect { .. } => panic!("expected sample"),
        }
    }

    #[test]
    fn test_matrix_cols_order() {
        let m = Mat3::from_translation(glam::Vec2::new(3.0, 4.0));
        assert_eq!(matrix_cols(&m), [1.0, 0.0, 0.0, 1.0, 3.0, 4.0]);
    }
}
