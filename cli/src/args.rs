//! Argument parsing. Grounded on the legacy `src/argparse.rs`'s flag set
//! (`--output`/`--threads`/`--verbose`), ported to clap v4 derive style and
//! given a `render` subcommand to match the two-document invocation shape
//! (`lightmetrica render --scene <file> --render-option <file>`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lightmetrica", version, about = "Physically-based light transport renderer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug information.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a scene document with the given render-option document.
    Render(RenderArgs),
}

#[derive(clap::Args)]
pub struct RenderArgs {
    /// Scene document (YAML).
    #[arg(long)]
    pub scene: PathBuf,

    /// Render-option document (YAML).
    #[arg(long)]
    pub render_option: PathBuf,

    /// Overrides the render-option document's `num_threads`, same
    /// `<= 0 => hardware_concurrency + value` convention.
    #[arg(short, long)]
    pub threads: Option<i32>,

    /// Overrides the render-option document's `output_path`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
