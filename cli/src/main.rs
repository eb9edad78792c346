mod args;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::FileSpec;
use lightmetrica_core::config;
use lightmetrica_core::scheduler;

use args::{Cli, Command, RenderArgs};

fn main() {
    println!("Lightmetrica {} [detected {} cores]", env!("CARGO_PKG_VERSION"), num_cpus::get());

    let cli = Cli::parse();

    let log_spec = if cli.verbose { "lightmetrica=debug,lightmetrica_core=debug" } else { "lightmetrica=info,lightmetrica_core=info" };
    flexi_logger::Logger::try_with_str(log_spec)
        .unwrap()
        .log_to_file(FileSpec::default().suppress_timestamp().directory("/tmp"))
        .format(flexi_logger::opt_format)
        .start()
        .unwrap_or_else(|e| panic!("failed to initialize logger: {}", e));

    if let Err(e) = run(cli) {
        eprintln!("application error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render(args) => render(args),
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let scene_yaml = fs::read_to_string(&args.scene).with_context(|| format!("reading scene document {}", args.scene.display()))?;
    let render_yaml = fs::read_to_string(&args.render_option).with_context(|| format!("reading render-option document {}", args.render_option.display()))?;

    let scene_doc = config::load_scene_document(&scene_yaml).with_context(|| format!("parsing scene document {}", args.scene.display()))?;
    let render_doc = config::load_render_document(&render_yaml).with_context(|| format!("parsing render-option document {}", args.render_option.display()))?;

    let (scene, sensor) = config::build_scene(&scene_doc).context("building scene")?;
    let mut settings = config::RenderSettings::from_document(&render_doc);
    if let Some(threads) = args.threads {
        settings.num_threads = if threads <= 0 { (num_cpus::get() as i32 + threads).max(1) as usize } else { threads as usize };
    }
    if let Some(output) = &args.output {
        settings.output_path = output.display().to_string();
    }

    log::info!("estimator '{}', {} threads, output {}", settings.estimator, settings.num_threads, settings.output_path);

    let (width, height) = sensor.resolution();
    let film = lightmetrica_core::film::Film::new(width, height);
    let sample_count = scheduler::render(&scene, &sensor, &film, &settings);
    film.save(&settings.output_path, 1.0 / sample_count as f32).context("saving film")?;

    Ok(())
}
