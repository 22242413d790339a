use clap::{Parser, Subcommand};
use cli::{
    ConfigFormat, FrameSummary, OutputWriter, ReportFormat, frame_stem, load_profiles,
    open_inputs, render_profiles, resolve_config,
};
use color_eyre::eyre::{Result, eyre};
use detection::{
    Calibration, ColorAssigner, DetectionConfig, DetectionProfiles, Frame, ObjectClass, Palette, Pipeline, PipelineBuilder, RandomColors,
};
use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect objects in image files and write overlays and reports
    Detect {
        /// Image files, or a single directory of images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Object class whose profile to use
        #[arg(short, long)]
        class: Option<ObjectClass>,
        /// Profiles file (.toml or .json); built-in presets when omitted
        #[arg(short, long)]
        profiles: Option<PathBuf>,
        /// Single detection config file, overrides --class
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for overlays and reports
        #[arg(short, long, default_value = "detections")]
        output_dir: PathBuf,
        /// Structured report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Geojson)]
        format: ReportFormat,
        /// Contour line thickness in the overlay
        #[arg(long, default_value = "2")]
        thickness: u32,
        /// Seed for random contour colors; fixed palette when omitted
        #[arg(long)]
        seed: Option<u64>,
        /// Also write converted, mask, cleaned and edge images
        #[arg(long)]
        debug_stages: bool,
    },
    /// Print the built-in detection presets
    Presets {
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration files
    Schema {
        /// Schema of a whole profiles file instead of a single config
        #[arg(long)]
        profiles: bool,
    },
    /// Tune a class profile on a still image with commands read from stdin
    Calibrate {
        /// Image to calibrate against
        #[arg(short, long)]
        image: PathBuf,
        /// Object class to tune
        #[arg(short, long)]
        class: ObjectClass,
        /// Profiles file to start from and save to
        #[arg(short, long)]
        profiles: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Detect {
            inputs,
            class,
            profiles,
            config,
            output_dir,
            format,
            thickness,
            seed,
            debug_stages,
        } => {
            let config = resolve_config(*class, profiles.as_deref(), config.as_deref())?;
            let pipeline = PipelineBuilder::from_config(config)
                .line_thickness(*thickness)
                .build()?;
            let writer = OutputWriter::new(output_dir, *format)?;
            let mut colors: Box<dyn ColorAssigner> = match seed {
                Some(seed) => Box::new(RandomColors::seeded(*seed)),
                None => Box::new(Palette::default()),
            };
            detect(inputs, &pipeline, &writer, colors.as_mut(), *debug_stages)?;
        }
        Commands::Presets { format, output } => {
            let text = render_profiles(&DetectionProfiles::presets(), *format)?;
            match output {
                Some(path) => {
                    std::fs::write(path, text)?;
                    info!("Presets written to {:?}", path);
                }
                None => println!("{text}"),
            }
        }
        Commands::Schema { profiles } => {
            let schema = if *profiles {
                serde_json::to_string_pretty(&DetectionProfiles::schema())?
            } else {
                serde_json::to_string_pretty(&DetectionConfig::schema())?
            };
            println!("{schema}");
        }
        Commands::Calibrate { image, class, profiles } => {
            calibrate(image, *class, profiles.as_deref())?;
        }
    }

    Ok(())
}

fn detect(
    inputs: &[PathBuf],
    pipeline: &Pipeline,
    writer: &OutputWriter,
    colors: &mut dyn ColorAssigner,
    debug_stages: bool,
) -> Result<()> {
    let mut source = open_inputs(inputs)?;
    let stems: Vec<String> = source
        .paths()
        .enumerate()
        .map(|(index, path)| frame_stem(index, Some(path)))
        .collect();
    info!("{}", pipeline.info());
    info!("Processing {} frames into {:?}", stems.len(), writer.dir());

    let mut summaries = Vec::new();
    let summary = pipeline.process_source_with_stages(&mut source, |index, detections, stages| {
        let stem = &stems[index];
        let stages_written = if debug_stages { writer.write_stages(stem, &stages) } else { Ok(()) };
        let written = stages_written
            .and_then(|_| writer.write_reports(stem, &detections))
            .and_then(|_| writer.write_overlay(stem, &pipeline.render(&detections, colors)));
        match written {
            Ok(()) => summaries.push(FrameSummary::new(stem.as_str(), &detections)),
            Err(e) => warn!("Failed to write outputs for '{}': {}", stem, e),
        }
    });

    let summary_path = writer.write_summary(&summaries)?;
    let objects: usize = summaries.iter().map(|s| s.objects).sum();
    info!(
        "✅ {} frames processed, {} skipped, {} objects found",
        summaries.len(),
        summary.skipped,
        objects
    );
    info!("📄 Summary saved to: {:?}", summary_path);

    if summaries.is_empty() {
        return Err(eyre!("No frame could be processed"));
    }
    Ok(())
}

fn calibrate(image: &Path, class: ObjectClass, profiles_path: Option<&Path>) -> Result<()> {
    let mut profiles = load_profiles(profiles_path)?;
    let config = profiles.get(class)?.clone();
    let mut calibration = Calibration::new(Frame::open(image)?, config)?;

    println!("Calibrating '{class}' on {}", image.display());
    println!("Commands: low <ch> <v> | high <ch> <v> | edge <low> | ratio <r> | space <name>");
    println!("          ops <op:WxH:iters,...> | retrieval <mode> | show | save [path] | quit");
    println!("{}", calibration.evaluate()?);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "show" => println!("{}", calibration.config().to_toml()?),
            "save" => {
                let path = match (rest.trim(), profiles_path) {
                    ("", Some(path)) => path.to_path_buf(),
                    ("", None) => PathBuf::from("profiles.toml"),
                    (path, _) => PathBuf::from(path),
                };
                profiles.insert(class, calibration.config().clone());
                match profiles.save(&path) {
                    Ok(()) => println!("Saved '{class}' profile to {}", path.display()),
                    Err(e) => println!("Save failed: {e}"),
                }
            }
            _ => match calibration.apply_command(line) {
                Ok(()) => match calibration.evaluate() {
                    Ok(reading) => println!("{reading}"),
                    Err(e) => println!("Evaluation failed: {e}"),
                },
                Err(e) => println!("Rejected: {e}"),
            },
        }
    }

    Ok(())
}
