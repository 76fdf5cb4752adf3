//! skel-reid CLI: assign stable person names to pose-tracker bodies.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use skeleton_reid::config::SessionConfig;
use skeleton_reid::console::Console;
use skeleton_reid::reconcile::read_edit_script;
use skeleton_reid::record::RecordStore;
use skeleton_reid::session::AnnotationSession;
use skeleton_reid::spatial::reference_point;

#[derive(Parser)]
#[command(name = "skel-reid", version, about = "Skeleton identity annotation engine")]
struct Cli {
    /// Session config file (TOML). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Pose dataset CSV.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Newline-delimited person names.
    #[arg(long)]
    names: Option<PathBuf>,

    /// Zip archive of frame images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Output CSV for the labelled export.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Field delimiter for input and output.
    #[arg(long)]
    delimiter: Option<char>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a pose dataset without starting a session.
    Inspect {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Label frames interactively.
    Annotate {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Apply a scripted edit file frame by frame and export the result.
    Replay {
        #[command(flatten)]
        input: InputArgs,

        /// CSV with Frame,BodyID,PersonName columns.
        #[arg(long)]
        edits: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Inspect { input } => {
            let config = merge(base, input);
            let store = RecordStore::from_path(config.dataset_path()?, config.delimiter_byte()?)?;

            println!("records:  {}", store.len());
            println!("frames:   {}", store.frame_count());
            let frames = store.frames();
            if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
                println!("range:    {first}..={last}");
            }
            let coords: Vec<&str> = store.coordinate_columns().collect();
            println!("coordinate columns ({}): {}", coords.len(), coords.join(", "));

            let bodies: BTreeSet<_> = store.iter().map(|r| r.body_id).collect();
            println!("distinct BodyIDs: {}", bodies.len());

            let keyless: Vec<_> = store.iter().filter(|r| reference_point(r).is_err()).collect();
            if keyless.is_empty() {
                println!("every record has a neck key");
            } else {
                println!("records without a neck key ({}):", keyless.len());
                for r in keyless {
                    println!("  frame {} BodyID {}", r.frame, r.body_id);
                }
            }
        }

        Commands::Annotate { input } => {
            let config = merge(base, input);
            let mut session = AnnotationSession::open(&config)?;
            let delimiter = config.delimiter_byte()?;

            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            Console::new(&mut session, config.output.clone(), delimiter)
                .run(stdin.lock(), stdout.lock())
                .into_diagnostic()?;
            session.finish();
        }

        Commands::Replay { input, edits } => {
            let config = merge(base, input);
            let delimiter = config.delimiter_byte()?;
            let mut session = AnnotationSession::open(&config)?;

            let file = std::fs::File::open(&edits).into_diagnostic()?;
            let script = read_edit_script(file, delimiter)?;
            let summary = session.replay(&script)?;

            let table = session.export_all()?;
            table.write_to_path(&config.output, delimiter)?;
            println!(
                "{} named, {} cleared; exported {} row(s) to {}",
                summary.named,
                summary.cleared,
                table.len(),
                config.output.display()
            );
        }
    }

    Ok(())
}

/// Overlay command-line flags on the config file.
fn merge(mut config: SessionConfig, input: InputArgs) -> SessionConfig {
    if input.data.is_some() {
        config.dataset = input.data;
    }
    if input.names.is_some() {
        config.names = input.names;
    }
    if input.images.is_some() {
        config.images = input.images;
    }
    if let Some(output) = input.output {
        config.output = output;
    }
    if let Some(delimiter) = input.delimiter {
        config.delimiter = delimiter;
    }
    config
}
