use anyhow::Result;
use clap::{Parser, Subcommand};
use isle_cli::{
    OutputLayout, TreeFormat, annotate_file, load_options, load_registry, run_batch, tree_file,
};
use isle_sfc::AnnotateOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "isle", version, about = "Island slot annotation and render-output inspection")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Worker threads (default: available parallelism)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,
    /// Exit with an error when any file fails
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the <slot> outlets of island components.
    Annotate {
        /// .vue files to annotate
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// JSON component registry; without it every input is an island
        #[arg(long)]
        components: Option<PathBuf>,
        /// Output directory (default: target/isle-out)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Reconstruct the node tree of compiled server render functions.
    Tree {
        /// Compiled component modules
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// JSON file overriding the recognized helper names
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = TreeFormat::Json)]
        format: TreeFormat,
        /// Output directory (default: target/isle-out)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let jobs = cli.jobs.unwrap_or_else(isle_cli::default_jobs);
    let report = match cli.command {
        Commands::Annotate {
            inputs,
            components,
            out_dir,
        } => {
            let registry = components.as_deref().map(load_registry).transpose()?;
            let options = AnnotateOptions::default();
            let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("target/isle-out"));
            let layout = OutputLayout::new(out_dir, &inputs);
            run_batch(&inputs, jobs, |input| {
                annotate_file(input, registry.as_ref(), &options, &layout)
            })
        }
        Commands::Tree {
            inputs,
            config,
            format,
            out_dir,
        } => {
            let options = load_options(config.as_deref())?;
            let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("target/isle-out"));
            let layout = OutputLayout::new(out_dir, &inputs);
            run_batch(&inputs, jobs, |input| tree_file(input, &options, format, &layout))
        }
    };

    println!(
        "{} written, {} unchanged, {} failed",
        report.written.len(),
        report.unchanged.len(),
        report.failed.len()
    );
    if cli.strict && !report.is_success() {
        anyhow::bail!("{} file(s) failed", report.failed.len());
    }
    Ok(())
}
