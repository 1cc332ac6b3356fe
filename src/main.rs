use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use forcegraph::config::{GraphOptions, Preset};
use forcegraph::graph::ForceGraph;
use forcegraph::io::{FormatRegistry, IoError};

/// Force-directed graph layout and SVG rendering.
#[derive(Parser)]
#[command(name = "forcegraph")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input graph file (.json, .yaml) - used when no subcommand specified
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a graph and write it out (default behavior)
    Render {
        /// Input graph file (.json, .yaml)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Load a graph, resolve its links and print a summary
    Validate {
        /// Input graph file (.json, .yaml)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct LayoutArgs {
    /// Output file
    #[arg(short, long, default_value = "graph.svg")]
    output: PathBuf,

    /// Output format: svg, html or layout-json (defaults from the output extension)
    #[arg(short, long)]
    format: Option<String>,

    /// Force parameter preset
    #[arg(short, long, value_enum)]
    preset: Option<PresetArg>,

    /// Options file (.json, .yaml); the preset, when given, replaces its simulation section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of simulation frames
    #[arg(long, default_value_t = 1000)]
    max_frames: usize,

    /// Seed for the jitter that separates coincident nodes
    #[arg(long)]
    seed: Option<u64>,

    /// Canvas width
    #[arg(long)]
    width: Option<f64>,

    /// Canvas height
    #[arg(long)]
    height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Compact,
    Spread,
    D3,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Compact => Preset::Compact,
            PresetArg::Spread => Preset::Spread,
            PresetArg::D3 => Preset::D3,
        }
    }
}

impl LayoutArgs {
    /// Options file (or preset), then individual flags on top
    fn options(&self) -> anyhow::Result<GraphOptions> {
        let mut options = match &self.config {
            Some(path) => GraphOptions::load(path)
                .with_context(|| format!("loading options from {}", path.display()))?,
            None => GraphOptions::preset(self.preset.map(Preset::from).unwrap_or_default()),
        };
        if let (Some(_), Some(preset)) = (&self.config, self.preset) {
            options.simulation = GraphOptions::preset(preset.into()).simulation;
        }
        if let Some(seed) = self.seed {
            options.simulation.seed = seed;
        }
        if let Some(width) = self.width {
            options.render.width = width;
        }
        if let Some(height) = self.height {
            options.render.height = height;
        }
        Ok(options)
    }
}

fn render(input: &Path, args: &LayoutArgs) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let data = registry.read(input)?;
    let options = args.options()?;

    let writer = match &args.format {
        Some(format) => registry
            .writer_for_format(format)
            .ok_or_else(|| IoError::UnsupportedFormat(format.clone()))?,
        None => registry.writer_for_path(&args.output)?,
    };

    let mut graph = ForceGraph::new(&data, &options)
        .with_context(|| format!("building graph from {}", input.display()))?;
    let frames = graph.settle(args.max_frames);
    writer.write(&graph.scene(), &args.output)?;

    println!(
        "Rendered {} nodes and {} links ({} frames) to {} as {}",
        data.nodes.len(),
        data.links.len(),
        frames,
        args.output.display(),
        writer.format_id()
    );
    Ok(())
}

fn validate(input: &Path) -> anyhow::Result<()> {
    let model = FormatRegistry::with_defaults().read_model(input)?;
    let groups: BTreeSet<_> = model.nodes.iter().filter_map(|n| n.group.clone()).collect();
    let isolated = model.degrees().iter().filter(|&&d| d == 0).count();

    println!(
        "{}: {} nodes, {} links, {} groups, {} isolated nodes",
        input.display(),
        model.nodes.len(),
        model.links.len(),
        groups.len(),
        isolated
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render { input, layout }) => {
            render(&input, &layout)?;
        }
        Some(Commands::Validate { input }) => {
            validate(&input)?;
        }
        None => {
            // Default behavior: render if input provided
            if let Some(input) = cli.input {
                render(&input, &cli.layout)?;
            } else {
                println!("forcegraph: no input specified. Use --help for usage.");
            }
        }
    }

    Ok(())
}
