use anyhow::{Context as _, Result};
use carvegen_core::{
    draw_fragmented_files, intertwine_randomly, Context, DrawConfig, Image, LogReconstructor,
    Scenario,
};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carvegen", version, about = "Synthesize file-carving test images")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write one scenario of intertwined file fragments
    Intertwine {
        #[command(flatten)]
        draw: DrawArgs,
        /// Scenario name recorded in the metadata
        #[arg(long, default_value = "intertwined")]
        name: String,
    },
    /// Write one scenario per drawn file, fragments in order
    Draw {
        #[command(flatten)]
        draw: DrawArgs,
    },
    /// Print the physical fragment order recorded in an image sidecar
    Log { metadata: PathBuf },
}

#[derive(Args)]
struct DrawArgs {
    #[arg(long)]
    corpus: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
    /// Directory below the corpus root to draw from
    #[arg(long)]
    subdir: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    files: usize,
    #[arg(long, default_value_t = 512)]
    block_size: u64,
    #[arg(long, default_value_t = 1)]
    min_fragments: usize,
    #[arg(long, default_value_t = 4)]
    max_fragments: usize,
}

impl DrawArgs {
    fn context(&self) -> Context {
        let ctx = Context::new(&self.corpus);
        match self.seed {
            Some(s) => ctx.with_seed(s),
            None => ctx,
        }
    }

    fn config(&self) -> DrawConfig {
        DrawConfig {
            path: self.subdir.clone(),
            files: self.files,
            block_size: self.block_size,
            min_fragments: self.min_fragments,
            max_fragments: self.max_fragments,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Intertwine { draw, name } => intertwine(&draw, &name)?,
        Cmd::Draw { draw } => draw_files(&draw)?,
        Cmd::Log { metadata } => print_log(&metadata)?,
    }
    Ok(())
}

fn intertwine(args: &DrawArgs, name: &str) -> Result<()> {
    let mut ctx = args.context();
    let frags = intertwine_randomly(&mut ctx, &args.config()).context("intertwine files")?;
    let mut scenario = Scenario::new(name);
    scenario.add_all(frags);
    write_image(&ctx, args, vec![scenario])
}

fn draw_files(args: &DrawArgs) -> Result<()> {
    let mut ctx = args.context();
    let drawn = draw_fragmented_files(&mut ctx, &args.config()).context("draw files")?;
    let scenarios = drawn
        .into_iter()
        .enumerate()
        .map(|(i, frags)| {
            let mut s = Scenario::new(format!("file {}", i + 1));
            s.add_all(frags);
            s
        })
        .collect();
    write_image(&ctx, args, scenarios)
}

fn write_image(ctx: &Context, args: &DrawArgs, scenarios: Vec<Scenario>) -> Result<()> {
    let mut image = Image::new(ctx).with_block_size(args.block_size)?;
    for s in scenarios {
        image.add(s);
    }
    let meta = image
        .write(&args.output)
        .with_context(|| format!("write image {}", args.output.display()))?;
    info!(seed = meta.seed, scenarios = meta.scenarios.len(), "done");
    eprintln!("Wrote {} (seed {})", args.output.display(), meta.seed);
    Ok(())
}

fn print_log(metadata: &Path) -> Result<()> {
    let log = LogReconstructor::from_path(metadata)
        .with_context(|| format!("read {}", metadata.display()))?;
    let mut out = std::io::stdout().lock();
    for p in log.fragment_order() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            p.scenario,
            p.file_id,
            p.path,
            p.number,
            p.file_start,
            p.file_end,
            p.image_start,
            p.image_end
        )?;
    }
    Ok(())
}
