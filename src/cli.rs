use crate::config::load_config;
use crate::layout::{Layout, bidirectional_label_hits, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::model::parse_graph;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "archmap", version, about = "Architecture map layout engine")]
pub struct Args {
    /// Input graph JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output layout JSON file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON5 file overriding layout defaults
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Pointer position "x,y"; prints hover states for reciprocal
    /// edge labels instead of the layout
    #[arg(long = "probe")]
    pub probe: Option<String>,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input)?;
    let layout = compute_layout(&graph, &config);

    if let Some(raw) = &args.probe {
        let pointer = parse_pointer(raw)?;
        let hits = bidirectional_label_hits(&layout, pointer, &config);
        if let Some(path) = &args.output {
            write_layout_dump(path, &layout)?;
        }
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &hits)?;
        writeln!(handle)?;
        return Ok(());
    }

    write_output(args.output.as_deref(), &layout)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(output: Option<&Path>, layout: &Layout) -> Result<()> {
    if let Some(path) = output {
        return write_layout_dump(path, layout);
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &LayoutDump::from_layout(layout))?;
    writeln!(handle)?;
    Ok(())
}

fn parse_pointer(raw: &str) -> Result<(f32, f32)> {
    let (x, y) = raw
        .split_once(',')
        .context("pointer must be given as \"x,y\"")?;
    let x: f32 = x.trim().parse().context("pointer x is not a number")?;
    let y: f32 = y.trim().parse().context("pointer y is not a number")?;
    Ok((x, y))
}
