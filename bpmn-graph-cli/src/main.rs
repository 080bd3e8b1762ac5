use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bpmn_graph_core::{ConvertConfig, GraphConverter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let options = parse_args()?;

    let converter = GraphConverter::new(ConvertConfig {
        batch_size: options.batch_size,
        strict: options.strict,
        process_id: options.process_id.clone(),
        ..Default::default()
    });

    let outcome = converter.convert_file(&options.input, options.output.as_deref())?;

    for diag in outcome
        .schema_diagnostics
        .iter()
        .chain(&outcome.errors)
        .chain(&outcome.warnings)
    {
        println!("{diag}");
    }

    let batches = outcome.batches(converter.config().batch_size).count();
    println!(
        "process {}: {} nodes, {} edges, {} statements in {} batches",
        outcome.process_id,
        outcome.node_count,
        outcome.edge_count,
        outcome.statements.len(),
        batches
    );
    if let Some(path) = &options.output {
        println!("statements written to {}", path.display());
    }

    Ok(())
}

struct Options {
    input: PathBuf,
    output: Option<PathBuf>,
    process_id: Option<String>,
    batch_size: usize,
    strict: bool,
}

/// `bpmn-graph <input.json> [--output out.cypher] [--process-id id]
/// [--batch-size n] [--strict]`
fn parse_args() -> Result<Options> {
    let mut input = None;
    let mut output = None;
    let mut process_id = None;
    let mut batch_size = 20usize;
    let mut strict = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                let value = args.next().context("--output requires a path")?;
                output = Some(PathBuf::from(value));
            }
            "--process-id" => {
                process_id = Some(args.next().context("--process-id requires a value")?);
            }
            "--batch-size" => {
                let value = args.next().context("--batch-size requires a number")?;
                batch_size = value
                    .parse()
                    .with_context(|| format!("invalid batch size '{value}'"))?;
            }
            "--strict" => strict = true,
            "--help" | "-h" => {
                println!(
                    "usage: bpmn-graph <input.json> [--output out.cypher] \
                     [--process-id id] [--batch-size n] [--strict]"
                );
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown flag '{other}'"),
            other => {
                if input.is_some() {
                    bail!("unexpected extra argument '{other}'");
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    Ok(Options {
        input: input.context("missing input file (see --help)")?,
        output,
        process_id,
        batch_size,
        strict,
    })
}
