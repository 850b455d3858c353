use std::io::Write;
use std::path::PathBuf;

use backend_lowering::{
    LoweringEngine, LoweringError, LoweringOptions, PadOverflow, ProgramBuilder,
    TargetSpecification, VisitorRegistry, load_lowering_input,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lower traced graph nodes into TOSA or QNN instructions", long_about = None)]
struct Cli {
    /// Path to a JSON document with `nodes`, optional `target` and `quantization`.
    #[arg(required_unless_present = "list_visitors")]
    graph: Option<PathBuf>,
    /// Target specification, e.g. `TOSA-1.0+FP` or `QNN-2.0+INT`. Overrides the document.
    #[arg(long)]
    target: Option<TargetSpecification>,
    /// Path to write the lowered instructions as JSON (stdout if omitted).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Fail instead of clamping when ceil-mode pooling needs a pad of a full kernel.
    #[arg(long)]
    reject_pad_overflow: bool,
    /// Print every registered (operator, target) binding and exit.
    #[arg(long)]
    list_visitors: bool,
}

fn run() -> Result<(), LoweringError> {
    let cli = Cli::parse();
    let registry = VisitorRegistry::with_defaults()?;

    if cli.list_visitors {
        for (target, spec, name) in registry.registered_pairs() {
            println!("{:<28} {:<14} {}", target, spec.to_string(), name);
        }
        return Ok(());
    }

    let Some(graph_path) = cli.graph else {
        return Ok(());
    };
    let input = load_lowering_input(&graph_path)?;
    let spec = input.resolve_target(cli.target)?;

    let options = LoweringOptions {
        pad_overflow: if cli.reject_pad_overflow {
            PadOverflow::Reject
        } else {
            PadOverflow::Clamp
        },
    };
    let engine = LoweringEngine::new(&registry, options);
    let mut builder = ProgramBuilder::new();
    let lowered = engine.lower_graph(&input.nodes, &mut builder, &input.quantization, spec)?;

    let json = builder.to_json()?;
    if let Some(path) = cli.output {
        std::fs::write(&path, json).map_err(|err| LoweringError::export(path.clone(), err))?;
        println!(
            "Lowered {} nodes from `{}` for {} into `{}`.",
            lowered,
            graph_path.display(),
            spec,
            path.display()
        );
    } else {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", json).map_err(|err| LoweringError::export("<stdout>", err))?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
