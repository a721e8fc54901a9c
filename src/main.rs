use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use std::time::Instant;

use edgeio::{Coo, CooFlags};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    /// Native binary layout
    Bin,
    /// Whitespace-delimited edge list
    Text,
    /// Split CSV files (`<output>.<k>.csv`)
    Csv,
}

#[derive(Parser)]
#[command(
    name = "edgeio",
    version,
    about = "Convert graph and sparse-matrix files between edge-list, MatrixMarket, binary and CSV forms"
)]
struct ProgramArgs {
    /// Input file (.mtx, .graph, edge list, or an edgeio binary)
    #[arg(short, long, required = true)]
    input: String,

    /// Output file (or CSV base name)
    #[arg(short, long, required = true)]
    output: String,

    /// Output representation
    #[arg(short = 'k', long, value_enum, default_value_t = OutputKind::Bin)]
    kind: OutputKind,

    /// Read the third column as edge weights
    #[arg(short, long)]
    weighted: bool,

    /// Emit both orientations of every undirected record
    #[arg(short, long)]
    symmetric: bool,

    /// Keep only records with x <= y
    #[arg(short = 'u', long)]
    upper_triangle: bool,

    /// Drop x == y records
    #[arg(short = 'l', long)]
    drop_self_loops: bool,

    /// Records per CSV file
    #[arg(long, default_value_t = 1_000_000)]
    edges_per_file: usize,

    /// Prefix CSV rows with an edge id column
    #[arg(long)]
    edge_ids: bool,

    /// Print timing information
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &ProgramArgs) -> edgeio::Result<()> {
    let flags = CooFlags {
        symmetric: args.symmetric,
        upper_triangle: args.upper_triangle,
        drop_self_loops: args.drop_self_loops,
        weighted: args.weighted,
    };

    let start = Instant::now();
    let coo: Coo<u64, usize, f64> = Coo::from_file(&args.input, flags)?;
    if args.verbose {
        println!(
            "read {} edges over {} labels in {:?}",
            coo.m(),
            coo.n(),
            start.elapsed()
        );
    }

    let start = Instant::now();
    match args.kind {
        OutputKind::Bin => coo.save(&args.output)?,
        OutputKind::Text => coo.write(&args.output)?,
        OutputKind::Csv => coo.write_split_csv(&args.output, args.edges_per_file, args.edge_ids)?,
    }
    if args.verbose {
        println!("wrote {} in {:?}", args.output, start.elapsed());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = ProgramArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("edgeio: {e}");
            ExitCode::FAILURE
        }
    }
}
