use clap::Parser;
use data_contracts::artifacts::{FINAL_MODEL_PATH, QUANTIZED_MODEL_PATH};
use std::path::PathBuf;
use training::export::{BurnRecordConverter, ModelConverter, Optimization};

#[derive(Parser, Debug)]
#[command(
    name = "export",
    about = "Convert a trained PostureNet record into the compact quantized artifact"
)]
struct Args {
    /// Trained model to convert.
    #[arg(long, default_value = FINAL_MODEL_PATH)]
    source: PathBuf,
    /// Output artifact path.
    #[arg(long, default_value = QUANTIZED_MODEL_PATH)]
    output: PathBuf,
    /// Optimizations to apply (repeatable).
    #[arg(long = "optimization", value_enum, default_values_t = [Optimization::Default])]
    optimizations: Vec<Optimization>,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let report =
        BurnRecordConverter::default().convert(&args.source, &args.output, &args.optimizations)?;
    println!(
        "Wrote {} ({:?}, {} bytes; source {} bytes)",
        report.output.display(),
        report.precision,
        report.output_bytes,
        report.source_bytes
    );
    Ok(())
}
