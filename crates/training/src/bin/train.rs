use clap::Parser;
use training::util::{run_train, TrainArgs};

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = TrainArgs::parse();
    let report = run_train(args)?;
    match report.best_epoch {
        Some(epoch) => println!(
            "Saved best checkpoint (epoch {epoch}) to {} and final model to {}",
            report.best_checkpoint.display(),
            report.final_checkpoint.display()
        ),
        None => println!(
            "Saved final model to {}",
            report.final_checkpoint.display()
        ),
    }
    Ok(())
}
