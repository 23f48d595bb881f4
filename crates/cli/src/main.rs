use anyhow::{Context, Result};
use clap::Parser;

use ricemill_cli::cli::{Cli, Command};
use ricemill_cli::{journal, replay, report};
use ricemill_infra::MillConfig;
use ricemill_stock::SackSize;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = MillConfig::from_env().context("invalid RICEMILL_* configuration")?;
    ricemill_observability::init_with(&config.log_filter, cli.log_format.into());

    match cli.command {
        Command::Replay { journal, strict } => {
            let transactions =
                journal::load_journal(&journal, config.sack_policy.default_size())?;
            let outcome = replay::replay(&transactions, config, strict)?;

            for line in &outcome.lines {
                println!("{line}");
            }
            println!();
            print!("{}", report::render_summary(&outcome.summary));
            println!(
                "\n{} recorded, {} rejected",
                outcome.recorded, outcome.rejected
            );
        }
        Command::Convert { kg, sack_size } => {
            let size = match sack_size {
                Some(kg) => SackSize::new(kg)?,
                None => config.sack_policy.default_size(),
            };
            println!("{}", report::convert(kg, size)?);
        }
    }

    Ok(())
}
