mod cli;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    temple_admin::logging::init(args.verbose);

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Banner already printed by the command; only the exit code is left.
            if e.downcast_ref::<cli::Reported>().is_some() {
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
