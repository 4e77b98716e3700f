// src/main.rs

use stalk::config::StalkConfig;
use stalk::errors::StalkError;
use stalk::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = match cli::try_parse() {
        Ok(args) => args,
        Err(err) if cli::is_informational(&err) => {
            let _ = err.print();
            std::process::exit(0);
        }
        Err(err) => {
            eprint!("{err}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    if let Err(err) = run_main(args).await {
        if let Some(StalkError::Usage(_)) = err.downcast_ref::<StalkError>() {
            eprintln!("{err}");
            eprintln!("{}", cli::USAGE);
        } else {
            eprintln!("stalk error: {err:?}");
        }
        std::process::exit(1);
    }
}

async fn run_main(args: cli::CliArgs) -> anyhow::Result<()> {
    let config = StalkConfig::from_args(&args)?;
    logging::init_logging(args.log_level)?;
    run(config).await?;
    Ok(())
}
