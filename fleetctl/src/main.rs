use clap::Parser;
use resources::{init_context, Error, Operations};
use tracing_subscriber::EnvFilter;

mod resources;
mod user_prompt;

#[derive(Parser, Debug)]
#[command(name = constants::CLI_NAME, version, about = "Compare and sync services across fleet environments")]
struct CliArgs {
    /// The operation to be performed.
    #[command(subcommand)]
    operations: Operations,

    #[command(flatten)]
    args: resources::CliArgs,
}

impl CliArgs {
    fn args() -> Self {
        CliArgs::parse()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli_args = CliArgs::args();
    if let Err(error) = cli_args.execute().await {
        let exit_code = match error {
            Error::Fleet(error) => {
                console_logger::error("", &error.to_string());
                error.into()
            }
            Error::Interrupted => 130,
            Error::Generic(error) => {
                console_logger::error("", &format!("{error:#}"));
                1
            }
        };
        std::process::exit(exit_code);
    }
}

impl CliArgs {
    async fn execute(self) -> Result<(), Error> {
        let mut context = init_context(&self.args)?;

        tokio::select! {
            biased;
            done = self.operations.execute(&mut context) => {
                done
            },
            _ = tokio::signal::ctrl_c() => {
                Err(Error::Interrupted)
            }
        }
    }
}
