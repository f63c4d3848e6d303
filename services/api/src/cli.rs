use crate::demo::{run_demo, run_weights, DemoArgs, WeightsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ev_advisor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "EV Advisor",
    about = "Run the EV preference survey service and its command line tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute summed factor weights for every row of a CSV answer sheet
    Weights(WeightsArgs),
    /// Walk a scripted respondent through the survey and print the recommendations
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Weights(args) => run_weights(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
