use crate::demo::{run_demo, DemoArgs};
use crate::report::{run_report, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use movequote::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Moving Quote Wizard",
    about = "Serve, demonstrate or report on the moving-quote wizard from the command line",
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
    /// Walk a scripted customer through every wizard step against the demo desk
    Demo(DemoArgs),
    /// Print the funnel report of a running service
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the deposit charged at checkout, in cents
    #[arg(long)]
    pub(crate) deposit_cents: Option<u32>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Report(args) => run_report(args).await,
    }
}
