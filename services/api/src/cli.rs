use crate::demo::{run_deadline_table, run_demo, DeadlinesArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use karin_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Ley Karin Process Engine",
    about = "Run and demonstrate the Ley Karin investigation process engine",
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
    /// Walk a sample complaint through the whole procedure
    Demo(DemoArgs),
    /// Print statutory deadlines for a start date
    Deadlines(DeadlinesArgs),
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
        Command::Demo(args) => run_demo(args),
        Command::Deadlines(args) => run_deadline_table(args),
    }
}
