use crate::prelude::*;
use clap::Parser;

mod config;
mod document;
mod error;
mod inspect;
mod player;
mod prelude;
mod read;
mod reader;
mod speak;
mod speech;
mod view;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Read PDF documents aloud, one page at a time"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "READALOUD_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Open a PDF and control reading from the prompt
    Read(crate::read::Options),

    /// Print the text of a PDF, or of one page
    Text(crate::inspect::TextOptions),

    /// Print PDF metadata as JSON
    Info(crate::inspect::InfoOptions),

    /// Generate speech for one page without playing it
    Speak(crate::speak::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Read(options) => crate::read::run(options, app.global).await,
        SubCommands::Text(options) => crate::inspect::text(options, app.global).await,
        SubCommands::Info(options) => crate::inspect::info(options, app.global).await,
        SubCommands::Speak(options) => crate::speak::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
