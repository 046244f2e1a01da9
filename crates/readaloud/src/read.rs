use std::path::PathBuf;

use tokio::io::BufReader;

use crate::config::{PlayerArgs, SpeechArgs};
use crate::player::Ffplay;
use crate::prelude::{eprintln, *};
use crate::reader::Reader;
use crate::speech::{Speech, SpeechSource};
use crate::view::TerminalView;

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path to the PDF file
    pub file: PathBuf,

    #[clap(flatten)]
    pub speech: SpeechArgs,

    #[clap(flatten)]
    pub player: PlayerArgs,
}

/// Interactive reader on stdin.
pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let speech = Speech::setup(&options.speech)?;
    let player = Ffplay::locate(&options.player)?;

    if global.verbose {
        eprintln!("Using {} speech and {:?}", speech.backend(), player);
    }

    let mut reader = Reader::new(
        speech,
        player,
        TerminalView::new(),
        options.player.sample_every(),
    );
    reader.open(&options.file).await?;
    reader.run(BufReader::new(tokio::io::stdin())).await
}
