use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use readaloud_core::status::format_clock;

use crate::config::SpeechArgs;
use crate::document::LoadedDocument;
use crate::inspect::extract_text;
use crate::prelude::{eprintln, println, *};
use crate::speech::{Speech, SpeechSource};

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path to the PDF file
    pub file: PathBuf,

    /// Page to voice (1-based)
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Save the audio here instead of printing its location
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub speech: SpeechArgs,
}

/// Generate speech for one page and print where the audio is.
pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let document = LoadedDocument::read(&options.file).await?;
    let text = extract_text(&document, Some(options.page))?;
    let speech = Speech::setup(&options.speech)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message(f!("Generating speech for page {}...", options.page));

    let generated = speech.generate(text).await;
    spinner.finish_and_clear();
    let generated = generated.map_err(|e| eyre!(e))?;

    if global.verbose {
        if let Some(duration) = generated.audio.duration_hint {
            eprintln!("Duration: {}", format_clock(duration));
        }
    }

    let location = match (generated.scratch, options.output) {
        (Some(scratch), Some(output)) => {
            tokio::fs::copy(&scratch, &output)
                .await
                .wrap_err_with(|| f!("Could not write {}", output.display()))?;
            output.display().to_string()
        }
        (Some(scratch), None) => scratch.keep()?.display().to_string(),
        (None, Some(output)) => {
            let bytes = reqwest::get(&generated.audio.locator)
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            tokio::fs::write(&output, &bytes)
                .await
                .wrap_err_with(|| f!("Could not write {}", output.display()))?;
            output.display().to_string()
        }
        (None, None) => generated.audio.locator,
    };

    println!("{}", location);
    Ok(())
}
