use std::path::PathBuf;

use crate::document::{reader_error, LoadedDocument};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct TextOptions {
    /// Path to the PDF file
    pub file: PathBuf,

    /// Only print this page (1-based); the whole document otherwise
    #[arg(short, long)]
    pub page: Option<usize>,
}

#[derive(Debug, clap::Args)]
pub struct InfoOptions {
    /// Path to the PDF file
    pub file: PathBuf,
}

/// Print the text that would be read aloud.
pub async fn text(options: TextOptions, _global: crate::Global) -> Result<()> {
    let document = LoadedDocument::read(&options.file).await?;
    println!("{}", extract_text(&document, options.page)?);
    Ok(())
}

/// Print document metadata as JSON.
pub async fn info(options: InfoOptions, _global: crate::Global) -> Result<()> {
    let document = LoadedDocument::read(&options.file).await?;
    let meta = pdf::info(document.bytes()).map_err(|e| eyre!(reader_error(e)))?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

/// One page, or every page joined line by line.
pub fn extract_text(document: &LoadedDocument, page: Option<usize>) -> Result<String> {
    match page {
        Some(page) => document.extract(page).text.map_err(|e| eyre!(e)),
        None => pdf::document_text(document.bytes()).map_err(|e| eyre!(reader_error(e))),
    }
}
