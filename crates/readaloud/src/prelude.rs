pub use crate::error::Error;
pub use readaloud_core::ReaderError;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;
