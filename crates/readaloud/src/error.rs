#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} is not a PDF file")]
    NotAPdf(String),

    #[error("Could not find any of [{0}] on PATH")]
    MissingBinary(String),
}
