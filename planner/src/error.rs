//! Error types for map loading

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    /// The map header is missing fields or holds values that cannot describe a grid
    #[error("Bad map header: {0}")]
    Format(String),

    #[error("Could not read map: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
