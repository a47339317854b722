pub mod models;
pub mod tag_store;

pub use self::tag_store::TagStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot initialize the tag store with an open connection")]
    AlreadyOpen,
    #[error("Tag store has not been initialized")]
    NotOpen,
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
