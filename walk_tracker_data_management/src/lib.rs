use const_format::concatcp;

pub mod configuration;
pub mod database;
pub mod gpx_util;
pub mod profile;
pub mod recorder;
pub mod replay;
mod data_manager;

pub use configuration::Configuration;
pub use data_manager::*;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "walks.db");
pub const CONFIG_PATH: &str = concatcp!(DATA_DIR, "walk_tracker.conf");

#[derive(Debug, thiserror::Error)]
pub enum DataManagerError {
    #[error("database: {0}")]
    Database(String),
    #[error("encoding: {0}")]
    Encoding(String),
    #[error("gpx: {0}")]
    Gpx(String),
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("walk session: {0}")]
    Session(#[from] walk_session::SessionError),
    #[error("replay: {0}")]
    Replay(String),
}
