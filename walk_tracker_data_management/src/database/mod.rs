pub mod constants;
pub mod db;
mod records_store;

pub use db::{WalkDatabase, WalkFilter};
