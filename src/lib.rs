//! Sparkify ETL library - loaders, storage and batch driver for the binary.

pub mod batch;
pub mod discover;
pub mod error;
pub mod log_file;
pub mod models;
pub mod progress;
pub mod resolve;
pub mod song_file;
pub mod storage;
pub mod time;
pub mod users;
