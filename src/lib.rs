pub mod common;
pub mod config;
pub mod error;
pub mod extractor;
pub mod io;
pub mod objective;
pub mod optim;
pub mod params;
pub mod synthesis;
