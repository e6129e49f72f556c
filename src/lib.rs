pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod geometry;
pub mod invert;
pub mod saver;
pub mod segment;
pub mod theme;
pub mod utils;
pub mod viewer;
pub mod warp;

pub use error::{ExtractorError, Result};
