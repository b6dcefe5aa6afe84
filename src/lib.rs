pub mod analyzer;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod util;
pub mod workspace;
