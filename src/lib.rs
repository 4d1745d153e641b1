pub mod book;
pub mod color;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod export;
pub mod geom;
pub mod perf;
pub mod render;
pub mod session;
pub mod store;
