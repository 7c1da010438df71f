pub mod collector;
pub mod config;
pub mod github;
pub mod model;
pub mod sync;
pub mod transport;
pub mod trigger;
