//! WhatsNext scheduling engine: projects, tasks and jobs with dependency
//! tracking, dispatched to polling workers over HTTP.

pub mod config;
pub mod dependency;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod server;
pub mod state;

pub use config::Config;
pub use state::AppState;
