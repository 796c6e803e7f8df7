pub mod health;
pub mod jobs;
pub mod projects;
pub mod tasks;
pub mod workers;

pub use health::*;
