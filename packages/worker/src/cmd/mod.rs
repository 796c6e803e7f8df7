pub mod jobs;
pub mod projects;
pub mod run;
pub mod tasks;
pub mod workers;
