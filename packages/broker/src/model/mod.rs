//! Typed records for the scheduling engine's state model (C1).
//!
//! Each record implements [`Record`] over a `sqlx::PgPool`, following the
//! same shape this codebase uses for its background-job table: a thin
//! struct mirroring the row, `FromRow`-derived, with free functions for
//! the queries that need more than single-row CRUD.

mod job;
mod project;
mod task;
mod worker;

pub use job::{Job, JobStatus};
pub use project::{Project, ProjectStatus};
pub use task::Task;
pub use worker::Worker;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DomainResult;

/// Minimal CRUD contract shared by every record type.
///
/// Dispatch- and propagation-specific queries that need transactional row
/// locks (see `dispatch.rs`, `dependency.rs`) are hand-written `sqlx`
/// statements against a `Transaction`, not routed through this trait.
#[async_trait]
pub trait Record: Sized + Send + Sync {
    type Id;

    async fn find_by_id(pool: &PgPool, id: Self::Id) -> DomainResult<Option<Self>>;
    async fn delete(pool: &PgPool, id: Self::Id) -> DomainResult<bool>;
}
