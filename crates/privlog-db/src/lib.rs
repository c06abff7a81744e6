//! Database layer for the privilege event service.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and the embedded SQL migrations that create the `priv_data` table.
//!
//! Every store operation checks a connection out of the pool for the span of
//! a single statement; the `r2d2` guard hands it back on every exit path.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
