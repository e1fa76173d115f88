//! Store drivers.
//!
//! - [`sqlite`]: the local source store (SQLx)
//! - [`postgres`]: the hosted target store (deadpool-postgres, rustls)
//! - [`common`]: shared TLS setup

pub mod common;
pub mod postgres;
pub mod sqlite;

pub use common::{SslMode, TlsBuilder};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
