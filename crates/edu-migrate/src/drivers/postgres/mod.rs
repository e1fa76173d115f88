//! PostgreSQL store (the hosted target).
//!
//! Uses deadpool-postgres over tokio-postgres with rustls TLS. Parameters are
//! boxed by value type and every placeholder carries a matching cast (see
//! [`Dialect::placeholder`](crate::dialect::Dialect::placeholder)).

mod store;

pub use store::PostgresStore;
