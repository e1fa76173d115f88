//! Utilities shared by the store drivers.

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
