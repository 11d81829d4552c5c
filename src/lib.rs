//! In-memory CURVE certificate store with disk-backed refresh.
//!
//! A [`CertStore`] maps Z85-encoded public keys to [`Certificate`]s. It can
//! be backed by a directory of certificate files, in which case every
//! lookup re-checks the directory and rebuilds the index when something
//! changed, or run as a pure-memory store populated through
//! [`CertStore::insert`].
//!
//! All operations are synchronous and the store carries no internal
//! locking; share it across threads behind your own `Mutex`/`RwLock`.

#[macro_use]
extern crate tracing;

mod cert;
mod configs;
mod error;
mod store;
pub mod z85;

pub use cert::{Certificate, PublicKey, SecretKey, KEY_SIZE};
pub use configs::GlobalConfig;
pub use error::{AppError, AppResult, ErrorReason};
pub use store::{CertStore, StoreStats};
pub use z85::Z85Error;
