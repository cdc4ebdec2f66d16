//! `tacklebox-infra` — stateful collaborators behind the domain crates.
//!
//! In-memory stores with the locking contract a row-transactional database
//! would give: an outer `RwLock` map for structure, an `Arc<Mutex<_>>` per
//! row so operations against *different* entities never block each other
//! while same-entity operations serialize.

pub mod audit_sink;
pub mod credential_store;
pub mod login;
pub mod product_store;
pub mod sale_store;

pub use audit_sink::BusinessMutationSink;
pub use credential_store::InMemoryCredentialStore;
pub use login::{LoginError, LoginOutcome, LoginService};
pub use product_store::InMemoryProductStore;
pub use sale_store::InMemorySaleStore;
