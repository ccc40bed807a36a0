pub mod memory;
pub mod traits;

#[cfg(feature = "sqlx-postgres")]
pub mod postgres;

pub use memory::MemoryStore;
pub use traits::{IdentityRegistry, ProfileStore, VerificationStore};

#[cfg(feature = "sqlx-postgres")]
pub use postgres::PgStore;
