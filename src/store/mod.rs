//! User store — the per-user ledger and the map from user identity to it.
//!
//! Everything lives in memory; a restart forgets every profile. The
//! `UserStore` trait is the seam for a persistent backend.

pub mod memory;
pub mod model;
pub mod traits;

pub use memory::InMemoryUserStore;
pub use model::{DailyLedger, Gender, Profile, UserId, UserRecord};
pub use traits::UserStore;
