//! Database layer.
//!
//! Services talk to a [`DocumentStore`]; [`FirestoreStore`] is the
//! production backend and [`MemoryStore`] the in-process one.

pub mod firestore;
pub mod memory;
pub mod query;
pub mod store;
pub mod subscription;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use query::{Direction, Filter, FilterOp, Query};
pub use store::{
    DocumentStore, DocumentWrite, FieldUpdate, Precondition, Revision, Snapshot, StoredDocument,
};
pub use subscription::Subscription;

/// Collection names as constants.
pub mod collections {
    pub const EXERCISES: &str = "exercises";
    pub const SETS: &str = "sets";
    pub const SESSIONS: &str = "sessions";
    pub const ROUTINES: &str = "routines";
}
