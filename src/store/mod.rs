//! Persistent store framework
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ StoreRegistry (one instance per key)       │
//! └──────────────┬─────────────────────────────┘
//!                │
//!    ┌───────────┼───────────────┐
//!    ▼           ▼               ▼
//! ScalarStore  SetStore       MapStore
//!    └───────────┼───────────────┘
//!                ▼
//!        StoreCore<C: StoreCollection>
//!                │
//!                ▼
//!   adapter::{read_validated, write_validated}
//!                │
//!                ▼
//!       dyn KeyValueStorage
//! ```

pub mod core;
pub mod map;
pub mod merge;
pub mod registry;
pub mod scalar;
pub mod set;

pub use self::core::{Hydrate, StoreCollection, StoreCore};
pub use map::MapStore;
pub use merge::merge_deep_right;
pub use registry::{StoreContext, StoreKey, StoreRegistry};
pub use scalar::{ScalarStore, StoreValue};
pub use set::SetStore;
