//! Persistence primitives
//!
//! This module provides the raw key-value medium the stores persist into,
//! behind a single trait so backends can be swapped freely.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          KeyValueStorage trait          │
//! │   (get / set / remove a raw string)     │
//! └──────────────┬──────────────────────────┘
//!                │
//!        ┌───────┴────────┐
//!        │                │
//! ┌──────▼──────┐  ┌──────▼──────┐
//! │MemoryStorage│  │ FileStorage │
//! │             │  │             │
//! │- in-process │  │- JSON file  │
//! │- quota      │  │- durable    │
//! └─────────────┘  └─────────────┘
//! ```

pub mod factory;
pub mod file;
pub mod memory;
pub mod traits;

// Re-export main types
pub use factory::StorageFactory;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;
