//! Shared synchronization and collection types.

pub use parking_lot::{Mutex, MutexGuard, RwLock};

pub use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

pub use hashbrown::HashMap;
