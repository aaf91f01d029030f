//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```ignore
//! use simpsave::prelude::*;
//!
//! let store = SimpSave::new(Config::default());
//! store.write("tags", &Value::set(["a", "b"].map(Value::from)), Some("tags.yml"))?;
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Values
pub use crate::value::{TypeTag, Value};

// Facade and configuration
pub use crate::config::Config;
pub use crate::store::SimpSave;

// Engines
pub use crate::engine::{StorageEngine, Target};
pub use crate::registry::EngineRegistry;
