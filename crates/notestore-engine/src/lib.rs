//! Save engines and the factory that owns the active one.
//!
//! The rest of the application reads the active engine through
//! [`SaveEngineFactory::current`]; the factory is the only place that can
//! replace it.

mod engine;
mod error;
mod factory;
mod file_engine;
mod state;

pub use engine::{DocumentState, SaveEngine, SaveReport};
pub use error::EngineError;
pub use factory::{
    EngineReplaced, EngineReplacedListener, ReplaceReason, SaveEngineBuilder, SaveEngineFactory,
};
pub use file_engine::{FileSaveEngine, FileSaveEngineBuilder};
pub use state::SaveEngineState;

pub type Result<T> = std::result::Result<T, EngineError>;
