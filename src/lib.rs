pub mod config;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod metadata;
pub mod services;
pub mod source;

pub use config::EngineerConfig;
pub use engine::Engine;
pub use error::{PitwallError, Result};
pub use kernel::reactor::Reactor;
