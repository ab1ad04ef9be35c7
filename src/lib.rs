pub mod auth;
pub mod errors;
pub mod events;
pub mod game;
pub mod utils;

pub use errors::{ErrorKind, LauncherError, Result};
pub use events::{EventHandler, LauncherEvent};
