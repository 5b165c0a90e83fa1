// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod goal;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod runtime;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod ui;
pub mod view;

pub use error::{FocusError, Result};
