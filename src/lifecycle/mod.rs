//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → token cancelled → in-flight attempt or retry wait aborts
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
