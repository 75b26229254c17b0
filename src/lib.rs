// Library surface for the binary and for headless/integration tests.
// UI types stay in main.rs.
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod store;
pub mod timer;

pub use session::{Phase, SessionController, SessionEvent, Snapshot};
