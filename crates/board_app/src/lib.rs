//! StudioBoard app shell: session bootstrap, effect execution and the
//! headless update loop.
pub mod app;
pub mod effects;
pub mod logging;
pub mod session_store;
