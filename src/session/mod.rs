// Public API - what other modules can use
pub use commands::SessionCommand;
pub use errors::SessionError;
pub use handle::SessionHandle;
pub use orchestrator::SessionOrchestrator;

// Internal modules
mod commands;
mod errors;
mod handle;
mod orchestrator;
