// Public API - what other modules can use
pub use registry::{ConnectionEntry, ConnectionId, ConnectionRegistry};

// Internal modules
mod registry;
