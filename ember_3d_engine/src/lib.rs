/*!
# Ember 3D Engine

Core types for the Ember 3D rendering scaffold.

This crate provides the backend-agnostic pieces shared by the renderer
crate and applications: error types, the logging system and the engine
singleton that owns the global logger. The Vulkan layer lives in
`ember_3d_engine_renderer_vulkan`; demo applications build on both.
*/

// Internal modules
mod error;
mod engine;
pub mod log;

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod log_tests;

// Main ember3d namespace module
pub mod ember3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }
}

// Re-export math library at crate root
pub use glam;
