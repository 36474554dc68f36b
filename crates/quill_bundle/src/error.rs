//! Structural engine errors.
//!
//! Problems in the resources themselves are diagnostics on the
//! [`ChildRun`](crate::ChildRun); these errors mean a plugin used the engine
//! incorrectly.

use crate::compilation::HookSurface;

/// Errors raised by the engine API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A plugin tapped a hook surface this engine version does not provide.
    #[error("plugin '{plugin}' tapped the {surface} hook, which engine v{major} does not provide")]
    HookUnavailable {
        /// Name the plugin tapped with.
        plugin: String,
        /// The requested surface.
        surface: HookSurface,
        /// The engine's major version.
        major: u32,
    },

    /// A plugin emitted an asset under a name that is already taken.
    #[error("asset '{name}' was already emitted")]
    AssetConflict {
        /// The conflicting asset name.
        name: String,
    },
}
