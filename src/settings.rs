//! Knobs that the shell (CLI parsing lives outside this crate) passes into the core.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings consumed by the compiler core. Parsing these out of `argv` or a config file is the
/// caller's job; the core only reads the resulting struct.
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    /// Allow the incoming-traffic configurator (§4.F) to use `SetMED` actions.
    pub use_med: bool,
    /// Allow the incoming-traffic configurator (§4.F) to use `PrependPath` actions.
    pub use_prepending: bool,
    /// Allow tagging a peer with `SetCommunity("no-export")` to realize `Nothing(locator)`.
    pub use_no_export: bool,
    /// Whether §4.F's enter-traffic classification runs at all. Disabling it skips
    /// `UncontrollableEnter`/`UncontrollablePeerPreference` checks entirely (the operator accepts
    /// whatever the peer sends).
    pub check_enter: bool,
    /// Directory debug artifacts (PG dumps, DFA diagrams, ...) would be written to, if a
    /// [`DebugHook`] that does so is registered. The core never opens a file itself; rendering
    /// and on-disk logging are declared external collaborators.
    pub debug_dir: Option<PathBuf>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            use_med: true,
            use_prepending: true,
            use_no_export: true,
            check_enter: true,
            debug_dir: None,
        }
    }
}

/// A checkpoint hook the core calls at prescribed points in the pipeline (after DFA construction,
/// after raw PG construction, after minimization, ...). The default is a no-op; a caller that
/// wants PNG/graphviz dumps or a debug log file registers its own implementation. This is the
/// seam through which the declared-out-of-scope "debug PNG dumps" and "on-disk logging" plug in
/// without the core depending on either.
pub trait DebugHook: fmt::Debug + Send + Sync {
    /// Called with a checkpoint name (e.g. `"raw_pg"`, `"minimized_pg"`) and a human-readable
    /// payload describing the current state.
    fn on_checkpoint(&self, _checkpoint: &str, _payload: &str) {}
}

/// The default [`DebugHook`]: does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebugHook;

impl DebugHook for NoopDebugHook {}

/// Shared handle to a [`DebugHook`], cheap to clone across worker threads.
pub type DebugHookRef = Arc<dyn DebugHook>;

/// Returns a [`DebugHookRef`] wrapping [`NoopDebugHook`].
pub fn noop_debug_hook() -> DebugHookRef {
    Arc::new(NoopDebugHook)
}
