//! Configuration management for CursorKit
//!
//! Provides limit presets for different host classes
//! and validation for custom configurations.

/// Store configuration with host-class presets
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum serialized size of a single record (bytes)
    pub max_value_size: usize,
    /// Maximum nesting depth of array keys
    pub max_key_depth: usize,
    /// Largest step count a store cursor's `advance` accepts; larger counts
    /// are refused with `TypeError`. Only the store's own cursors check it.
    pub max_advance_count: u32,
    /// Dispatches `EventLoop::run` performs before giving up on a future
    pub max_loop_turns: usize,
    /// Emit a trace event for every dispatched task
    pub trace_dispatch: bool,
}

impl Config {
    /// Desktop-class host: generous limits
    pub fn desktop() -> Self {
        Self {
            max_value_size: 64 * 1024 * 1024,
            max_key_depth: 32,
            max_advance_count: u32::MAX,
            max_loop_turns: 10_000_000,
            trace_dispatch: false,
        }
    }

    /// Mobile-class host
    pub fn mobile() -> Self {
        Self {
            max_value_size: 16 * 1024 * 1024,
            max_key_depth: 16,
            max_advance_count: 1 << 24,
            max_loop_turns: 1_000_000,
            trace_dispatch: false,
        }
    }

    /// Embedded host: tight limits, suited to tests that want stalls surfaced fast
    pub fn embedded() -> Self {
        Self {
            max_value_size: 1024 * 1024,
            max_key_depth: 8,
            max_advance_count: 1 << 16,
            max_loop_turns: 100_000,
            trace_dispatch: true,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_value_size == 0 {
            return Err("max_value_size must be > 0".into());
        }
        if self.max_key_depth == 0 || self.max_key_depth > 256 {
            return Err("max_key_depth must be in [1, 256]".into());
        }
        if self.max_advance_count == 0 {
            return Err("max_advance_count must be > 0".into());
        }
        if self.max_loop_turns == 0 {
            return Err("max_loop_turns must be > 0".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::desktop() }
}
