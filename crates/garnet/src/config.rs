//! Machine configuration

use std::path::PathBuf;

/// Where `puts`, `print` and `p` write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Write straight to the process stdout
    #[default]
    Stdout,
    /// Collect into an in-memory buffer, drained with `Machine::take_output`
    Capture,
}

/// How the default native type-access policy decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Every registered native type is reachable
    #[default]
    AllowAll,
    /// No native type is reachable
    DenyAll,
    /// Only types whose qualified name matches an allow-list prefix
    AllowList,
}

/// Configuration for a [`Machine`](crate::Machine).
///
/// Controls recursion limits, output routing, `require` search paths and
/// native type access.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Maximum method/block call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Output routing for the printing builtins
    pub output: OutputMode,

    /// Directories searched by `require 'name'` for `name.rb`
    pub require_paths: Vec<PathBuf>,

    /// Native access mode for the default policy
    pub access_mode: AccessMode,

    /// Qualified-name prefixes allowed in [`AccessMode::AllowList`]
    pub allowed_types: Vec<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            output: OutputMode::Stdout,
            require_paths: Vec::new(),
            access_mode: AccessMode::AllowAll,
            allowed_types: Vec::new(),
        }
    }
}

impl MachineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom call depth limit.
    pub fn with_max_call_depth(mut self, max_depth: usize) -> Self {
        self.max_call_depth = max_depth;
        self
    }

    /// Capture output instead of writing to stdout.
    pub fn with_captured_output(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Add a directory to the `require` search path.
    pub fn with_require_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.require_paths.push(path.into());
        self
    }

    /// Choose the native access mode.
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Allow native types under the given qualified-name prefix. Switches
    /// the access mode to [`AccessMode::AllowList`].
    pub fn allow_type(mut self, prefix: impl Into<String>) -> Self {
        self.access_mode = AccessMode::AllowList;
        self.allowed_types.push(prefix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::new();
        assert_eq!(config.max_call_depth, 1000);
        assert_eq!(config.output, OutputMode::Stdout);
        assert_eq!(config.access_mode, AccessMode::AllowAll);
    }

    #[test]
    fn test_allow_type_switches_mode() {
        let config = MachineConfig::new().allow_type("Host::Text");
        assert_eq!(config.access_mode, AccessMode::AllowList);
        assert_eq!(config.allowed_types, vec!["Host::Text".to_string()]);
    }
}
