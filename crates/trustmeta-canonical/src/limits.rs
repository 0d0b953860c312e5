/// Default maximum container nesting accepted by the encoder.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum canonical output size (64 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Resource bounds applied before any canonical bytes are produced.
///
/// Metadata can reach the encoder straight from an untrusted mirror, before
/// any role shape has been checked, so both the nesting depth and the total
/// output size are bounded. Depth counts containers: a scalar at the root has
/// depth 0, `[]` has depth 1, `[[1]]` has depth 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeLimits {
    /// Maximum container nesting.
    pub max_depth: usize,
    /// Maximum number of canonical bytes.
    pub max_output_bytes: usize,
}

impl EncodeLimits {
    /// Limits that only stop at `usize::MAX`; reserve for trusted, locally built values.
    pub fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_output_bytes: usize::MAX,
        }
    }

    /// Overrides the depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Overrides the output size bound.
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }
}

impl Default for EncodeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}
