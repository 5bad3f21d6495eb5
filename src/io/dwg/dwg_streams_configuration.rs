//! Configuration for locating DWG object streams.

/// Options applied while partitioning a buffer into its streams.
#[derive(Debug, Clone)]
pub struct DwgStreamsConfiguration {
    /// Reject top-level buffers whose string stream flag is clear.
    /// Default: `false`.
    ///
    /// Every R2007+ top-level section carries a string stream, so a clear
    /// flag there usually means the size header points at the wrong bit.
    /// Objects embedded in the objects section may legitimately have no
    /// string stream and are never checked.
    pub require_string_stream: bool,
}

impl Default for DwgStreamsConfiguration {
    fn default() -> Self {
        Self {
            require_string_stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DwgStreamsConfiguration::default();
        assert!(!cfg.require_string_stream);
    }
}
