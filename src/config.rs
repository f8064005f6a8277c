//! Read/write tuning knobs.
//!
//! Grounded on `R-Hidayatullah-tosmole`'s options-struct pattern for loader
//! configuration, adapted to this crate's read/write split.

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Reject files whose header version exceeds this.
    pub max_version: u32,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { max_version: 7700 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub version: u32,
    /// When set, skin weights are truncated to a fixed joint count per
    /// vertex on write instead of the variable-length CSR form.
    pub fixed_joint_count: Option<u32>,
    /// Reproduce the original's animation-stack stop-time bug (minimum
    /// instead of maximum last-key time) instead of the corrected default.
    pub legacy_stop_bug: bool,
    /// Compress array properties with deflate instead of writing them raw.
    pub compress_arrays: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: 7700,
            fixed_joint_count: None,
            legacy_stop_bug: false,
            compress_arrays: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        assert_eq!(ReadOptions::default().max_version, 7700);
        let w = WriteOptions::default();
        assert_eq!(w.version, 7700);
        assert!(w.fixed_joint_count.is_none());
        assert!(!w.legacy_stop_bug);
        assert!(w.compress_arrays);
    }
}
