//! Error and diagnostic types.
//!
//! Parse failures that make the rest of the file unreadable return `Err`.
//! Conditions that are recoverable for the file as a whole (an unresolved
//! connection, a typed accessor used on the wrong property tag) are
//! collected into a [`DiagnosticSink`] instead of aborting the read.

use thiserror::Error;

use crate::animation::AnimationKind;

/// Fatal error returned by a read or write operation.
#[derive(Debug, Error)]
pub enum FbxError {
    #[error("not an FBX binary file (bad magic)")]
    BadMagic,
    #[error("unsupported FBX version {0} (max supported {1})")]
    UnsupportedVersion(u32, u32),
    #[error("truncated stream: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unrecognized property type tag {0:#04x}")]
    BadPropertyTag(u8),
    #[error("decompressed array length mismatch: expected {expected} bytes, got {got}")]
    DecompressMismatch { expected: usize, got: usize },
    #[error("node size invariant violated: computed {computed}, declared end_offset {declared}")]
    SizeInvariantViolated { computed: u64, declared: u64 },
    #[error("deformation vertex count mismatch: {expected} expected, {got} given")]
    CountMismatch { expected: usize, got: usize },
    #[error("remap failed: target \"{0}\" has no unique match")]
    RemapFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FbxError>;

/// A non-fatal condition surfaced to the caller instead of aborting a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A `Connections` entry referenced an object id that does not exist.
    BadConnection { id: u64 },
    /// A typed property accessor was used on a property of a different tag.
    TypeMismatch { node: String, expected: &'static str },
    /// `AnimationCurveNode::apply_animation` had no target, an unresolvable
    /// target, or a kind/target type mismatch, so it no-op'd.
    AnimationApplyNoOp { kind: AnimationKind },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::BadConnection { id } => write!(f, "connection references unknown object id {id}"),
            Diagnostic::TypeMismatch { node, expected } => {
                write!(f, "property of node \"{node}\" accessed as {expected} but tag does not match")
            }
            Diagnostic::AnimationApplyNoOp { kind } => {
                write!(f, "animation curve node of kind {kind:?} did not apply: no resolvable matching target")
            }
        }
    }
}

/// Accumulates [`Diagnostic`]s during a read. Every push is also emitted as
/// a `tracing::warn!` event so a caller gets ambient visibility without
/// inspecting the sink.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, d: Diagnostic) {
        tracing::warn!(%d, "fbx diagnostic");
        self.entries.push(d);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
