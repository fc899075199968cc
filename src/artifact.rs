//! Artifact Boundary Module
//!
//! The cache stores raw bytes on disk and a decoded representation in
//! memory. [`Artifact`] is the seam between the two: it is the only place
//! where the engine interprets payload contents.

// == Artifact Trait ==
/// A value the memory tier can hold.
///
/// Implementors define how raw cached bytes become the in-memory value and
/// how much that value weighs against the memory tier's cost limit.
pub trait Artifact: Clone + Send + Sync + 'static {
    /// Builds the in-memory representation from raw cached bytes.
    ///
    /// Returns `None` when the bytes cannot be interpreted as this artifact
    /// type; the caller reports that as a decode failure for the key.
    fn decode(bytes: &[u8]) -> Option<Self>;

    /// Approximate in-memory size in bytes, charged against the memory
    /// tier's aggregate cost limit.
    fn cost(&self) -> usize;
}

/// Opaque byte payloads. Decoding never fails.
impl Artifact for Vec<u8> {
    fn decode(bytes: &[u8]) -> Option<Self> {
        Some(bytes.to_vec())
    }

    fn cost(&self) -> usize {
        self.len()
    }
}

/// UTF-8 text payloads. Decoding fails on invalid UTF-8.
impl Artifact for String {
    fn decode(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().map(|s| s.to_owned())
    }

    fn cost(&self) -> usize {
        self.len()
    }
}
