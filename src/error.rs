//! Typed errors for expected failure modes.
//!
//! These are carried inside `anyhow::Error` and can be recovered with
//! `err.downcast_ref::<PackageError>()` when a caller needs to distinguish
//! a malformed expression from a damaged archive.

/// Failure modes that callers may want to react to individually.
#[derive(Debug)]
pub enum PackageError {
    /// Malformed version or dependency expression text. Caller input,
    /// never retried.
    Format(String),
    /// The archive container cannot be read, or it carries no metadata
    /// document entry.
    CorruptArchive(String),
    /// An on-disk layout has no metadata document at its root.
    MetadataMissing(String),
    /// No entry in the source satisfies the requested dependency.
    /// Expected and non-fatal; `get` reports this as `None` instead.
    PackageNotFound(String),
}

impl std::fmt::Display for PackageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageError::Format(msg) => {
                write!(f, "Invalid format: {}", msg)
            }
            PackageError::CorruptArchive(msg) => {
                write!(f, "Corrupt archive: {}", msg)
            }
            PackageError::MetadataMissing(msg) => {
                write!(f, "No metadata document found: {}", msg)
            }
            PackageError::PackageNotFound(msg) => {
                write!(f, "Package not found: {}", msg)
            }
        }
    }
}

impl std::error::Error for PackageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PackageError::Format("bad version '1.x'".to_string());
        assert_eq!(err.to_string(), "Invalid format: bad version '1.x'");

        let err = PackageError::PackageNotFound("NUnit 9.9".to_string());
        assert_eq!(err.to_string(), "Package not found: NUnit 9.9");
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = PackageError::CorruptArchive("truncated".to_string()).into();
        assert!(err.downcast_ref::<PackageError>().is_some());
    }
}
