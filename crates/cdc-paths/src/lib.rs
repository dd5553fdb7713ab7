//! Typed paths for the directories the producer reads from and writes to.
//!
//! Mirrors the newtype-per-directory convention used throughout the host
//! database's own path crate: each directory kind is its own tuple struct
//! wrapping a [`PathBuf`], constructible only from a known root or via
//! [`FromPathUnchecked`] for callers (e.g. tests) that already have a path.

use std::fmt;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Constructs a typed path wrapper from a path whose validity is not
/// otherwise checked. Used by tests and by callers that already know a
/// path is of the right kind (e.g. one just read from a config file).
pub trait FromPathUnchecked {
    fn from_path_unchecked(path: impl Into<PathBuf>) -> Self;
}

macro_rules! typed_dir {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub PathBuf);

        impl $name {
            /// Create this directory (and any missing parents) if it does not exist.
            pub fn create(&self) -> io::Result<()> {
                std::fs::create_dir_all(&self.0)
            }
        }

        impl FromPathUnchecked for $name {
            fn from_path_unchecked(path: impl Into<PathBuf>) -> Self {
                Self(path.into())
            }
        }

        impl Deref for $name {
            type Target = Path;
            fn deref(&self) -> &Path {
                &self.0
            }
        }

        impl AsRef<Path> for $name {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.display())
            }
        }
    };
}

typed_dir!(
    /// The directory the source database writes commit-log segments and
    /// `_cdc.idx` sidecars into. Owned by the database; the producer only reads.
    CdcDir
);

typed_dir!(
    /// `cdcWorkingDir`: the root under which `archives/` and
    /// `errors/` live.
    WorkingRoot
);

typed_dir!(
    /// Segments moved here by [`onSuccessTransfer`](crate) after a full,
    /// successful read.
    ArchiveDir
);

typed_dir!(
    /// Segments moved here by `onErrorTransfer` after a non-permissible
    /// parse error. Reprocessed by [`recycleErrorCommitLogFiles`] when
    /// `errorCommitLogReprocessEnabled` is set.
    ErrorDir
);

impl WorkingRoot {
    pub fn archives(&self) -> ArchiveDir {
        ArchiveDir(self.0.join("archives"))
    }

    pub fn errors(&self) -> ErrorDir {
        ErrorDir(self.0.join("errors"))
    }
}
