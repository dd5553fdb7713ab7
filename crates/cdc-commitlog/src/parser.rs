//! The capability surface of the external commit-log reader library.
//!
//! Treats the database's own commit-log parser as an external collaborator
//! whose callback contract is specified here but whose parser internals are
//! not. This module is that contract only — there is no implementation in
//! this crate, only the trait the Reader drives and a test double
//! ([`FakeParser`], behind `#[cfg(test)]`) that builds in-memory fixtures
//! rather than touching disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::filename::extract_segment_id;

/// Identifies the segment file a mutation was read from, passed to
/// [`MutationHandler::on_mutation`] alongside each mutation.
#[derive(Debug, Clone)]
pub struct SegmentDescriptor {
    pub file_name: PathBuf,
}

impl SegmentDescriptor {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// The segment id encoded in [`Self::file_name`].
    pub fn segment_id(&self) -> u64 {
        extract_segment_id(&self.file_name).unwrap_or(0)
    }
}

/// `PermissibleParseError` vs `NonPermissibleParseError`.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Parser-signaled recoverable error: log and continue the segment.
    #[error("permissible parse error: {0}")]
    Permissible(String),
    /// Parser-signaled fatal error for this segment: the segment is *not*
    /// skipped silently — it is surfaced so the Reader can fail the segment
    /// (Transfer Policy moves it to the error folder).
    #[error("non-permissible parse error: {0}")]
    NonPermissible(String),
}

/// Invoked by [`SegmentParser::read_segment`] once per mutation it decodes.
///
/// Implemented by the Mutation Extractor (`cdc-extract`), generically over
/// whatever raw mutation type `P::Mutation` the parser produces. Returns
/// `Err` for a handler-side failure that must fail the whole segment
/// (`PartitionKeyDecodeError`: throw, segment fails) — `read_segment`
/// implementations are expected to stop on the first `Err` and surface it as
/// [`ParseError::NonPermissible`].
pub trait MutationHandler<M> {
    /// `entry_location` is the byte position of this mutation within the
    /// segment, used together with the segment id to form a
    /// `CommitLogPosition` for the skip filter.
    fn on_mutation(
        &mut self,
        mutation: M,
        entry_location: i32,
        descriptor: &SegmentDescriptor,
    ) -> Result<(), HandlerError>;
}

/// A handler-side failure severe enough to fail the whole segment, e.g. a
/// malformed composite partition key (`PartitionKeyDecodeError`).
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// The external commit-log reader library's contract:
/// drive a parse of one segment, invoking `handler` for every mutation
/// decoded, and reporting permissible errors inline (logged by the Reader,
/// segment continues) vs. propagating non-permissible ones (segment fails).
pub trait SegmentParser {
    type Mutation;

    fn read_segment<H: MutationHandler<Self::Mutation>>(
        &self,
        path: &Path,
        descriptor: &SegmentDescriptor,
        handler: &mut H,
    ) -> Result<(), ParseError>;
}

/// A production default for [`SegmentParser`] until a real deployment links
/// the database's own commit-log reader crate. Fails every segment as
/// non-permissible so a misconfigured deployment surfaces loudly instead of
/// silently discarding segments.
///
/// Generic over the mutation type so it type-checks against any
/// `MutationHandler` (e.g. the Extractor's `RawMutation<M>`) without ever
/// constructing one — `read_segment` always returns before touching
/// `Self::Mutation`.
pub struct UnimplementedParser<M>(std::marker::PhantomData<fn() -> M>);

impl<M> Default for UnimplementedParser<M> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<M> Clone for UnimplementedParser<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for UnimplementedParser<M> {}

impl<M> std::fmt::Debug for UnimplementedParser<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnimplementedParser").finish()
    }
}

impl<M> UnimplementedParser<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> SegmentParser for UnimplementedParser<M> {
    type Mutation = M;

    fn read_segment<H: MutationHandler<Self::Mutation>>(
        &self,
        _path: &Path,
        _descriptor: &SegmentDescriptor,
        _handler: &mut H,
    ) -> Result<(), ParseError> {
        Err(ParseError::NonPermissible(
            "no SegmentParser configured: link the source database's commit-log reader crate".to_string(),
        ))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// A scripted in-memory stand-in for the external parser: yields a
    /// fixed sequence of mutations (and optionally a trailing error) for a
    /// given segment path, without touching the filesystem.
    ///
    /// Builds fixtures in memory rather than writing real segment files.
    pub struct FakeParser<M> {
        scripts: RefCell<std::collections::HashMap<PathBuf, Script<M>>>,
    }

    pub struct Script<M> {
        pub mutations: Vec<(M, i32)>,
        pub trailing_error: Option<ParseError>,
    }

    impl<M> Default for FakeParser<M> {
        fn default() -> Self {
            Self {
                scripts: RefCell::new(std::collections::HashMap::new()),
            }
        }
    }

    impl<M> FakeParser<M> {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(&self, path: impl Into<PathBuf>, script: Script<M>) {
            self.scripts.borrow_mut().insert(path.into(), script);
        }
    }

    impl<M: Clone> SegmentParser for FakeParser<M> {
        type Mutation = M;

        fn read_segment<H: MutationHandler<M>>(
            &self,
            path: &Path,
            descriptor: &SegmentDescriptor,
            handler: &mut H,
        ) -> Result<(), ParseError> {
            let scripts = self.scripts.borrow();
            let Some(script) = scripts.get(path) else {
                return Ok(());
            };
            for (mutation, entry_location) in &script.mutations {
                if let Err(e) = handler.on_mutation(mutation.clone(), *entry_location, descriptor) {
                    return Err(ParseError::NonPermissible(e.0));
                }
            }
            if let Some(err) = &script.trailing_error {
                return Err(match err {
                    ParseError::Permissible(m) => ParseError::Permissible(m.clone()),
                    ParseError::NonPermissible(m) => ParseError::NonPermissible(m.clone()),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanicHandler;

    impl MutationHandler<u32> for PanicHandler {
        fn on_mutation(&mut self, _mutation: u32, _entry_location: i32, _descriptor: &SegmentDescriptor) -> Result<(), HandlerError> {
            panic!("UnimplementedParser must never invoke the handler");
        }
    }

    #[test]
    fn unimplemented_parser_fails_non_permissibly_without_calling_the_handler() {
        let parser = UnimplementedParser::<u32>::new();
        let descriptor = SegmentDescriptor::new("CommitLog-7-1.log");
        let err = parser.read_segment(Path::new("CommitLog-7-1.log"), &descriptor, &mut PanicHandler).unwrap_err();
        assert!(matches!(err, ParseError::NonPermissible(_)));
    }
}
