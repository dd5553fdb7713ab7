//! Commit-Log Utilities: filename↔segment-id parsing, ordered
//! directory listing, and the total order used to sequence segments and
//! their `_cdc.idx` sidecars.
//!
//! Segment filenames follow the source database's convention
//! `CommitLog-<version>-<segmentId>.log`, with an optional near-real-time
//! sidecar `<segmentId>_cdc.idx`.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Which of the two filename conventions a segment file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentFileKind {
    /// `CommitLog-<version>-<segmentId>.log`
    Log,
    /// `<segmentId>_cdc.idx` — sorts after `.log` for the same segment id,
    /// ties broken by suffix (`.log` < `_cdc.idx`).
    CdcIndex,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} does not match CommitLog-<version>-<segmentId>.log or <segmentId>_cdc.idx")]
pub struct ParseFilenameError(String);

/// Deterministically extract the segment id from a filename, ignoring any
/// leading directory components.
pub fn extract_segment_id(filename: &Path) -> Result<u64, ParseFilenameError> {
    classify(filename).map(|(id, _)| id)
}

/// Parse `filename` into its segment id and [`SegmentFileKind`].
pub fn classify(filename: &Path) -> Result<(u64, SegmentFileKind), ParseFilenameError> {
    let name = filename
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ParseFilenameError(filename.display().to_string()))?;

    let fail = || ParseFilenameError(name.to_string());

    if let Some(rest) = name.strip_suffix("_cdc.idx") {
        let segment_id = rest.parse::<u64>().map_err(|_| fail())?;
        return Ok((segment_id, SegmentFileKind::CdcIndex));
    }

    if let Some(rest) = name.strip_prefix("CommitLog-").and_then(|r| r.strip_suffix(".log")) {
        let (_version, segment_id) = rest.split_once('-').ok_or_else(fail)?;
        let segment_id = segment_id.parse::<u64>().map_err(|_| fail())?;
        return Ok((segment_id, SegmentFileKind::Log));
    }

    Err(fail())
}

/// Total order over segment file paths: by extracted segment id ascending,
/// ties broken by [`SegmentFileKind`] (`.log` before `_cdc.idx`).
///
/// Paths that fail to parse sort after all valid ones and are ordered
/// amongst themselves by raw path, so [`list_segments`] can still make
/// forward progress in a directory containing stray files.
pub fn compare(a: &Path, b: &Path) -> Ordering {
    match (classify(a), classify(b)) {
        (Ok((id_a, kind_a)), Ok((id_b, kind_b))) => id_a.cmp(&id_b).then_with(|| kind_a.cmp(&kind_b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Build a `CommitLog-<version>-<segmentId>.log` filename.
pub fn build_segment_filename(version: u32, segment_id: u64) -> String {
    format!("CommitLog-{version}-{segment_id}.log")
}

/// Build a `<segmentId>_cdc.idx` sidecar filename.
pub fn build_cdc_index_filename(segment_id: u64) -> String {
    format!("{segment_id}_cdc.idx")
}

/// List every recognizable segment/sidecar file directly inside `dir`,
/// sorted ascending per [`compare`]. Unparseable entries are skipped
/// entirely (they are not commit-log files at all, e.g. a stray `.tmp`).
///
/// Returns an empty vector for an empty or nonexistent directory, so that an
/// empty working directory on startup lets the Detector complete its backlog
/// scan without error.
pub fn list_segments(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| classify(path).is_ok())
        .collect();
    paths.sort_by(|a, b| compare(a, b));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_segment_id_from_log_filename() {
        assert_eq!(
            extract_segment_id(Path::new("CommitLog-7-1234567890.log")).unwrap(),
            1234567890
        );
    }

    #[test]
    fn extracts_segment_id_from_cdc_index_filename() {
        assert_eq!(extract_segment_id(Path::new("1234567890_cdc.idx")).unwrap(), 1234567890);
    }

    #[test]
    fn rejects_unrelated_filenames() {
        assert!(extract_segment_id(Path::new("readme.txt")).is_err());
        assert!(extract_segment_id(Path::new("CommitLog-7.log")).is_err());
    }

    #[test]
    fn compare_orders_by_segment_id_then_log_before_idx() {
        let a = Path::new("CommitLog-7-1.log");
        let b = Path::new("CommitLog-7-2.log");
        let c = Path::new("1_cdc.idx");
        assert_eq!(compare(a, b), Ordering::Less);
        assert_eq!(compare(a, c), Ordering::Less); // same segment, .log < _cdc.idx
        assert_eq!(compare(c, a), Ordering::Greater);
    }

    #[test]
    fn list_segments_empty_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(list_segments(tmp.path()).unwrap(), Vec::<PathBuf>::new());
    }

    #[test]
    fn list_segments_nonexistent_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        assert_eq!(list_segments(&missing).unwrap(), Vec::<PathBuf>::new());
    }

    #[test]
    fn list_segments_sorts_and_skips_junk() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["CommitLog-7-3.log", "CommitLog-7-1.log", "CommitLog-7-2.log", "notes.txt"] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }
        let listed = list_segments(tmp.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["CommitLog-7-1.log", "CommitLog-7-2.log", "CommitLog-7-3.log"]);
    }

    proptest! {
        #[test]
        fn segment_id_round_trips_through_log_filename(version in 1u32..20, id in 0u64..u64::MAX) {
            let name = build_segment_filename(version, id);
            prop_assert_eq!(extract_segment_id(Path::new(&name)).unwrap(), id);
        }

        #[test]
        fn segment_id_round_trips_through_cdc_index_filename(id in 0u64..u64::MAX) {
            let name = build_cdc_index_filename(id);
            prop_assert_eq!(extract_segment_id(Path::new(&name)).unwrap(), id);
        }
    }
}
