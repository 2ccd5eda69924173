//! Output file naming.
//!
//! The unlocked copy is a sibling of the source: the marker goes in front of
//! the first `.pdf` of the file name (`report.pdf` becomes
//! `report [Unlocked].pdf`). Only the final path component is inspected, so a
//! directory such as `/scans.pdf.d/` is left alone. A name without `.pdf`
//! gets `<marker>.pdf` appended.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const EXTENSION: &str = ".pdf";

/// Derive the path of the unlocked copy for `source`.
///
/// The match is ASCII case-insensitive and keeps the original casing, so
/// `SCAN.PDF` becomes `SCAN [Unlocked].PDF`.
pub fn unlocked_path(source: &Path, marker: &str) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| Error::InvalidPath(source.to_path_buf()))?;

    let new_name = file_name.to_str().map_or_else(
        || {
            let mut name = file_name.to_os_string();
            name.push(marker);
            name.push(EXTENSION);
            name
        },
        |name| OsString::from(insert_marker(name, marker)),
    );

    Ok(source.with_file_name(new_name))
}

fn insert_marker(name: &str, marker: &str) -> String {
    // ASCII lowercasing keeps byte offsets intact
    match name.to_ascii_lowercase().find(EXTENSION) {
        Some(idx) => format!("{}{}{}", &name[..idx], marker, &name[idx..]),
        None => format!("{name}{marker}{EXTENSION}"),
    }
}
