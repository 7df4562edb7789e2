//! Filesystem helpers, only compiled under the `std` feature (spec.md §6
//! "Environment and filesystem (if the driver wraps a CLI)"). Grounded on
//! `zoneinfo_rs::ZoneInfoCompiler::{from_zoneinfo_directory, from_filepath}`:
//! same "read every well-known file under one directory" shape, adapted to
//! hand the read text to [`crate::driver::compile_version`] instead of the
//! teacher's single-version-only parser entry point.

use std::path::Path;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::dedup::Deduplicator;
use crate::driver::{self, CompiledVersion, SourceFile, VersionInput};
use crate::error::{CompileError, IoError};
use crate::CompileSettings;

fn read_to_string(path: &Path) -> Result<String, IoError> {
    std::fs::read_to_string(path).map_err(|e| IoError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Reads one version's tzdata directory from disk (the files named by
/// `settings.files`, plus `leapseconds` if requested) and compiles it.
pub fn compile_version_from_directory(
    label: &str,
    dir: &Path,
    settings: &CompileSettings,
    dedup: &mut Deduplicator,
) -> Result<CompiledVersion, CompileError> {
    let mut texts: Vec<(&str, String)> = Vec::with_capacity(settings.files.len());
    for file in &settings.files {
        texts.push((file, read_to_string(&dir.join(file))?));
    }
    let leap_text = if settings.include_leap_seconds {
        Some(read_to_string(&dir.join("leapseconds"))?)
    } else {
        None
    };

    let sources: Vec<SourceFile> = texts
        .iter()
        .map(|(name, text)| SourceFile { name, text })
        .collect();
    let leap_seconds = leap_text.as_ref().map(|text| SourceFile {
        name: "leapseconds",
        text,
    });

    let input = VersionInput {
        label,
        sources: &sources,
        leap_seconds,
    };
    driver::compile_version(&input, dedup)
}
