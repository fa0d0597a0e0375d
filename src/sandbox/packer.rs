//! In-memory tar archive construction and extraction for staging files
//! into, and retrieving results out of, a sandbox.

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use tar::{Builder, EntryType, Header};

use crate::error::{EngineError, Result};

fn append_entry(builder: &mut Builder<Vec<u8>>, name: &str, contents: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_path(name).map_err(EngineError::ArchiveIo)?;
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(EntryType::Regular);
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    header.set_mtime(mtime);
    header.set_cksum();

    builder
        .append(&header, contents)
        .map_err(EngineError::ArchiveIo)?;
    Ok(())
}

fn finish(builder: Builder<Vec<u8>>) -> Result<Vec<u8>> {
    builder.into_inner().map_err(EngineError::ArchiveIo)
}

/// Pack user code and its config into a single archive for initial staging.
///
/// `filename` is the language-specific source filename (see
/// [`crate::languages::Language::source_filename`]).
pub fn pack_stage(user_code: &str, filename: &str, config: &serde_json::Value) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    append_entry(&mut builder, filename, user_code.as_bytes())?;
    let config_bytes = serde_json::to_vec_pretty(config).map_err(EngineError::Codec)?;
    append_entry(&mut builder, "config.json", &config_bytes)?;
    finish(builder)
}

/// Pack user code alone, for the batch-optimized engine's initial staging
/// (the config is staged separately, per test).
pub fn pack_user_only(user_code: &str, filename: &str) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    append_entry(&mut builder, filename, user_code.as_bytes())?;
    finish(builder)
}

/// Pack a config alone, to overwrite `/app/config.json` between tests in
/// the batch-optimized engine without disturbing the compiled artifact.
pub fn pack_config_only(config: &serde_json::Value) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    let config_bytes = serde_json::to_vec_pretty(config).map_err(EngineError::Codec)?;
    append_entry(&mut builder, "config.json", &config_bytes)?;
    finish(builder)
}

/// Walk a tar archive (as returned by the container driver's `get_archive`)
/// and return the contents of the first regular file whose name ends with
/// `result.json`.
pub fn extract_result(tar_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    let entries = archive.entries().map_err(EngineError::ArchiveIo)?;

    for entry in entries {
        let mut entry = entry.map_err(EngineError::ArchiveIo)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(EngineError::ArchiveIo)?;
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n == "result.json")
            .unwrap_or(false);
        if !is_result {
            continue;
        }

        let mut contents = Vec::new();
        std::io::copy(&mut entry, &mut contents).map_err(EngineError::ArchiveIo)?;
        return Ok(contents);
    }

    Err(EngineError::ResultMissing)
}
