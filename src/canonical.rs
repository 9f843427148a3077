//! Canonical JSON bytes and SHA-256 digests for reports, plus golden
//! snapshot comparison.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::util::ensure_directory;

pub const GOLDEN_MODE_ENV: &str = "SOST_GOLDEN_MODE";
pub const DIGEST_SIDECAR_EXTENSION: &str = "sha256.txt";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SnapshotMode {
    Verify,
    Update,
}

impl SnapshotMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Update => "update",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SnapshotStatus {
    Pass,
    FailHash,
    MissingExpected,
    Updated,
}

pub fn resolve_snapshot_mode(update_flag: bool) -> SnapshotMode {
    if update_flag {
        return SnapshotMode::Update;
    }
    parse_snapshot_mode(std::env::var(GOLDEN_MODE_ENV).ok().as_deref())
}

pub fn parse_snapshot_mode(value: Option<&str>) -> SnapshotMode {
    match value {
        Some(value)
            if value.trim().eq_ignore_ascii_case("update")
                || value.trim().eq_ignore_ascii_case("bootstrap")
                || value.trim().eq_ignore_ascii_case("rotate") =>
        {
            SnapshotMode::Update
        }
        _ => SnapshotMode::Verify,
    }
}

/// Rebuilds every object with lexicographically ordered keys, independent
/// of the map flavour serde_json was compiled with.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<(String, Value)>>();
            entries.sort_by(|left, right| left.0.cmp(&right.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

pub fn canonical_value<T: Serialize>(value: &T) -> Result<Value> {
    let value = serde_json::to_value(value).context("failed to convert report to json value")?;
    Ok(sort_keys(value))
}

/// Compact JSON, sorted keys, `,` and `:` separators, UTF-8 left unescaped.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = canonical_value(value)?;
    serde_json::to_vec(&value).context("failed to serialize canonical json")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String> {
    Ok(sha256_hex(&canonical_bytes(value)?))
}

pub fn digest_sidecar_path(expected_path: &Path) -> PathBuf {
    expected_path.with_extension(DIGEST_SIDECAR_EXTENSION)
}

pub fn write_digest_sidecar(path: &Path, digest: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(path, format!("{digest}\n"))
        .with_context(|| format!("failed to write digest file: {}", path.display()))
}

pub fn read_digest_sidecar(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read digest file: {}", path.display()))?;
    Ok(raw.trim().to_string())
}

/// Compares `digest` with the stored baseline, or rewrites the baseline in
/// update mode. A mismatch is a status, not an error.
pub fn check_snapshot<T: Serialize>(
    expected_path: &Path,
    snapshot: &T,
    digest: &str,
    mode: SnapshotMode,
) -> Result<SnapshotStatus> {
    let sidecar_path = digest_sidecar_path(expected_path);

    if mode == SnapshotMode::Update {
        if let Some(parent) = expected_path.parent() {
            ensure_directory(parent)?;
        }
        let pretty = serde_json::to_vec_pretty(&canonical_value(snapshot)?)
            .context("failed to serialize snapshot")?;
        fs::write(expected_path, pretty).with_context(|| {
            format!("failed to write snapshot: {}", expected_path.display())
        })?;
        write_digest_sidecar(&sidecar_path, digest)?;
        return Ok(SnapshotStatus::Updated);
    }

    if !expected_path.exists() || !sidecar_path.exists() {
        return Ok(SnapshotStatus::MissingExpected);
    }

    let expected_digest = read_digest_sidecar(&sidecar_path)?;
    if expected_digest.eq_ignore_ascii_case(digest) {
        Ok(SnapshotStatus::Pass)
    } else {
        Ok(SnapshotStatus::FailHash)
    }
}
