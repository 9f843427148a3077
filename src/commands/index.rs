use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::{IndexAction, IndexArgs, IndexBuildArgs, IndexVerifyArgs};
use crate::model::{IndexEntry, IndexMismatch, IndexVerification};
use crate::pipeline::PipelineError;
use crate::util::{ensure_directory, relative_posix_path, sha256_file};

pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".github",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".venv",
    "venv",
    "target",
];

pub fn run(args: IndexArgs) -> Result<()> {
    match args.action {
        IndexAction::Build(args) => run_build(args),
        IndexAction::Verify(args) => run_verify(args),
    }
}

fn run_build(args: IndexBuildArgs) -> Result<()> {
    let out_path = resolve_under_root(&args.root, &args.out);
    let excludes = DEFAULT_EXCLUDES
        .iter()
        .map(|name| (*name).to_string())
        .chain(args.excludes.iter().cloned())
        .collect::<Vec<String>>();

    let skip = index_relative_path(&args.root, &out_path)?;
    let entries = build_index(&args.root, &excludes, skip.as_deref())?;
    write_index(&out_path, &entries)?;

    info!(
        root = %args.root.display(),
        files = entries.len(),
        out = %out_path.display(),
        "file index written"
    );
    Ok(())
}

fn run_verify(args: IndexVerifyArgs) -> Result<()> {
    let index_path = resolve_under_root(&args.root, &args.index);
    let verification = verify_index(&args.root, &index_path)?;

    for mismatch in &verification.bad {
        warn!(
            path = %mismatch.path,
            expected = %mismatch.expected,
            actual = %mismatch.actual,
            "hash mismatch"
        );
    }
    for path in &verification.missing {
        warn!(path = %path, "indexed file missing");
    }

    info!(
        checked = verification.checked,
        ok = verification.ok,
        bad = verification.bad.len(),
        missing = verification.missing.len(),
        "file index verified"
    );

    if !verification.is_clean() {
        bail!(
            "file index verification failed: {} mismatch(es), {} missing",
            verification.bad.len(),
            verification.missing.len()
        );
    }
    Ok(())
}

fn resolve_under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Resolved through `..` and symlinks; `None` when the file lies outside
/// `root`.
pub fn index_relative_path(root: &Path, index_path: &Path) -> Result<Option<String>> {
    let Some(name) = index_path.file_name() else {
        return Ok(None);
    };
    let parent = index_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    ensure_directory(parent)?;

    let root = fs::canonicalize(root)
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    let parent = fs::canonicalize(parent)
        .with_context(|| format!("failed to resolve {}", parent.display()))?;
    Ok(relative_posix_path(&root, &parent.join(name)))
}

pub fn build_index(
    root: &Path,
    excludes: &[String],
    skip: Option<&str>,
) -> Result<Vec<IndexEntry>> {
    let mut files = Vec::new();
    collect_files(root, excludes, &mut files)?;

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let relative = relative_posix_path(root, &path)
            .with_context(|| format!("path is not valid UTF-8: {}", path.display()))?;
        if skip == Some(relative.as_str()) {
            continue;
        }
        entries.push(IndexEntry {
            sha256: sha256_file(&path)?,
            path: relative,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn collect_files(dir: &Path, excludes: &[String], files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        let excluded = entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.iter().any(|exclude| exclude == name));
        if excluded {
            continue;
        }

        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?;
        if file_type.is_dir() {
            collect_files(&path, excludes, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

pub fn render_index(entries: &[IndexEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}  {}\n", entry.sha256, entry.path))
        .collect()
}

fn write_index(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(path, render_index(entries))
        .with_context(|| format!("failed to write file index: {}", path.display()))
}

/// Accepts `HASH  path` and the binary-mode `HASH *path`. Blank lines and
/// `#` comments yield `None`.
pub fn parse_index_line(line: &str) -> Result<Option<IndexEntry>, PipelineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (hash, rest) = trimmed
        .split_once(char::is_whitespace)
        .ok_or_else(|| PipelineError::InvalidInput(format!("malformed index line: {line:?}")))?;
    let path = rest.trim_start();
    let path = path.strip_prefix('*').unwrap_or(path);

    let is_digest = hash.len() == 64 && hash.chars().all(|ch| ch.is_ascii_hexdigit());
    if !is_digest || path.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "malformed index line: {line:?}"
        )));
    }

    Ok(Some(IndexEntry {
        sha256: hash.to_ascii_lowercase(),
        path: path.to_string(),
    }))
}

pub fn verify_index(root: &Path, index_path: &Path) -> Result<IndexVerification> {
    if !index_path.exists() {
        return Err(PipelineError::InputNotFound {
            path: index_path.to_path_buf(),
        }
        .into());
    }

    let raw = fs::read_to_string(index_path)
        .with_context(|| format!("failed to read file index: {}", index_path.display()))?;

    let mut verification = IndexVerification::default();
    for line in raw.lines() {
        let Some(entry) = parse_index_line(line)? else {
            continue;
        };
        verification.checked += 1;

        let path = root.join(&entry.path);
        if !path.is_file() {
            verification.missing.push(entry.path);
            continue;
        }

        let actual = sha256_file(&path)?;
        if actual == entry.sha256 {
            verification.ok += 1;
        } else {
            verification.bad.push(IndexMismatch {
                path: entry.path,
                expected: entry.sha256,
                actual,
            });
        }
    }

    Ok(verification)
}
