use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use serde::Serialize;
use ssv_automate_primitives::{normalize_pubkey, DepositData, KeysharesError, KeysharesFile};
use time::{macros::format_description, OffsetDateTime};
use tracing::debug;

pub const DEPOSIT_PREFIX: &str = "deposit_data";
pub const KEYSHARES_PREFIX: &str = "keyshares";

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid keyshares file {path}: {source}")]
    Keyshares {
        path: PathBuf,
        #[source]
        source: KeysharesError,
    },
    #[error("{path} contains no deposit entries")]
    EmptyDeposit { path: PathBuf },
    #[error("Found {deposits} deposit files but {keyshares} keyshares files")]
    CountMismatch { deposits: usize, keyshares: usize },
    #[error("Validator directory {dir} has no {missing} file")]
    Unpaired { dir: PathBuf, missing: &'static str },
    #[error("No ceremony output found for validators {}", .missing.join(", "))]
    MissingValidators { missing: Vec<String> },
    #[error("Failed to format timestamp: {0}")]
    Time(#[from] time::error::Format),
}

pub type FileResult<T> = Result<T, FileError>;

/// The pair of files a DKG ceremony produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyOutputs {
    pub deposit: PathBuf,
    pub keyshares: PathBuf,
}

/// Deposit and keyshares files of one validator, found in a `<index>-<pubkey>` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorFiles {
    pub dir: PathBuf,
    pub pubkey: String,
    pub deposit: PathBuf,
    pub keyshares: PathBuf,
}

fn read_dir(path: &Path) -> FileResult<fs::ReadDir> {
    fs::read_dir(path).map_err(|source| FileError::Read { path: path.to_path_buf(), source })
}

fn is_json_with_prefix(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.starts_with(prefix) && name.ends_with(".json")
}

/// Every file under `dir` named `<prefix>*.json`, with its depth relative to `dir`.
fn find_prefixed(
    dir: &Path,
    prefix: &str,
    depth: usize,
    found: &mut Vec<(usize, PathBuf)>,
) -> FileResult<()> {
    for entry in read_dir(dir)? {
        let path =
            entry.map_err(|source| FileError::Read { path: dir.to_path_buf(), source })?.path();
        if path.is_dir() {
            find_prefixed(&path, prefix, depth + 1, found)?;
        } else if is_json_with_prefix(&path, prefix) {
            found.push((depth, path));
        }
    }
    Ok(())
}

fn modified(path: &Path) -> FileResult<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| FileError::Read { path: path.to_path_buf(), source })
}

/// The newest `<prefix>*.json` under `dir` written at or after `since`.
///
/// Shallower files win over deeper ones so the ceremony-wide aggregate is picked over the
/// per-validator copies written next to it.
fn latest_file(dir: &Path, prefix: &str, since: SystemTime) -> FileResult<Option<PathBuf>> {
    let mut found = Vec::new();
    find_prefixed(dir, prefix, 0, &mut found)?;

    let mut candidates = Vec::with_capacity(found.len());
    for (depth, path) in found {
        let mtime = modified(&path)?;
        if mtime >= since {
            candidates.push((depth, mtime, path));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    Ok(candidates.into_iter().next().map(|(_, _, path)| path))
}

/// Locate the deposit and keyshares files of the most recent ceremony in `dir`.
pub fn latest_outputs(dir: &Path, since: SystemTime) -> FileResult<Option<CeremonyOutputs>> {
    let deposit = latest_file(dir, DEPOSIT_PREFIX, since)?;
    let keyshares = latest_file(dir, KEYSHARES_PREFIX, since)?;
    debug!(?deposit, ?keyshares, "latest ceremony outputs");

    Ok(match (deposit, keyshares) {
        (Some(deposit), Some(keyshares)) => Some(CeremonyOutputs { deposit, keyshares }),
        _ => None,
    })
}

pub fn read_deposit_file(path: &Path) -> FileResult<Vec<DepositData>> {
    let raw = fs::read_to_string(path)
        .map_err(|source| FileError::Read { path: path.to_path_buf(), source })?;
    let deposits: Vec<DepositData> = serde_json::from_str(&raw)
        .map_err(|source| FileError::Parse { path: path.to_path_buf(), source })?;
    if deposits.is_empty() {
        return Err(FileError::EmptyDeposit { path: path.to_path_buf() });
    }
    Ok(deposits)
}

pub fn read_keyshares_file(path: &Path) -> FileResult<KeysharesFile> {
    let raw = fs::read_to_string(path)
        .map_err(|source| FileError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| FileError::Parse { path: path.to_path_buf(), source })
}

/// The validator public key encoded in a ceremony output directory name (`<index>-<pubkey>`).
pub fn validator_dir_pubkey(name: &str) -> Option<&str> {
    let (index, pubkey) = name.split_once('-')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = pubkey.strip_prefix("0x").unwrap_or(pubkey);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(pubkey)
}

fn collect_validator_dirs(dir: &Path, found: &mut Vec<(PathBuf, String)>) -> FileResult<()> {
    for entry in read_dir(dir)? {
        let path =
            entry.map_err(|source| FileError::Read { path: dir.to_path_buf(), source })?.path();
        if !path.is_dir() {
            continue;
        }
        let pubkey = path.file_name().and_then(|name| name.to_str()).and_then(validator_dir_pubkey);
        match pubkey {
            Some(pubkey) => found.push((path.clone(), pubkey.to_string())),
            None => collect_validator_dirs(&path, found)?,
        }
    }
    Ok(())
}

fn files_with_prefix(dir: &Path, prefix: &str) -> FileResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in read_dir(dir)? {
        let path =
            entry.map_err(|source| FileError::Read { path: dir.to_path_buf(), source })?.path();
        if path.is_file() && is_json_with_prefix(&path, prefix) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Pair the deposit and keyshares files of every validator directory below `folder`.
///
/// Fails when the number of deposit files and keyshares files differ, or when a validator
/// directory is missing one of the two; a partial merge is never returned.
pub fn find_validator_pairs(folder: &Path) -> FileResult<Vec<ValidatorFiles>> {
    let mut dirs = Vec::new();
    collect_validator_dirs(folder, &mut dirs)?;
    dirs.sort();

    let mut deposits = Vec::with_capacity(dirs.len());
    let mut keyshares = Vec::with_capacity(dirs.len());
    for (dir, pubkey) in &dirs {
        deposits.push(files_with_prefix(dir, DEPOSIT_PREFIX)?.into_iter().next());
        keyshares.push(files_with_prefix(dir, KEYSHARES_PREFIX)?.into_iter().next());
        debug!(dir = %dir.display(), %pubkey, "found validator directory");
    }

    let deposit_count = deposits.iter().flatten().count();
    let keyshares_count = keyshares.iter().flatten().count();
    if deposit_count != keyshares_count {
        return Err(FileError::CountMismatch {
            deposits: deposit_count,
            keyshares: keyshares_count,
        });
    }

    let mut pairs = Vec::with_capacity(dirs.len());
    for (((dir, pubkey), deposit), keyshares) in dirs.into_iter().zip(deposits).zip(keyshares) {
        match (deposit, keyshares) {
            (Some(deposit), Some(keyshares)) => {
                pairs.push(ValidatorFiles { dir, pubkey, deposit, keyshares })
            }
            (None, None) => continue,
            (None, Some(_)) => return Err(FileError::Unpaired { dir, missing: DEPOSIT_PREFIX }),
            (Some(_), None) => return Err(FileError::Unpaired { dir, missing: KEYSHARES_PREFIX }),
        }
    }
    Ok(pairs)
}

/// Concatenate the deposit entries of `pairs`, ordered by ascending owner nonce.
///
/// When `pubkeys` is given only validators whose public key is in the set are kept, and every
/// key of the set must have a validator directory. Keys are compared after [`normalize_pubkey`].
pub fn merge_deposits(
    pairs: &[ValidatorFiles],
    pubkeys: Option<&HashSet<String>>,
) -> FileResult<Vec<DepositData>> {
    let mut entries = Vec::with_capacity(pairs.len());
    let mut matched = HashSet::new();
    for pair in pairs {
        if let Some(pubkeys) = pubkeys {
            let pubkey = normalize_pubkey(&pair.pubkey);
            if !pubkeys.contains(&pubkey) {
                debug!(pubkey = %pair.pubkey, "skipping validator not in the requested set");
                continue;
            }
            matched.insert(pubkey);
        }
        let keyshares = read_keyshares_file(&pair.keyshares)?;
        let nonce = keyshares.min_owner_nonce().ok_or_else(|| FileError::Keyshares {
            path: pair.keyshares.clone(),
            source: KeysharesError::Empty,
        })?;
        entries.push((nonce, read_deposit_file(&pair.deposit)?));
    }

    if let Some(pubkeys) = pubkeys {
        let mut missing: Vec<String> = pubkeys.difference(&matched).cloned().collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(FileError::MissingValidators { missing });
        }
    }

    entries.sort_by_key(|(nonce, _)| *nonce);
    Ok(entries.into_iter().flat_map(|(_, deposits)| deposits).collect())
}

/// `deposit_data-<UTC timestamp>.json` in the working directory.
pub fn default_merge_output(now: OffsetDateTime) -> FileResult<PathBuf> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    Ok(PathBuf::from(format!("deposit_data-{}.json", now.format(format)?)))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> FileResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|source| FileError::Parse { path: path.to_path_buf(), source })?;
    fs::write(path, raw).map_err(|source| FileError::Write { path: path.to_path_buf(), source })
}
