//! Disk caching for probe sets, keyed by (conv_hash, split_ratio, version).
//!
//! Probe generation is expensive (an LLM reads the whole conversation), so a
//! generated [`ProbeSet`] is cached to disk and reused for every method/budget
//! combination evaluated against the same conversation.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use compactor_common::CompactionError;
use sha2::{Digest, Sha256};

use crate::probes::ProbeSet;

/// Bytes read from the start and end of a conversation file when hashing.
const HASH_CHUNK: usize = 4096;

/// Compute a stable cache key for a conversation file + split ratio.
///
/// Hashes the file size, the split ratio, and the first/last 4KB of the
/// file rather than its full contents, so hashing a large conversation log
/// stays O(1) in file size.
pub fn conv_hash(path: &Path, split_ratio: f64) -> Result<String, CompactionError> {
    let metadata = fs::metadata(path).map_err(|e| CompactionError::InputShape {
        message: format!("cannot stat {}: {e}", path.display()),
    })?;
    let size = metadata.len();

    let mut hasher = Sha256::new();
    hasher.update(size.to_string().as_bytes());
    hasher.update(format!("{split_ratio:.4}").as_bytes());

    let mut file = fs::File::open(path).map_err(|e| CompactionError::InputShape {
        message: format!("cannot open {}: {e}", path.display()),
    })?;

    let mut head = vec![0u8; HASH_CHUNK.min(size as usize)];
    file.read_exact(&mut head).map_err(|e| CompactionError::InputShape {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    hasher.update(&head);

    if size as usize > HASH_CHUNK {
        use std::io::{Seek, SeekFrom};
        let tail_start = size - HASH_CHUNK as u64;
        file.seek(SeekFrom::Start(tail_start)).map_err(|e| CompactionError::InputShape {
            message: format!("cannot seek {}: {e}", path.display()),
        })?;
        let mut tail = vec![0u8; HASH_CHUNK];
        file.read_exact(&mut tail).map_err(|e| CompactionError::InputShape {
            message: format!("cannot read tail of {}: {e}", path.display()),
        })?;
        hasher.update(&tail);
    }

    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    Ok(hex[..16].to_string())
}

fn cache_path(cache_dir: &Path, key: &str, version: &str) -> PathBuf {
    cache_dir.join(format!("probes_{key}_v{version}.json"))
}

/// Load a cached probe set, or `None` if the cache file does not exist.
pub fn load_probes(cache_dir: &Path, key: &str, version: &str) -> Result<Option<ProbeSet>, CompactionError> {
    let path = cache_path(cache_dir, key, version);
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).map_err(|e| CompactionError::CacheCorrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let probe_set: ProbeSet = serde_json::from_str(&contents).map_err(|e| CompactionError::CacheCorrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(probe_set))
}

/// Save a probe set to disk, creating `cache_dir` if needed. Returns the
/// path written.
pub fn save_probes(cache_dir: &Path, probe_set: &ProbeSet) -> Result<PathBuf, CompactionError> {
    fs::create_dir_all(cache_dir).map_err(|e| CompactionError::InputShape {
        message: format!("cannot create cache dir {}: {e}", cache_dir.display()),
    })?;
    let path = cache_path(cache_dir, &probe_set.conv_hash, &probe_set.version);
    let json = serde_json::to_string_pretty(probe_set).map_err(|e| CompactionError::CacheCorrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|e| CompactionError::InputShape {
        message: format!("cannot write {}: {e}", path.display()),
    })?;
    Ok(path)
}
