//! Credential storage backends and the merge-on-write store.

use super::{CredentialBackend, CredentialRecord};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Single-record credential store over an injected backend.
///
/// # Thread Safety
/// - `merge_and_save` is a read-modify-write guarded by a mutex, so two
///   merges in this process never lose each other's keys
/// - Across processes the last write wins
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new<B: CredentialBackend + 'static>(backend: B) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<dyn CredentialBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the typed record.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - A record is stored
    /// * `Ok(None)` - Nothing stored yet
    /// * `Err` - Backend failure or a record with wrongly typed fields
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let Some(raw) = self.backend.read()? else {
            return Ok(None);
        };

        let record = serde_json::from_value(Value::Object(raw))
            .context("Stored credential record has an invalid shape")?;
        Ok(Some(record))
    }

    /// Shallow-merges `partial` over the stored object and writes it back.
    ///
    /// New values win on key collision; keys absent from `partial` are kept.
    /// A `null` value removes the key.
    ///
    /// # Arguments
    /// * `partial` - A JSON object (any other JSON type is rejected)
    pub fn merge_and_save(&self, partial: Value) -> Result<()> {
        let Value::Object(partial) = partial else {
            return Err(anyhow!("Credential update must be a JSON object"));
        };

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;

        let mut record = self.backend.read()?.unwrap_or_default();
        for (key, value) in partial {
            if value.is_null() {
                record.remove(&key);
            } else {
                record.insert(key, value);
            }
        }

        debug!(keys = ?record.keys().collect::<Vec<_>>(), "Saving credential record");
        self.backend.write(&record)
    }

    /// Removes `key` only while it still holds `expected`.
    ///
    /// Returns `false` (and writes nothing) when the stored value has changed
    /// since the caller read it.
    pub fn remove_if_unchanged(&self, key: &str, expected: &str) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;

        let Some(mut record) = self.backend.read()? else {
            return Ok(false);
        };
        if record.get(key).and_then(Value::as_str) != Some(expected) {
            debug!(key, "Stored value changed, keeping it");
            return Ok(false);
        }

        record.remove(key);
        self.backend.write(&record)?;
        Ok(true)
    }
}

/// JSON file backend.
///
/// Writes go to a uniquely named temp file in the target directory, are
/// fsynced, then renamed over the target.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("credentials");
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }
}

impl CredentialBackend for FileBackend {
    fn read(&self) -> Result<Option<Map<String, Value>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read credential file {}", self.path.display())
                })
            }
        };

        // An empty file counts as "nothing stored"
        if contents.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&contents).context("Failed to parse credential file")? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(anyhow!(
                "Credential file {} does not contain a JSON object",
                self.path.display()
            )),
        }
    }

    fn write(&self, record: &Map<String, Value>) -> Result<()> {
        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize credentials")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }

        let tmp_path = self.temp_path();
        {
            let mut tmp_file =
                File::create(&tmp_path).context("Failed to create temporary credential file")?;
            tmp_file
                .write_all(json.as_bytes())
                .context("Failed to write temporary credential file")?;
            tmp_file
                .sync_all()
                .context("Failed to sync credential file to disk")?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).context("Failed to rename temporary credential file");
        }

        Ok(())
    }
}

/// In-memory backend for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryBackend {
    record: Mutex<Option<Map<String, Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `record` (must be a JSON object).
    pub fn with_record(record: Value) -> Self {
        let record = match record {
            Value::Object(map) => Some(map),
            _ => None,
        };
        Self {
            record: Mutex::new(record),
        }
    }
}

impl CredentialBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Map<String, Value>>> {
        let record = self
            .record
            .lock()
            .map_err(|_| anyhow!("Memory backend lock poisoned"))?;
        Ok(record.clone())
    }

    fn write(&self, record: &Map<String, Value>) -> Result<()> {
        let mut stored = self
            .record
            .lock()
            .map_err(|_| anyhow!("Memory backend lock poisoned"))?;
        *stored = Some(record.clone());
        Ok(())
    }
}
