use std::{io::ErrorKind, marker::PhantomData, path::{Path, PathBuf}};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use crate::errors::ServiceError;

/// Generic JSON file-backed document store.
///
/// Holds no copy of the document: every `load` reads the whole file and every
/// `replace` overwrites it. Writes go to a sibling temp file that is renamed
/// over the target, so a concurrent `load` sees either the old or the new
/// document, never a truncated one. Read-modify-write cycles issued through
/// `update` (and `replace`) are serialized by an in-process lock, so
/// concurrent writers in the same process cannot lose each other's changes.
/// Other processes writing the same file are not coordinated with.
pub struct JsonDocStore<T> {
    file_path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Default,
{
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into(), write_lock: Mutex::new(()), _doc: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Create the file holding `T::default()` if it does not exist yet.
    /// Existing content is left untouched.
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        match fs::metadata(&self.file_path).await {
            Ok(_) => {
                debug!(path = %self.file_path.display(), "data file present");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = self.file_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)
                            .await
                            .map_err(|e| ServiceError::StorageWrite(e.to_string()))?;
                    }
                }
                self.write(&T::default()).await?;
                info!(path = %self.file_path.display(), "created empty data file");
                Ok(())
            }
            Err(e) => Err(ServiceError::StorageRead(e.to_string())),
        }
    }

    /// Read and deserialize the whole document.
    pub async fn load(&self) -> Result<T, ServiceError> {
        let bytes = fs::read(&self.file_path)
            .await
            .map_err(|e| ServiceError::StorageRead(format!("{}: {e}", self.file_path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::StorageRead(format!("{}: {e}", self.file_path.display())))
    }

    /// Serialize (pretty-printed) and overwrite the whole document.
    pub async fn replace(&self, doc: &T) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        self.write(doc).await
    }

    /// Load, apply `f`, and write the result back, holding the write lock for
    /// the whole cycle. Nothing is written if `f` fails.
    pub async fn update<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut T) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let out = f(&mut doc)?;
        self.write(&doc).await?;
        Ok(out)
    }

    // `<file>.tmp` next to the target; only written under `write_lock`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.file_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }

    async fn write(&self, doc: &T) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(doc).map_err(|e| ServiceError::StorageWrite(e.to_string()))?;
        let tmp = self.temp_path();
        fs::write(&tmp, data)
            .await
            .map_err(|e| ServiceError::StorageWrite(format!("{}: {e}", tmp.display())))?;
        if let Err(e) = fs::rename(&tmp, &self.file_path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::StorageWrite(format!("{}: {e}", self.file_path.display())));
        }
        Ok(())
    }
}
