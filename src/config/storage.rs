use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::utils::prelude::*;

/// Whole-document JSON files on disk.
pub struct JsonFile;

impl JsonFile {
    /// Serialize `value` and replace the file at `path` with it.
    pub fn write<T>(value: &T, path: impl AsRef<Path>) -> AnyResult<()>
    where
        T: Serialize,
    {
        let path = path.as_ref();

        let dir = path.parent().with_context(|| {
            format!(
                "Config path does not have a valid parent dir: '{}'",
                path.display()
            )
        })?;

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create dir: '{}'", dir.display()))?;

        // Write next to the target first, so a failed write never truncates the old document.
        let staging = path.with_extension("json.tmp");

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .with_context(|| format!("Failed to open file: '{}'", staging.display()))?;

        serde_json::to_writer_pretty(file, &value)
            .with_context(|| format!("Failed to serialize data: '{}'", path.display()))?;

        fs::rename(&staging, path)
            .with_context(|| format!("Failed to replace file: '{}'", path.display()))?;

        Ok(())
    }

    /// Read and deserialize the file at `path`.
    pub fn read<T>(path: impl AsRef<Path>) -> AnyResult<T>
    where
        T: DeserializeOwned,
    {
        let path = path.as_ref();
        let mut value = String::new();
        {
            let mut file = OpenOptions::new()
                .read(true)
                .open(path)
                .with_context(|| format!("Failed to open path '{}'", path.display()))?;
            file.read_to_string(&mut value)?;
        }
        let value = serde_json::from_str::<T>(&value)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        Ok(value)
    }

    /// Read the file, or write and return the default value if the file does not exist.
    ///
    /// # Errors
    /// If the file exists but cannot be read or parsed, it is left untouched.
    pub fn read_or_create<T>(path: impl AsRef<Path>) -> AnyResult<T>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let path = path.as_ref();
        if path.exists() {
            return Self::read::<T>(path);
        }

        info!("Creating a default config: '{}'", path.display());
        let value = T::default();
        Self::write(&value, path).context("Failed to create config file")?;
        Ok(value)
    }
}
