//! Stored command presets.
//!
//! Presets are opaque batch texts kept in order. With a backing path every
//! mutation is written straight away as `{"commands": [...]}`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ControlError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    commands: Vec<String>,
}

/// Ordered list of preset batch texts.
#[derive(Debug, Default)]
pub struct PresetStore {
    path: Option<PathBuf>,
    commands: Vec<String>,
}

impl PresetStore {
    /// Store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file is an empty store; the file
    /// is created on the first mutation.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ControlError> {
        let Some(path) = path else {
            return Ok(Self::in_memory());
        };
        let commands = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|err| {
                ControlError::Preset(format!("read {}: {err}", path.display()).into())
            })?;
            let file: PresetFile = serde_json::from_str(&text).map_err(|err| {
                ControlError::Preset(format!("parse {}: {err}", path.display()).into())
            })?;
            file.commands
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = commands.len(), "presets loaded");
        Ok(Self {
            path: Some(path),
            commands,
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Presets in stored order.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Append a preset and persist.
    pub fn add(&mut self, text: impl Into<String>) -> Result<(), ControlError> {
        let text = text.into();
        let mut commands = self.commands.clone();
        commands.push(text.clone());
        self.commit(commands)?;
        info!(preset = %text, "preset added");
        Ok(())
    }

    /// Remove the presets at `indices` (any order, duplicates ignored),
    /// keeping the rest in order. Out-of-range indices fail without
    /// changing anything.
    pub fn remove(&mut self, indices: &[usize]) -> Result<(), ControlError> {
        let doomed: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(bad) = doomed.iter().find(|index| **index >= self.commands.len()) {
            return Err(ControlError::Preset(
                format!("no preset at index {bad} ({} stored)", self.commands.len()).into(),
            ));
        }
        let commands = self
            .commands
            .iter()
            .enumerate()
            .filter(|(index, _)| !doomed.contains(index))
            .map(|(_, text)| text.clone())
            .collect();
        self.commit(commands)?;
        info!(removed = doomed.len(), "presets removed");
        Ok(())
    }

    /// Write `commands` to the backing file, then adopt them. A failed write
    /// leaves the store unchanged.
    fn commit(&mut self, commands: Vec<String>) -> Result<(), ControlError> {
        let file = PresetFile { commands };
        if let Some(path) = self.path.as_ref() {
            persist(path, &file)?;
        }
        self.commands = file.commands;
        Ok(())
    }
}

fn persist(path: &Path, file: &PresetFile) -> Result<(), ControlError> {
    let text = serde_json::to_string_pretty(file)
        .map_err(|err| ControlError::Preset(err.to_string().into()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            ControlError::Preset(format!("create {}: {err}", parent.display()).into())
        })?;
    }
    fs::write(path, text)
        .map_err(|err| ControlError::Preset(format!("write {}: {err}", path.display()).into()))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("robohand-presets-{name}-{stamp}"))
            .join("presets.json")
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let store = PresetStore::load(Some(temp_path("missing"))).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn mutations_persist_immediately() {
        let path = temp_path("persist");
        let mut store = PresetStore::load(Some(path.clone())).unwrap();
        store.add("rotation|10;").unwrap();
        store.add("claw|-20;").unwrap();
        store.add("led|0|0|255;").unwrap();
        store.remove(&[0, 2]).unwrap();

        let reopened = PresetStore::load(Some(path.clone())).unwrap();
        assert_eq!(reopened.commands(), ["claw|-20;"]);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"commands\": [\n    \"claw|-20;\"\n  ]\n}");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_commands_key_is_empty() {
        let path = temp_path("nokey");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        let store = PresetStore::load(Some(path.clone())).unwrap();
        assert!(store.is_empty());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn out_of_range_remove_changes_nothing() {
        let mut store = PresetStore::in_memory();
        store.add("rotation|1;").unwrap();
        assert!(matches!(store.remove(&[0, 3]), Err(ControlError::Preset(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failed_write_keeps_memory_unchanged() {
        let blocker = temp_path("blocked");
        let dir = blocker.parent().unwrap().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(&blocker, "{}").unwrap();
        // The store path sits below a regular file, so every write fails.
        let mut store = PresetStore::load(Some(blocker.join("presets.json"))).unwrap();

        assert!(matches!(store.add("rotation|1;"), Err(ControlError::Preset(_))));
        assert!(store.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_remove_keeps_memory_unchanged() {
        let path = temp_path("readonly");
        let mut store = PresetStore::load(Some(path.clone())).unwrap();
        store.add("rotation|1;").unwrap();
        store.add("claw|2;").unwrap();
        let dir = path.parent().unwrap().to_path_buf();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.remove(&[0]).is_err());
        assert_eq!(store.commands(), ["rotation|1;", "claw|2;"]);
        let _ = fs::remove_dir_all(&dir);
    }
}
