use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::error;

/// String key-value store with the same shape as browser local storage.
pub trait PreferenceStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str);
    fn remove_item(&mut self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    items: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Preferences kept in a JSON object on disk, rewritten after every change.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = read_items(&path);
        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        if let Err(err) = write_items(&self.path, &self.items) {
            error!("failed to write preferences file: {err}");
        }
    }
}

impl PreferenceStore for FilePreferences {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove_item(&mut self, key: &str) {
        if self.items.remove(key).is_some() {
            self.flush();
        }
    }
}

fn read_items(path: &Path) -> BTreeMap<String, String> {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(err) => {
                error!("failed to parse preferences file: {err}");
                BTreeMap::new()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read preferences file: {err}");
            BTreeMap::new()
        }
    }
}

fn write_items(path: &Path, items: &BTreeMap<String, String>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let payload = serde_json::to_vec_pretty(items).map_err(io::Error::other)?;
    fs::write(path, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("daily_reporter_{name}_{}_{nanos}.json", std::process::id()));
        path
    }

    #[test]
    fn file_preferences_survive_reopen() {
        let path = temp_path("prefs");
        {
            let mut prefs = FilePreferences::open(&path);
            prefs.set_item("acrylic-blur", "20");
            prefs.set_item("acrylic-opacity", "0.5");
            prefs.remove_item("acrylic-opacity");
        }

        let reopened = FilePreferences::open(&path);
        assert_eq!(reopened.get_item("acrylic-blur").as_deref(), Some("20"));
        assert_eq!(reopened.get_item("acrylic-opacity"), None);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unreadable_file_starts_empty() {
        let path = temp_path("garbage");
        fs::write(&path, b"not json").unwrap();
        let prefs = FilePreferences::open(&path);
        assert_eq!(prefs.get_item("anything"), None);
        let _ = fs::remove_file(path);
    }
}
