//! Stored content: `<root>/<id>/h5p.json` and `<root>/<id>/content.json`.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use super::{read_json, write_json};
use crate::engine::{ContentMetadata, EngineError, EngineResult};
use crate::log;
use crate::utils::path::is_plain_file_name;

/// Suffix the editor appends to paths still in temporary storage.
pub const TMP_SUFFIX: &str = "#tmp";

#[derive(Debug, Clone)]
pub struct ContentStorage {
    root: PathBuf,
}

impl ContentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, id: &str) -> EngineResult<PathBuf> {
        if !is_plain_file_name(id) || id.starts_with('.') {
            return Err(EngineError::InvalidContentId(id.to_string()));
        }
        Ok(self.root.join(id))
    }

    pub fn exists(&self, id: &str) -> EngineResult<bool> {
        Ok(self.dir(id)?.join("h5p.json").is_file())
    }

    pub fn metadata(&self, id: &str) -> EngineResult<ContentMetadata> {
        let path = self.dir(id)?.join("h5p.json");
        if !path.is_file() {
            return Err(EngineError::ContentNotFound(id.to_string()));
        }
        read_json(&path)
    }

    pub fn parameters(&self, id: &str) -> EngineResult<Value> {
        let path = self.dir(id)?.join("content.json");
        if !path.is_file() {
            return Err(EngineError::ContentNotFound(id.to_string()));
        }
        read_json(&path)
    }

    /// Ids of stored content: numeric ids in numeric order, then the rest.
    pub fn list(&self) -> EngineResult<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(EngineError::io(&self.root))?;

        let mut ids: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().join("h5p.json").is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        ids.sort_by(|a, b| compare_ids(a, b));
        Ok(ids)
    }

    /// Claim the next free numeric id by creating its directory.
    ///
    /// Every existing directory counts, saved or only reserved, and
    /// `create_dir` fails for a directory another request already took.
    pub fn reserve_id(&self) -> EngineResult<String> {
        fs::create_dir_all(&self.root).map_err(EngineError::io(&self.root))?;
        let entries = fs::read_dir(&self.root).map_err(EngineError::io(&self.root))?;
        let mut next = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        loop {
            let dir = self.root.join(next.to_string());
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(next.to_string()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => next += 1,
                Err(e) => return Err(EngineError::io(&dir)(e)),
            }
        }
    }

    /// Drop a reserved id whose save failed.
    pub fn release(&self, id: &str) {
        let Ok(dir) = self.dir(id) else {
            return;
        };
        if let Err(e) = fs::remove_dir_all(&dir) {
            log!("h5p"; "failed to release content dir {}: {}", dir.display(), e);
        }
    }

    pub fn save(&self, id: &str, metadata: &ContentMetadata, params: &Value) -> EngineResult<()> {
        let dir = self.dir(id)?;
        fs::create_dir_all(&dir).map_err(EngineError::io(&dir))?;
        write_json(&dir.join("h5p.json"), metadata)?;
        write_json(&dir.join("content.json"), params)
    }

    /// Strip the `#tmp` suffix from every temporary file referenced in
    /// `params`, returning the referenced paths relative to temporary storage.
    pub fn stage_temporary_files(params: &mut Value) -> Vec<String> {
        let mut staged = Vec::new();
        visit_strings(params, &mut |value| {
            let Some(relative) = value.strip_suffix(TMP_SUFFIX) else {
                return;
            };
            if !is_relative_inside(relative) {
                return;
            }
            let relative = relative.to_string();
            *value = relative.clone();
            staged.push(relative);
        });
        staged
    }

    /// Move staged files from `temporary` into the content directory.
    pub fn commit_temporary_files(
        &self,
        id: &str,
        staged: &[String],
        temporary: &Path,
    ) -> EngineResult<()> {
        let dir = self.dir(id)?;
        for relative in staged {
            let source = temporary.join(relative);
            if source.is_file() {
                move_file(&source, &dir.join(relative))?;
            } else {
                log!("h5p"; "temporary file {} is missing", source.display());
            }
        }
        Ok(())
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn visit_strings(value: &mut Value, f: &mut impl FnMut(&mut String)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter_mut().for_each(|v| visit_strings(v, f)),
        Value::Object(map) => map.values_mut().for_each(|v| visit_strings(v, f)),
        _ => {}
    }
}

/// Only plain relative paths, no `..` and no root.
fn is_relative_inside(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn move_file(source: &Path, dest: &Path) -> EngineResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(EngineError::io(parent))?;
    }
    // rename fails across filesystems; fall back to copy + remove
    if fs::rename(source, dest).is_err() {
        fs::copy(source, dest).map_err(EngineError::io(dest))?;
        fs::remove_file(source).map_err(EngineError::io(source))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(title: &str) -> ContentMetadata {
        serde_json::from_value(json!({"title": title, "mainLibrary": "H5P.Text"})).unwrap()
    }

    #[test]
    fn test_save_and_read_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = ContentStorage::new(temp.path());

        storage.save("1", &metadata("One"), &json!({"text": "hi"})).unwrap();

        assert!(storage.exists("1").unwrap());
        assert_eq!(storage.metadata("1").unwrap().title, "One");
        assert_eq!(storage.parameters("1").unwrap()["text"], "hi");
    }

    #[test]
    fn test_list_order_and_reserve_id() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = ContentStorage::new(temp.path());
        for id in ["10", "2", "draft", "1"] {
            storage.save(id, &metadata(id), &json!({})).unwrap();
        }
        fs::create_dir_all(temp.path().join("99")).unwrap();

        // A directory without h5p.json is not listed but still holds its id
        assert_eq!(storage.list().unwrap(), ["1", "2", "10", "draft"]);
        assert_eq!(storage.reserve_id().unwrap(), "100");
        assert_eq!(storage.reserve_id().unwrap(), "101");
        assert!(temp.path().join("101").is_dir());
    }

    #[test]
    fn test_reserve_id_empty_and_release() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = ContentStorage::new(temp.path().join("content"));
        assert_eq!(storage.reserve_id().unwrap(), "1");

        storage.release("1");
        assert!(!temp.path().join("content/1").exists());
        assert_eq!(storage.reserve_id().unwrap(), "1");
    }

    #[test]
    fn test_reserve_id_is_unique_across_threads() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = ContentStorage::new(temp.path());

        let mut ids: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| storage.reserve_id().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        ids.sort_by(|a, b| compare_ids(a, b));
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn test_invalid_ids() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = ContentStorage::new(temp.path());
        for id in ["", "..", "../1", "a/b", ".hidden"] {
            assert!(
                matches!(storage.dir(id), Err(EngineError::InvalidContentId(_))),
                "{id:?}"
            );
        }
        assert!(matches!(
            storage.metadata("404"),
            Err(EngineError::ContentNotFound(_))
        ));
    }

    #[test]
    fn test_commit_temporary_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let tmp_root = temp.path().join("tmp");
        fs::create_dir_all(tmp_root.join("images")).unwrap();
        fs::write(tmp_root.join("images/cat.png"), b"cat").unwrap();

        let storage = ContentStorage::new(temp.path().join("content"));
        let mut params = json!({
            "image": {"path": "images/cat.png#tmp"},
            "list": ["plain", "../escape#tmp"],
        });
        let staged = ContentStorage::stage_temporary_files(&mut params);
        assert_eq!(staged, ["images/cat.png"]);
        assert!(tmp_root.join("images/cat.png").is_file());

        storage.commit_temporary_files("5", &staged, &tmp_root).unwrap();

        assert_eq!(params["image"]["path"], "images/cat.png");
        assert_eq!(params["list"][1], "../escape#tmp");
        assert!(!tmp_root.join("images/cat.png").exists());
        assert_eq!(
            fs::read(temp.path().join("content/5/images/cat.png")).unwrap(),
            b"cat"
        );
    }
}
