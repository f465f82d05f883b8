//! 测试用的内存存储

use super::{LocalStore, RemoteStore};
use crate::core::{Entry, Result, SyncError, Timestamp};
use async_trait::async_trait;
use chrono::DateTime;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub fn ts(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// 内存中的本地目录树
#[derive(Default)]
pub struct MemoryLocal {
    entries: BTreeMap<String, Entry>,
}

impl MemoryLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, modified: i64) -> Self {
        self.entries
            .insert(path.to_string(), Entry::file(path, Some(ts(modified))));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.entries.insert(path.to_string(), Entry::dir(path));
        self
    }

    /// 所有目录路径
    pub fn dirs(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.is_dir)
            .map(|e| e.path.clone())
            .collect()
    }
}

#[async_trait]
impl LocalStore for MemoryLocal {
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>> {
        let prefix = format!("{}/", root);
        Ok(self
            .entries
            .values()
            .filter(|e| e.path.starts_with(&prefix))
            .map(|e| Entry {
                modified: None,
                ..e.clone()
            })
            .collect())
    }

    async fn modified_time(&self, path: &str) -> Result<Timestamp> {
        self.entries
            .get(path)
            .and_then(|e| e.modified)
            .ok_or_else(|| SyncError::transfer(path, "no such file"))
    }

    async fn is_file(&self, path: &str) -> bool {
        self.entries.get(path).map(|e| !e.is_dir).unwrap_or(false)
    }
}

#[derive(Default)]
struct RemoteState {
    entries: BTreeMap<String, Entry>,
    clock: i64,
    calls: Vec<String>,
}

/// 内存中的远程存储，记录每次调用
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<RemoteState>,
    fail_uploads: HashSet<String>,
    fail_deletes: HashSet<String>,
    no_mtime: HashSet<String>,
    local_dirs: HashSet<String>,
    broken: bool,
}

impl MemoryRemote {
    /// clock 为上传时写入的修改时间
    pub fn new(clock: i64) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().clock = clock;
        remote
    }

    pub fn with_file(self, path: &str, modified: i64) -> Self {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(path.to_string(), Entry::file(path, Some(ts(modified))));
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(path.to_string(), Entry::dir(path));
        self
    }

    pub fn fail_upload(mut self, remote_path: &str) -> Self {
        self.fail_uploads.insert(remote_path.to_string());
        self
    }

    pub fn fail_delete(mut self, remote_path: &str) -> Self {
        self.fail_deletes.insert(remote_path.to_string());
        self
    }

    pub fn without_mtime(mut self, remote_path: &str) -> Self {
        self.no_mtime.insert(remote_path.to_string());
        self
    }

    /// 所有写操作都返回连接错误
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// 上传时视为目录的本地路径
    pub fn with_local_dirs(mut self, dirs: impl IntoIterator<Item = String>) -> Self {
        self.local_dirs.extend(dirs);
        self
    }

    pub fn entry(&self, path: &str) -> Option<Entry> {
        self.state.lock().unwrap().entries.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().entries.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check_connection(&self) -> Result<()> {
        if self.broken {
            return Err(SyncError::Connection("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>> {
        let state = self.state.lock().unwrap();
        if root != "/" && !state.entries.get(root).map(|e| e.is_dir).unwrap_or(false) {
            return Err(SyncError::listing(root, "not found"));
        }
        let prefix = if root == "/" {
            "/".to_string()
        } else {
            format!("{}/", root)
        };
        Ok(state
            .entries
            .values()
            .filter(|e| e.path.starts_with(&prefix))
            .map(|e| Entry {
                modified: None,
                ..e.clone()
            })
            .collect())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        self.record(format!("upload {} -> {}", local_path.display(), remote_path));
        self.check_connection()?;
        if self.fail_uploads.contains(remote_path) {
            return Err(SyncError::transfer(remote_path, "553 could not create file"));
        }
        let local = local_path.to_string_lossy();
        let mut state = self.state.lock().unwrap();
        let entry = if self.local_dirs.contains(local.as_ref()) {
            Entry::dir(remote_path)
        } else {
            Entry::file(remote_path, Some(ts(state.clock)))
        };
        state.entries.insert(remote_path.to_string(), entry);
        Ok(())
    }

    async fn delete_file(&self, remote_path: &str) -> Result<()> {
        self.record(format!("delete_file {}", remote_path));
        self.check_connection()?;
        let mut state = self.state.lock().unwrap();
        match state.entries.get(remote_path) {
            Some(e) if !e.is_dir && !self.fail_deletes.contains(remote_path) => {
                state.entries.remove(remote_path);
                Ok(())
            }
            _ => Err(SyncError::transfer(remote_path, "550 not a file")),
        }
    }

    async fn remove_directory(&self, remote_path: &str) -> Result<()> {
        self.record(format!("remove_directory {}", remote_path));
        self.check_connection()?;
        let mut state = self.state.lock().unwrap();
        let prefix = format!("{}/", remote_path);
        let has_children = state.entries.keys().any(|p| p.starts_with(&prefix));
        match state.entries.get(remote_path) {
            Some(e) if e.is_dir && !has_children && !self.fail_deletes.contains(remote_path) => {
                state.entries.remove(remote_path);
                Ok(())
            }
            _ => Err(SyncError::transfer(remote_path, "550 remove directory failed")),
        }
    }

    async fn modified_time(&self, remote_path: &str) -> Option<Timestamp> {
        if self.no_mtime.contains(remote_path) {
            return None;
        }
        let state = self.state.lock().unwrap();
        state.entries.get(remote_path).and_then(|e| e.modified)
    }

    async fn current_dir(&self) -> Result<String> {
        Ok("/".to_string())
    }

    async fn exists(&self, remote_path: &str) -> Result<bool> {
        Ok(remote_path == "/" || self.state.lock().unwrap().entries.contains_key(remote_path))
    }

    async fn create_dir(&self, remote_path: &str) -> Result<()> {
        self.record(format!("create_dir {}", remote_path));
        self.check_connection()?;
        let mut state = self.state.lock().unwrap();
        let mut current = String::new();
        for part in remote_path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(part);
            state
                .entries
                .entry(current.clone())
                .or_insert_with(|| Entry::dir(current.clone()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
