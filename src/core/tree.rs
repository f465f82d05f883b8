use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type Timestamp = DateTime<Utc>;

/// 目录树中的一个条目（文件或目录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// 以树根目录开头、用 / 分隔的完整路径
    pub path: String,
    pub is_dir: bool,
    pub modified: Option<Timestamp>,
}

impl Entry {
    pub fn file(path: impl Into<String>, modified: Option<Timestamp>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            modified,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            modified: None,
        }
    }

    /// 路径层级深度
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// 某个根目录在某一时刻的完整递归快照
///
/// 保持插入顺序，路径唯一。
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: Vec<Entry>,
    paths: HashSet<String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加条目，路径已存在时返回 false
    pub fn insert(&mut self, entry: Entry) -> bool {
        if !self.paths.insert(entry.path.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        if !self.contains(path) {
            return None;
        }
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        if !self.paths.remove(path) {
            return None;
        }
        let pos = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Entry> for Tree {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut tree = Tree::new();
        for entry in iter {
            tree.insert(entry);
        }
        tree
    }
}

impl Extend<Entry> for Tree {
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// 规范化路径分隔符（统一使用 /），去掉末尾的 /
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 解析路径中的 . 和 ..，不会越过根目录
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    let joined = parts.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// 拼接根目录与相对路径
pub fn join_path(root: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if root.ends_with('/') {
        format!("{}{}", root, relative)
    } else {
        format!("{}/{}", root, relative)
    }
}
