use super::error::Result;
use super::tree::{normalize_path, Entry, Tree};
use crate::storage::{LocalStore, RemoteStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 文件扫描器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// 排除规则（glob patterns，相对于根目录），两侧使用同一套规则
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// 文件扫描器：生成某个根目录的完整递归快照
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 检查路径是否应该被排除
    fn should_exclude(&self, relative: &str) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| matches_pattern(relative, pattern))
    }

    /// 按排除规则过滤，返回保留的条目
    fn filter(&self, root: &str, entries: Vec<Entry>) -> Vec<Entry> {
        let root = normalize_path(root);
        let prefix = if root.ends_with('/') {
            root
        } else {
            format!("{}/", root)
        };

        entries
            .into_iter()
            .filter(|entry| {
                let relative = entry.path.strip_prefix(&prefix).unwrap_or(&entry.path);
                if self.should_exclude(relative) {
                    debug!("排除: {}", entry.path);
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// 扫描本地目录，为每个文件读取修改时间
    pub async fn scan_local(&self, store: &dyn LocalStore, root: &str) -> Result<Tree> {
        info!("开始扫描本地目录: {}", root);

        let entries = self.filter(root, store.list_recursive(root).await?);
        let mut tree = Tree::new();

        for mut entry in entries {
            if entry.modified.is_none() && store.is_file(&entry.path).await {
                match store.modified_time(&entry.path).await {
                    Ok(t) => entry.modified = Some(t),
                    Err(e) => warn!("无法获取修改时间: {}", e),
                }
            }
            if tree.contains(&entry.path) {
                warn!("重复路径，已忽略: {}", entry.path);
                continue;
            }
            tree.insert(entry);
        }

        info!("本地扫描完成: {} 个条目", tree.len());
        Ok(tree)
    }

    /// 扫描远程目录；修改时间获取失败的条目保留，但不带时间
    pub async fn scan_remote(&self, store: &dyn RemoteStore, root: &str) -> Result<Tree> {
        info!("开始扫描远程存储: {}, root: {}", store.name(), root);

        let entries = self.filter(root, store.list_recursive(root).await?);
        let mut tree = Tree::new();
        let mut missing_mtime = 0;

        for mut entry in entries {
            if entry.modified.is_none() && !entry.is_dir {
                entry.modified = store.modified_time(&entry.path).await;
                if entry.modified.is_none() {
                    missing_mtime += 1;
                }
            }
            if tree.contains(&entry.path) {
                warn!("重复路径，已忽略: {}", entry.path);
                continue;
            }
            tree.insert(entry);
        }

        info!(
            "远程扫描完成: {} 个条目, {} 个无修改时间",
            tree.len(),
            missing_mtime
        );
        Ok(tree)
    }
}

/// 简单的 glob 模式匹配
///
/// 不含 / 的规则只匹配文件名，含 / 的规则匹配完整相对路径。
fn matches_pattern(path: &str, pattern: &str) -> bool {
    let path = path.to_lowercase();
    let pattern = pattern.to_lowercase();

    // 处理 ** 通配符
    if let Some((prefix, suffix)) = pattern.split_once("**") {
        if !suffix.contains("**") {
            let prefix = prefix.trim_end_matches('/');
            let suffix = suffix.trim_start_matches('/');

            if !prefix.is_empty() && !(path == prefix || path.starts_with(&format!("{}/", prefix))) {
                return false;
            }
            if suffix.is_empty() {
                return true;
            }

            // 后缀可以匹配剩余路径的任意一段尾部
            let mut tail = path[prefix.len()..].trim_start_matches('/');
            loop {
                if glob_match(tail, suffix) {
                    return true;
                }
                match tail.find('/') {
                    Some(i) => tail = &tail[i + 1..],
                    None => return false,
                }
            }
        }
    }

    let target = if pattern.contains('/') {
        path.as_str()
    } else {
        path.rsplit('/').next().unwrap_or(&path)
    };
    glob_match(target, &pattern)
}

/// 单段 * 通配符匹配，* 不跨越 /
fn glob_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return text == pattern;
    }
    let regex_pattern = regex::escape(pattern).replace("\\*", "[^/]*");
    regex::Regex::new(&format!("^{}$", regex_pattern))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
