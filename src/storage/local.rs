use super::LocalStore;
use crate::core::{normalize_path, Entry, Result, SyncError, Timestamp};
use async_trait::async_trait;
use chrono::DateTime;
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// 本地文件系统
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// 截断到整秒（与 FTP MDTM 的精度一致）
fn to_timestamp(time: std::time::SystemTime) -> Option<Timestamp> {
    let secs = time.duration_since(std::time::UNIX_EPOCH).ok()?.as_secs() as i64;
    DateTime::from_timestamp(secs, 0)
}

#[async_trait]
impl LocalStore for LocalFileSystem {
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>> {
        let base = PathBuf::from(root);
        match fs::metadata(&base).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SyncError::listing(root, "不是目录")),
            Err(e) => return Err(SyncError::listing(root, e)),
        }

        let root_str = normalize_path(root);

        // 使用 spawn_blocking 避免阻塞 async runtime
        let entries = tokio::task::spawn_blocking(move || {
            WalkDir::new(&base)
                .follow_links(false)
                .min_depth(1)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("跳过无法读取的条目: {}", e);
                        None
                    }
                })
                .filter_map(|entry| {
                    let relative = entry.path().strip_prefix(&base).ok()?;
                    let Some(relative) = relative.to_str() else {
                        warn!("跳过非 UTF-8 路径: {}", entry.path().to_string_lossy());
                        return None;
                    };
                    let path = crate::core::join_path(&root_str, &normalize_path(relative));
                    Some(Entry {
                        path,
                        is_dir: entry.file_type().is_dir(),
                        modified: None,
                    })
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| SyncError::listing(root, e))?;

        Ok(entries)
    }

    async fn modified_time(&self, path: &str) -> Result<Timestamp> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| SyncError::transfer(path, e))?;
        let modified = meta.modified().map_err(|e| SyncError::transfer(path, e))?;
        to_timestamp(modified).ok_or_else(|| SyncError::transfer(path, "修改时间早于 1970"))
    }

    async fn is_file(&self, path: &str) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_files_and_dirs_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("dir")).unwrap();
        std::fs::write(dir.path().join("dir").join("b.txt"), b"b").unwrap();

        let root = normalize_path(&dir.path().to_string_lossy());
        let fs = LocalFileSystem::new();
        let mut entries = fs.list_recursive(&root).await.unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                format!("{}/a.txt", root),
                format!("{}/dir", root),
                format!("{}/dir/b.txt", root),
            ]
        );
        assert!(entries[1].is_dir);
        assert!(entries.iter().all(|e| e.modified.is_none()));

        assert!(fs.is_file(&paths[0]).await);
        assert!(!fs.is_file(&paths[1]).await);
        let mtime = fs.modified_time(&paths[0]).await.unwrap();
        assert_eq!(mtime.timestamp_subsec_nanos(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_listing_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = LocalFileSystem::new()
            .list_recursive(&missing.to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Listing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.txt"), b"a").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), b"b").unwrap();

        let root = normalize_path(&dir.path().to_string_lossy());
        let entries = LocalFileSystem::new().list_recursive(&root).await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![format!("{}/ok.txt", root)]);
    }
}
