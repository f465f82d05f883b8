use super::{RemoteStore, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use crate::core::{Entry, Result, SyncError, Timestamp};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use opendal::{layers::TimeoutLayer, Builder, ErrorKind, Metakey, Operator};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// 基于 OpenDAL 的远程存储（fs / ftp / webdav / s3）
pub struct OpendalStore {
    operator: Operator,
    name: String,
}

impl OpendalStore {
    fn build(builder: impl Builder, name: String) -> Result<Self> {
        // 添加超时层
        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Connection(e.to_string()))?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();
        Ok(Self { operator, name })
    }

    pub fn fs(root: &str) -> Result<Self> {
        let builder = opendal::services::Fs::default().root(root);
        Self::build(builder, format!("fs://{}", root))
    }

    pub fn ftp(endpoint: &str, username: &str, password: &str, root: Option<&str>) -> Result<Self> {
        let mut builder = opendal::services::Ftp::default()
            .endpoint(endpoint)
            .user(username)
            .password(password);
        if let Some(r) = root {
            builder = builder.root(r);
        }
        Self::build(builder, format!("ftp://{}{}", endpoint, display_root(root)))
    }

    pub fn webdav(
        endpoint: &str,
        username: &str,
        password: &str,
        root: Option<&str>,
    ) -> Result<Self> {
        let mut builder = opendal::services::Webdav::default()
            .endpoint(endpoint)
            .username(username)
            .password(password);
        if let Some(r) = root {
            builder = builder.root(r);
        }
        let name = format!(
            "webdav://{}{}",
            endpoint.trim_end_matches('/'),
            display_root(root)
        );
        Self::build(builder, name)
    }

    pub fn s3(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<&str>,
        root: Option<&str>,
    ) -> Result<Self> {
        let mut builder = opendal::services::S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);
        if let Some(ep) = endpoint {
            builder = builder.endpoint(ep);
        }
        if let Some(r) = root {
            builder = builder.root(r);
        }
        Self::build(builder, format!("s3://{}{}", bucket, display_root(root)))
    }

    /// 确保父目录存在（递归创建），忽略已存在的错误
    async fn create_parents(&self, path: &str) {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = String::new();
        for part in parts.iter().take(parts.len().saturating_sub(1)) {
            current.push_str(part);
            current.push('/');
            let _ = self.operator.create_dir(&current).await;
        }
    }
}

fn display_root(root: Option<&str>) -> String {
    root.map(|r| format!("/{}", r.trim_start_matches('/')))
        .unwrap_or_default()
}

/// 目录路径（OpenDAL 要求以 / 结尾）
fn dir_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// OpenDAL 返回的相对路径 -> 以 / 开头的远程路径
fn to_remote_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// 配置错误视为连接错误（终止同步），其余都只影响当前条目
fn classify(path: &str, err: opendal::Error) -> SyncError {
    match err.kind() {
        ErrorKind::ConfigInvalid => SyncError::Connection(err.to_string()),
        _ => SyncError::transfer(path, err),
    }
}

/// 收集列表结果；根目录之后的枚举错误只记录警告，保留已得到的条目
async fn collect_listing<S>(root: &str, mut stream: S) -> Vec<Entry>
where
    S: Stream<Item = std::result::Result<Entry, opendal::Error>> + Unpin,
{
    let root_path = to_remote_path(&dir_path(root));
    let mut entries = Vec::new();
    loop {
        match stream.try_next().await {
            Ok(Some(entry)) => {
                // 跳过根目录
                if entry.path != root_path {
                    entries.push(entry);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("列出 {} 时出错，跳过剩余条目: {}", root, e);
                break;
            }
        }
    }
    entries
}

#[async_trait]
impl RemoteStore for OpendalStore {
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>> {
        let dir = dir_path(root);
        match self.operator.stat(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SyncError::listing(root, "不是目录")),
            Err(e) => return Err(SyncError::listing(root, e)),
        }

        let lister = self
            .operator
            .lister_with(&dir)
            .recursive(true)
            .metakey(Metakey::Mode | Metakey::LastModified)
            .await
            .map_err(|e| SyncError::listing(root, e))?;

        let entries = lister.map_ok(|entry| {
            let meta = entry.metadata();
            Entry {
                path: to_remote_path(entry.path()),
                is_dir: meta.is_dir(),
                modified: meta.last_modified(),
            }
        });
        Ok(collect_listing(root, entries).await)
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let local_meta = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| SyncError::transfer(remote_path, e))?;

        if local_meta.is_dir() {
            return self.create_dir(remote_path).await;
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| SyncError::transfer(remote_path, e))?;
        let path = remote_path.trim_start_matches('/');
        self.create_parents(path).await;
        self.operator
            .write(path, data)
            .await
            .map_err(|e| classify(remote_path, e))?;
        Ok(())
    }

    async fn delete_file(&self, remote_path: &str) -> Result<()> {
        let meta = self
            .operator
            .stat(remote_path)
            .await
            .map_err(|e| classify(remote_path, e))?;
        if meta.is_dir() {
            return Err(SyncError::transfer(remote_path, "目标是目录"));
        }
        self.operator
            .delete(remote_path)
            .await
            .map_err(|e| classify(remote_path, e))
    }

    async fn remove_directory(&self, remote_path: &str) -> Result<()> {
        let dir = dir_path(remote_path);
        let meta = self
            .operator
            .stat(&dir)
            .await
            .map_err(|e| classify(remote_path, e))?;
        if !meta.is_dir() {
            return Err(SyncError::transfer(remote_path, "目标不是目录"));
        }
        self.operator
            .delete(&dir)
            .await
            .map_err(|e| classify(remote_path, e))
    }

    async fn modified_time(&self, remote_path: &str) -> Option<Timestamp> {
        match self.operator.stat(remote_path).await {
            Ok(meta) => meta.last_modified(),
            Err(e) => {
                debug!("获取修改时间失败: {} ({})", remote_path, e);
                None
            }
        }
    }

    async fn current_dir(&self) -> Result<String> {
        // 操作符的 root 即工作目录
        Ok("/".to_string())
    }

    async fn exists(&self, remote_path: &str) -> Result<bool> {
        for candidate in [remote_path.to_string(), dir_path(remote_path)] {
            match self.operator.stat(&candidate).await {
                Ok(_) => return Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(classify(remote_path, e)),
            }
        }
        Ok(false)
    }

    async fn create_dir(&self, remote_path: &str) -> Result<()> {
        let dir = dir_path(remote_path);
        self.create_parents(dir.trim_end_matches('/')).await;
        self.operator
            .create_dir(&dir)
            .await
            .map_err(|e| classify(remote_path, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
