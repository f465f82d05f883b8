pub mod local;
pub mod remote;

#[cfg(test)]
pub mod memory;

use crate::config::{StorageConfig, StorageType};
use crate::core::{Entry, Result, SyncError, Timestamp};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use local::LocalFileSystem;
pub use remote::OpendalStore;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- stat, delete 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- read, write 等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 远程存储接口
///
/// 所有路径都是以 / 开头的完整远程路径。单条目失败返回 `SyncError::Transfer`，
/// 连接层失败返回 `SyncError::Connection`。
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 递归列出 root 下的所有文件和目录（不含 root 本身）
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>>;

    /// 上传本地文件；本地路径是目录时创建远程目录
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()>;

    /// 删除文件，目标是目录时失败
    async fn delete_file(&self, remote_path: &str) -> Result<()>;

    /// 删除（空）目录
    async fn remove_directory(&self, remote_path: &str) -> Result<()>;

    /// 获取修改时间，无法获取时返回 None
    async fn modified_time(&self, remote_path: &str) -> Option<Timestamp>;

    /// 当前工作目录
    async fn current_dir(&self) -> Result<String>;

    async fn exists(&self, remote_path: &str) -> Result<bool>;

    /// 创建目录（含父目录）
    async fn create_dir(&self, remote_path: &str) -> Result<()>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 本地文件系统接口
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// 递归列出 root 下的所有文件和目录（不含 root 本身），不填充修改时间
    async fn list_recursive(&self, root: &str) -> Result<Vec<Entry>>;

    async fn modified_time(&self, path: &str) -> Result<Timestamp>;

    async fn is_file(&self, path: &str) -> bool;
}

/// 根据配置创建远程存储实例
pub fn create_remote_store(config: &StorageConfig) -> Result<Arc<dyn RemoteStore>> {
    let require = |field: &Option<String>, what: &str| {
        field
            .clone()
            .ok_or_else(|| SyncError::Config(format!("{:?} storage requires {}", config.typ, what)))
    };

    let store = match config.typ {
        StorageType::Fs => {
            let root = require(&config.root, "root")?;
            tracing::info!("初始化本地目录存储: {}", root);
            OpendalStore::fs(&root)?
        }
        StorageType::Ftp => {
            let endpoint = require(&config.endpoint, "endpoint")?;
            let username = require(&config.username, "username")?;
            let password = require(&config.password, "password")?;
            tracing::info!("初始化FTP存储: endpoint={}", endpoint);
            OpendalStore::ftp(&endpoint, &username, &password, config.root.as_deref())?
        }
        StorageType::WebDav => {
            let endpoint = require(&config.endpoint, "endpoint")?;
            let username = require(&config.username, "username")?;
            let password = require(&config.password, "password")?;
            tracing::info!("初始化WebDAV存储: endpoint={}, root={:?}", endpoint, config.root);
            OpendalStore::webdav(&endpoint, &username, &password, config.root.as_deref())?
        }
        StorageType::S3 => {
            let bucket = require(&config.bucket, "bucket")?;
            let region = require(&config.region, "region")?;
            let access_key = require(&config.accessKey, "accessKey")?;
            let secret_key = require(&config.secretKey, "secretKey")?;
            tracing::info!("初始化S3存储: bucket={}, region={}", bucket, region);
            OpendalStore::s3(
                &bucket,
                &region,
                &access_key,
                &secret_key,
                config.endpoint.as_deref(),
                config.root.as_deref(),
            )?
        }
    };

    Ok(Arc::new(store) as Arc<dyn RemoteStore>)
}
