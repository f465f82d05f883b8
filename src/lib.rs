use std::path::PathBuf;

pub mod config;
pub mod core;
pub mod logging;
pub mod storage;

pub use config::{AppConfig, StorageConfig, StorageType, SyncConfig};
pub use crate::core::{SyncEngine, SyncError, SyncPlan, SyncReport, SyncStatus};

/// 默认配置文件路径
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("dirsync"))
        .unwrap_or_else(|| PathBuf::from(".dirsync"))
        .join("config.json")
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
