//! 应用配置模块
#![allow(non_snake_case)]

use crate::core::{ScanConfig, SyncError};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 远程存储类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Fs,
    Ftp,
    WebDav,
    S3,
}

/// 远程存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub typ: StorageType,
    /// 存储内的根目录（fs 为本机目录）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessKey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secretKey: Option<String>,
}

/// 同步配置，启动时构造一次，之后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// 本地目录
    pub local_dir: String,
    /// 远程目录，相对路径基于远程工作目录
    #[serde(default)]
    pub remote_dir: String,
    pub remote: StorageConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    /// 远程目录不存在时自动创建
    #[serde(default = "default_create_remote_dir")]
    pub create_remote_dir: bool,
    /// 只分析差异，不执行
    #[serde(default)]
    pub dry_run: bool,
}

fn default_create_remote_dir() -> bool {
    true
}

/// 配置文件内容
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 从配置文件加载
    pub fn load(config_file: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(config_file)
            .map_err(|e| SyncError::Config(format!("{}: {}", config_file.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SyncError> {
        let config: AppConfig =
            serde_json::from_str(content).map_err(|e| SyncError::Config(e.to_string()))?;
        if config.sync.local_dir.trim().is_empty() {
            return Err(SyncError::Config("localDir 不能为空".to_string()));
        }
        Ok(config)
    }
}
