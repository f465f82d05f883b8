//! 同步错误类型

use thiserror::Error;

/// 同步过程中的错误
///
/// `Transfer` 只影响单个条目，由执行器记录后继续；其余类型都会终止整个同步。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 无法列出目录树（根目录不存在或无权限）
    #[error("无法列出 {root}: {reason}")]
    Listing { root: String, reason: String },

    /// 路径不在预期的根目录下
    #[error("路径 {path} 不在根目录 {root} 之下")]
    Mapping { path: String, root: String },

    /// 单个条目的传输/删除失败
    #[error("{path}: {reason}")]
    Transfer { path: String, reason: String },

    /// 连接层错误
    #[error("连接错误: {0}")]
    Connection(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl SyncError {
    pub fn listing(root: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Listing {
            root: root.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transfer(path: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Transfer {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否为单条目错误（执行器可以跳过并继续）
    pub fn is_per_entry(&self) -> bool {
        matches!(self, SyncError::Transfer { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transfer_is_per_entry() {
        assert!(SyncError::transfer("/r/a.txt", "550").is_per_entry());
        assert!(!SyncError::listing("/r", "denied").is_per_entry());
        assert!(!SyncError::Connection("reset".into()).is_per_entry());
        assert!(!SyncError::Mapping {
            path: "/x".into(),
            root: "/r".into()
        }
        .is_per_entry());
    }
}
