use super::error::{Result, SyncError};
use super::mapper::PathMapper;
use super::tree::Entry;
use crate::storage::RemoteStore;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// 单遍执行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl PassStats {
    fn new(planned: usize) -> Self {
        Self {
            planned,
            ..Default::default()
        }
    }

    /// 计划非空但全部失败
    pub fn is_total_failure(&self) -> bool {
        self.planned > 0 && self.succeeded == 0
    }
}

/// 上传结果，包含新建的远程条目
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub stats: PassStats,
    pub created: Vec<Entry>,
    pub errors: Vec<String>,
}

/// 删除/更新结果
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub stats: PassStats,
    /// 成功处理的远程路径
    pub done: Vec<String>,
    pub errors: Vec<String>,
}

/// 计划执行器
///
/// 每个条目只尝试一次，单条目失败记录后继续；其余错误直接返回。
pub struct PlanExecutor<'a> {
    store: &'a dyn RemoteStore,
    mapper: &'a PathMapper,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(store: &'a dyn RemoteStore, mapper: &'a PathMapper) -> Self {
        Self { store, mapper }
    }

    /// 处理单条目错误：可跳过的记录下来，其余向上传播
    fn absorb(err: SyncError, errors: &mut Vec<String>) -> Result<()> {
        if err.is_per_entry() {
            warn!("{}", err);
            errors.push(err.to_string());
            Ok(())
        } else {
            Err(err)
        }
    }

    /// 上传新条目（本地路径形式）
    pub async fn upload_new(&self, entries: &[Entry]) -> Result<UploadOutcome> {
        let mut outcome = UploadOutcome {
            stats: PassStats::new(entries.len()),
            ..Default::default()
        };

        for entry in entries {
            let remote_path = self.mapper.to_remote(&entry.path)?;
            match self.store.upload(Path::new(&entry.path), &remote_path).await {
                Ok(()) => {
                    debug!("已上传: {} -> {}", entry.path, remote_path);
                    outcome.stats.succeeded += 1;
                    let modified = if entry.is_dir {
                        None
                    } else {
                        self.store.modified_time(&remote_path).await
                    };
                    outcome.created.push(Entry {
                        path: remote_path,
                        is_dir: entry.is_dir,
                        modified,
                    });
                }
                Err(e) => {
                    outcome.stats.failed += 1;
                    Self::absorb(e, &mut outcome.errors)?;
                }
            }
        }

        info!(
            "新文件上传: {}/{} 成功",
            outcome.stats.succeeded, outcome.stats.planned
        );
        Ok(outcome)
    }

    /// 删除远程条目：先按文件删除，失败再按目录删除
    pub async fn delete_orphans(&self, entries: &[Entry]) -> Result<PassOutcome> {
        let mut outcome = PassOutcome {
            stats: PassStats::new(entries.len()),
            ..Default::default()
        };

        for entry in entries {
            let path = entry.path.as_str();
            let file_err = match self.store.delete_file(path).await {
                Ok(()) => {
                    debug!("已删除文件: {}", path);
                    outcome.stats.succeeded += 1;
                    outcome.done.push(path.to_string());
                    continue;
                }
                Err(e) if e.is_per_entry() => e,
                Err(e) => return Err(e),
            };

            match self.store.remove_directory(path).await {
                Ok(()) => {
                    debug!("已删除目录: {}", path);
                    outcome.stats.succeeded += 1;
                    outcome.done.push(path.to_string());
                }
                Err(dir_err) if dir_err.is_per_entry() => {
                    outcome.stats.failed += 1;
                    let err = SyncError::transfer(
                        path,
                        format!("无法删除 ({}; {})", file_err, dir_err),
                    );
                    Self::absorb(err, &mut outcome.errors)?;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "远程多余条目删除: {}/{} 成功",
            outcome.stats.succeeded, outcome.stats.planned
        );
        Ok(outcome)
    }

    /// 重新上传过期文件（远程路径形式）
    pub async fn update_stale(&self, entries: &[Entry]) -> Result<PassOutcome> {
        let mut outcome = PassOutcome {
            stats: PassStats::new(entries.len()),
            ..Default::default()
        };

        for entry in entries {
            let local_path = self.mapper.to_local(&entry.path)?;
            match self.store.upload(Path::new(&local_path), &entry.path).await {
                Ok(()) => {
                    debug!("已更新: {}", entry.path);
                    outcome.stats.succeeded += 1;
                    outcome.done.push(entry.path.clone());
                }
                Err(e) => {
                    outcome.stats.failed += 1;
                    Self::absorb(e, &mut outcome.errors)?;
                }
            }
        }

        info!(
            "过期文件更新: {}/{} 成功",
            outcome.stats.succeeded, outcome.stats.planned
        );
        Ok(outcome)
    }
}
