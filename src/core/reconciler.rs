//! 三遍比较：新文件 / 远程多余文件 / 过期文件

use super::error::Result;
use super::mapper::PathMapper;
use super::tree::{Entry, Timestamp, Tree};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 同步计划
///
/// `to_upload` 使用本地路径，`to_delete` 和 `to_update` 使用远程路径。
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncPlan {
    pub to_upload: Vec<Entry>,
    pub to_delete: Vec<Entry>,
    pub to_update: Vec<Entry>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            upload_count: self.to_upload.len(),
            delete_count: self.to_delete.len(),
            update_count: self.to_update.len(),
        }
    }
}

/// 计划统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub upload_count: usize,
    pub delete_count: usize,
    pub update_count: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.upload_count + self.delete_count + self.update_count
    }
}

/// 目录树比较器
pub struct Reconciler<'a> {
    mapper: &'a PathMapper,
}

impl<'a> Reconciler<'a> {
    pub fn new(mapper: &'a PathMapper) -> Self {
        Self { mapper }
    }

    /// 第一遍：远程不存在的本地条目（文件和目录）
    pub fn new_entries(&self, local: &Tree, remote: &Tree) -> Result<Vec<Entry>> {
        let mut result = Vec::new();
        for entry in local.iter() {
            if !remote.contains(&self.mapper.to_remote(&entry.path)?) {
                result.push(entry.clone());
            }
        }
        debug!("新条目: {}", result.len());
        Ok(result)
    }

    /// 第二遍：本地不存在的远程条目
    ///
    /// `remote` 必须已经合并了第一遍上传成功的条目。结果中子路径排在父目录之前。
    pub fn orphaned_entries(&self, local: &Tree, remote: &Tree) -> Result<Vec<Entry>> {
        let mut result = Vec::new();
        for entry in remote.iter() {
            if !local.contains(&self.mapper.to_local(&entry.path)?) {
                result.push(entry.clone());
            }
        }
        // 稳定排序，深度相同的保持原顺序
        result.sort_by_key(|e| std::cmp::Reverse(e.depth()));
        debug!("远程多余条目: {}", result.len());
        Ok(result)
    }

    /// 第三遍：本地比远程新的文件
    ///
    /// 远程没有修改时间的条目视为过期。`skip` 中的本地条目（本次已作为新文件上传）不再选中。
    pub fn stale_entries(&self, local: &Tree, remote: &Tree, skip: &[Entry]) -> Result<Vec<Entry>> {
        let remote_times: HashMap<&str, Timestamp> = remote
            .iter()
            .filter_map(|e| e.modified.map(|t| (e.path.as_str(), t)))
            .collect();
        let skip: HashSet<&str> = skip.iter().map(|e| e.path.as_str()).collect();

        let mut result = Vec::new();
        for entry in local.iter().filter(|e| !e.is_dir) {
            if skip.contains(entry.path.as_str()) {
                continue;
            }
            let remote_path = self.mapper.to_remote(&entry.path)?;
            let stale = match (entry.modified, remote_times.get(remote_path.as_str())) {
                (_, None) => true,
                (Some(local_time), Some(remote_time)) => local_time > *remote_time,
                (None, Some(_)) => false,
            };
            if stale {
                debug!("远程文件已过期: {}", remote_path);
                result.push(Entry {
                    path: remote_path,
                    is_dir: false,
                    modified: entry.modified,
                });
            }
        }
        Ok(result)
    }

    /// 不执行任何操作，计算完整计划（假设所有上传都成功）
    pub fn plan(&self, local: &Tree, remote: &Tree) -> Result<SyncPlan> {
        let to_upload = self.new_entries(local, remote)?;
        // 新上传的条目都能映射回本地，不会出现在删除列表中
        let to_delete = self.orphaned_entries(local, remote)?;

        let mut surviving = remote.clone();
        for entry in &to_delete {
            surviving.remove(&entry.path);
        }
        let to_update = self.stale_entries(local, &surviving, &to_upload)?;

        Ok(SyncPlan {
            to_upload,
            to_delete,
            to_update,
        })
    }
}
