use crate::config::SyncConfig;
use crate::core::error::{Result, SyncError};
use crate::core::executor::{PassStats, PlanExecutor};
use crate::core::mapper::PathMapper;
use crate::core::reconciler::{Reconciler, SyncPlan};
use crate::core::scanner::FileScanner;
use crate::core::tree::{clean_path, join_path, normalize_path, Tree};
use crate::storage::{LocalStore, RemoteStore};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, warn};

/// 同步结果状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    CompletedWithErrors,
    /// 某一遍计划非空但没有任何成功
    Failed,
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: String,
    pub local_root: String,
    pub remote_root: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: SyncStatus,
    pub local_entries: usize,
    pub remote_entries: usize,
    pub uploaded: PassStats,
    pub deleted: PassStats,
    pub updated: PassStats,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn resolve_status(&self) -> SyncStatus {
        let passes = [&self.uploaded, &self.deleted, &self.updated];
        if passes.iter().any(|p| p.is_total_failure()) {
            SyncStatus::Failed
        } else if passes.iter().any(|p| p.failed > 0) {
            SyncStatus::CompletedWithErrors
        } else {
            SyncStatus::Completed
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != SyncStatus::Failed
    }
}

/// 一次同步所需的快照
struct Snapshot {
    mapper: PathMapper,
    local: Tree,
    remote: Tree,
}

/// 同步引擎
///
/// 所有远程调用按顺序逐个执行，不并发。
pub struct SyncEngine {
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// 远程根目录：相对路径基于远程当前工作目录
    async fn resolve_remote_root(&self, remote: &dyn RemoteStore) -> Result<String> {
        let dir = normalize_path(&self.config.remote_dir);
        let resolved = if dir.starts_with('/') {
            dir
        } else {
            let cwd = normalize_path(&remote.current_dir().await?);
            if dir.is_empty() {
                cwd
            } else {
                join_path(&cwd, &dir)
            }
        };
        Ok(clean_path(&resolved))
    }

    /// 确保远程根目录存在
    async fn ensure_remote_root(&self, remote: &dyn RemoteStore, root: &str) -> Result<()> {
        if remote.exists(root).await? {
            return Ok(());
        }
        if self.config.create_remote_dir {
            info!("远程目录不存在，自动创建: {}", root);
            if let Err(e) = remote.create_dir(root).await {
                if !e.is_per_entry() {
                    return Err(e);
                }
                warn!("创建远程目录失败: {}", e);
            }
        }
        if !remote.exists(root).await? {
            return Err(SyncError::listing(root, "远程目录不存在且无法创建"));
        }
        Ok(())
    }

    async fn snapshot(
        &self,
        local: &dyn LocalStore,
        remote: &dyn RemoteStore,
        create_root: bool,
    ) -> Result<Snapshot> {
        let local_root = normalize_path(&self.config.local_dir);
        let remote_root = self.resolve_remote_root(remote).await?;
        info!("本地目录 [{}] -> 远程目录 [{}]", local_root, remote_root);

        let scanner = FileScanner::with_config(self.config.scan.clone());
        let local_tree = scanner.scan_local(local, &local_root).await?;

        let remote_tree = if create_root {
            self.ensure_remote_root(remote, &remote_root).await?;
            scanner.scan_remote(remote, &remote_root).await?
        } else if remote.exists(&remote_root).await? {
            scanner.scan_remote(remote, &remote_root).await?
        } else {
            Tree::new()
        };

        if local_tree.is_empty() {
            info!("本地目录为空");
        }
        if remote_tree.is_empty() {
            info!("远程目录为空");
        }

        Ok(Snapshot {
            mapper: PathMapper::new(&local_root, &remote_root),
            local: local_tree,
            remote: remote_tree,
        })
    }

    /// 只分析差异，不修改远程存储
    pub async fn analyze(
        &self,
        local: &dyn LocalStore,
        remote: &dyn RemoteStore,
    ) -> Result<SyncPlan> {
        let snapshot = self.snapshot(local, remote, false).await?;
        let plan = Reconciler::new(&snapshot.mapper).plan(&snapshot.local, &snapshot.remote)?;
        let summary = plan.summary();
        info!(
            "分析完成: 上传 {}, 删除 {}, 更新 {}",
            summary.upload_count, summary.delete_count, summary.update_count
        );
        Ok(plan)
    }

    /// 运行同步：上传新条目 -> 删除多余条目 -> 重新上传过期文件
    pub async fn run(&self, local: &dyn LocalStore, remote: &dyn RemoteStore) -> Result<SyncReport> {
        let started = Instant::now();
        let start_time = chrono::Utc::now().timestamp();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("开始同步 ({}), 远程存储: {}", run_id, remote.name());

        let Snapshot {
            mapper,
            local: local_tree,
            remote: mut remote_tree,
        } = match self.snapshot(local, remote, true).await {
            Ok(s) => s,
            Err(e) => {
                error!("扫描失败: {}", e);
                return Err(e);
            }
        };

        let local_entries = local_tree.len();
        let remote_entries = remote_tree.len();
        let reconciler = Reconciler::new(&mapper);
        let executor = PlanExecutor::new(remote, &mapper);
        let mut errors = Vec::new();

        // 第一遍：上传新文件
        info!("*** 上传新文件 ***");
        let to_upload = reconciler.new_entries(&local_tree, &remote_tree)?;
        let uploaded = executor.upload_new(&to_upload).await?;
        remote_tree.extend(uploaded.created);
        errors.extend(uploaded.errors);

        // 第二遍：删除本地已不存在的远程条目
        info!("*** 删除远程多余条目 ***");
        let to_delete = reconciler.orphaned_entries(&local_tree, &remote_tree)?;
        let deleted = executor.delete_orphans(&to_delete).await?;
        for path in &deleted.done {
            remote_tree.remove(path);
        }
        errors.extend(deleted.errors);

        // 第三遍：重新上传过期文件
        info!("*** 更新过期文件 ***");
        let to_update = reconciler.stale_entries(&local_tree, &remote_tree, &to_upload)?;
        let updated = executor.update_stale(&to_update).await?;
        errors.extend(updated.errors);

        let mut report = SyncReport {
            run_id,
            local_root: mapper.local_root().to_string(),
            remote_root: mapper.remote_root().to_string(),
            start_time,
            end_time: chrono::Utc::now().timestamp(),
            status: SyncStatus::Completed,
            local_entries,
            remote_entries,
            uploaded: uploaded.stats,
            deleted: deleted.stats,
            updated: updated.stats,
            duration_ms: started.elapsed().as_millis() as u64,
            errors,
        };
        report.status = report.resolve_status();

        info!(
            "同步结束: {:?}, 上传 {}/{}, 删除 {}/{}, 更新 {}/{}",
            report.status,
            report.uploaded.succeeded,
            report.uploaded.planned,
            report.deleted.succeeded,
            report.deleted.planned,
            report.updated.succeeded,
            report.updated.planned,
        );

        Ok(report)
    }
}
