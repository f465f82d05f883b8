use anyhow::Context;
use dirsync_lib::logging::{self, get_log_dir};
use dirsync_lib::storage::{create_remote_store, LocalFileSystem};
use dirsync_lib::{default_config_file, AppConfig, SyncEngine};
use std::path::PathBuf;
use std::process::ExitCode;

async fn run() -> anyhow::Result<bool> {
    let config_file = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_file);

    let config = AppConfig::load(&config_file)
        .with_context(|| format!("加载配置失败: {}", config_file.display()))?;

    logging::init(&config.log, &get_log_dir());
    tracing::info!("配置文件: {}", config_file.display());

    let remote = create_remote_store(&config.sync.remote).context("创建远程存储失败")?;
    let local = LocalFileSystem::new();
    let engine = SyncEngine::new(config.sync);

    if engine.config().dry_run {
        let plan = engine.analyze(&local, remote.as_ref()).await?;
        for entry in &plan.to_upload {
            println!("UPLOAD  {}", entry.path);
        }
        for entry in &plan.to_delete {
            println!("DELETE  {}", entry.path);
        }
        for entry in &plan.to_update {
            println!("UPDATE  {}", entry.path);
        }
        return Ok(true);
    }

    let report = engine.run(&local, remote.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("同步失败");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("dirsync: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
