mod app_list;
mod cli;
mod config;
mod error;
mod orchestrator;
mod package_manager;
mod report;

use anyhow::{bail, Result};
use app_list::{AppEntry, AppList};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use orchestrator::{ActionOrchestrator, BatchEvent};
use package_manager::types::same_id;
use package_manager::{Action, PackageManager, ProcessInvoker, UpdateSet};
use report::LogSaver;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // 加载配置：命令行指定 > 默认路径 > 内置默认值
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    let pm = PackageManager::from_config(&config);
    let tool = pm.probe();

    if let Commands::Probe = cli.command {
        if !tool.available {
            bail!("{} 不可用", pm.name());
        }
        println!("{} {}", pm.name(), tool.version.as_deref().unwrap_or(""));
        return Ok(());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let orch = ActionOrchestrator::new(pm, tool, tx);
    let result = run(&orch, &config, cli.command).await;

    // 发送端随编排器释放，打印任务随之结束
    drop(orch);
    printer.await?;

    result
}

async fn run(
    orch: &ActionOrchestrator<ProcessInvoker>,
    config: &Config,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Probe => {}
        Commands::Search { query } => {
            for row in orch.search(&query).await? {
                println!("{:<40} {:<40} {}", row.name, row.id, row.version);
            }
        }
        Commands::Updates => {
            print_updates(&orch.refresh_updates().await?);
        }
        Commands::UpgradeAll { only } => {
            let mut set = orch.refresh_updates().await?;
            if !only.is_empty() {
                let ids: Vec<String> = set.rows().iter().map(|r| r.id.clone()).collect();
                for id in ids {
                    if !only.iter().any(|wanted| same_id(wanted, &id)) {
                        set.set_selected(&id, false);
                    }
                }
            }
            let run = orch.apply_updates(&set).await?;
            save_log(config, orch, &run.report.log);

            if let Some(refreshed) = &run.refreshed {
                println!();
                print_updates(refreshed);
            }
        }
        Commands::Apply { tab } => {
            let list = AppList::load(&config.app_list);
            let report = orch.apply(list.to_requests(&tab)?).await?;
            save_log(config, orch, &report.log);

            println!();
            for (id, status) in report.statuses.iter() {
                println!("{:<40} {}", id, status);
            }
        }
        Commands::Add {
            id,
            name,
            action,
            tab,
        } => {
            let id = id.trim().to_string();
            if !orch.package_exists(&id).await? {
                bail!("源中找不到 ID 为 {} 的包", id);
            }

            let mut list = AppList::load(&config.app_list);
            let entry = AppEntry {
                name: name.unwrap_or_else(|| id.clone()),
                id,
                action: Action::normalize(Some(&action)),
            };
            list.add(&tab, entry)?;
            list.save(&config.app_list)?;
            println!("已加入分组 {}", tab);
        }
    }
    Ok(())
}

fn print_updates(set: &UpdateSet) {
    if set.is_empty() {
        println!("没有已安装的包");
        return;
    }
    for row in set.rows() {
        let marker = if row.selected { "*" } else { " " };
        println!(
            "{} {:<40} {:<40} {:<16} {}",
            marker, row.name, row.id, row.version, row.available
        );
    }
}

fn save_log(config: &Config, orch: &ActionOrchestrator<ProcessInvoker>, lines: &[String]) {
    if !config.save_logs || lines.is_empty() {
        return;
    }
    let saver = LogSaver::new(config.log_dir.clone());
    if let Err(e) = saver.save(lines, orch.package_manager().name()) {
        log::warn!("保存执行日志失败: {}", e);
    }
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<BatchEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Started { total } => println!("共 {} 项", total),
            BatchEvent::Status { id, status } => println!("[{}] {}", id, status),
            BatchEvent::Log(line) => println!("{}", line),
            BatchEvent::Finished => println!("完成"),
            BatchEvent::UpdatesRefreshed(rows) => {
                let pending = rows.iter().filter(|r| r.selected).count();
                log::info!("更新列表: {} 项，其中 {} 项可升级", rows.len(), pending);
            }
        }
    }
}
