//! 批量操作编排
//!
//! 所有外部调用都在阻塞线程池中逐个执行，同一时刻只有一个调用在跑。
//! 每一项的结果都只影响该项自身的状态，失败不会中断整批。
//! 状态与日志通过事件通道单向推送给界面层。

use crate::error::{AdapterError, AdapterResult};
use crate::package_manager::exit_codes;
use crate::package_manager::types::same_id;
use crate::package_manager::{
    normalize_output, Action, ActionRequest, CommandResult, Invoker, OutcomeCategory, PackageManager,
    SearchRow, ToolStatus, UpdateRow, UpdateSet,
};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const STATUS_OK: &str = "OK";
pub const STATUS_UP_TO_DATE: &str = "already up to date";
pub const STATUS_ALREADY_INSTALLED: &str = "already installed";
pub const STATUS_PAUSED: &str = "paused";

// ========== 事件 ==========

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started { total: usize },
    Status { id: String, status: String },
    Log(String),
    Finished,
    UpdatesRefreshed(Vec<UpdateRow>),
}

/// 每个包 ID 的最新状态（ID 不区分大小写，保持首次出现的顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
    entries: Vec<(String, String)>,
}

impl StatusBoard {
    pub fn set(&mut self, id: &str, status: &str) {
        match self.entries.iter_mut().find(|(key, _)| same_id(key, id)) {
            Some(entry) => entry.1 = status.to_string(),
            None => self.entries.push((id.to_string(), status.to_string())),
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| same_id(key, id))
            .map(|(_, status)| status.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, status)| (id.as_str(), status.as_str()))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub statuses: StatusBoard,
    pub log: Vec<String>,
}

/// 应用更新的结果；`refreshed` 为结束后重新读取的更新列表
#[derive(Debug, Clone, Default)]
pub struct UpdateRun {
    pub report: BatchReport,
    pub refreshed: Option<UpdateSet>,
}

/// 运行互斥标记，离开作用域时自动释放
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool, label: &'static str) -> AdapterResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AdapterError::AlreadyRunning(label))?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Upgrade,
    Install,
    Uninstall,
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Upgrade => "upgrade",
            Step::Install => "install",
            Step::Uninstall => "uninstall",
        }
    }

    fn pending_status(&self) -> &'static str {
        match self {
            Step::Upgrade => "Upgrade...",
            Step::Install => "Install...",
            Step::Uninstall => "Uninstall...",
        }
    }
}

/// 一次运行中累积的状态与日志，同时推送事件
struct Batch<'a> {
    events: &'a mpsc::UnboundedSender<BatchEvent>,
    report: BatchReport,
}

impl<'a> Batch<'a> {
    fn new(events: &'a mpsc::UnboundedSender<BatchEvent>) -> Self {
        Self {
            events,
            report: BatchReport::default(),
        }
    }

    fn emit(&self, event: BatchEvent) {
        // 接收端已关闭时忽略
        let _ = self.events.send(event);
    }

    fn log(&mut self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.report.log.push(line.to_string());
            self.emit(BatchEvent::Log(line.to_string()));
        }
    }

    fn log_output(&mut self, raw: &str) {
        let normalized = normalize_output(raw);
        self.log(&normalized);
    }

    fn status(&mut self, id: &str, status: &str) {
        self.report.statuses.set(id, status);
        self.emit(BatchEvent::Status {
            id: id.to_string(),
            status: status.to_string(),
        });
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub struct ActionOrchestrator<I> {
    pm: Arc<PackageManager<I>>,
    tool: ToolStatus,
    events: mpsc::UnboundedSender<BatchEvent>,
    applying: AtomicBool,
    updating: AtomicBool,
}

impl<I: Invoker + 'static> ActionOrchestrator<I> {
    pub fn new(
        pm: PackageManager<I>,
        tool: ToolStatus,
        events: mpsc::UnboundedSender<BatchEvent>,
    ) -> Self {
        Self {
            pm: Arc::new(pm),
            tool,
            events,
            applying: AtomicBool::new(false),
            updating: AtomicBool::new(false),
        }
    }

    pub fn package_manager(&self) -> &PackageManager<I> {
        &self.pm
    }

    fn ensure_available(&self) -> AdapterResult<()> {
        if self.tool.available {
            Ok(())
        } else {
            Err(AdapterError::ToolUnavailable {
                tool: self.pm.name().to_string(),
            })
        }
    }

    /// 在阻塞线程池中执行一次调用
    async fn blocking<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&PackageManager<I>) -> T + Send + 'static,
    {
        let pm = Arc::clone(&self.pm);
        match tokio::task::spawn_blocking(move || f(&pm)).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("调用线程异常退出: {}", e);
                None
            }
        }
    }

    async fn run_step(&self, batch: &mut Batch<'_>, name: &str, id: &str, step: Step) -> CommandResult {
        batch.log(&format!("--- {} [{}] : {} ---", name, id, step.as_str()));

        let target = id.to_string();
        let result = self
            .blocking(move |pm| match step {
                Step::Upgrade => pm.upgrade(&target),
                Step::Install => pm.install(&target),
                Step::Uninstall => pm.uninstall(&target),
            })
            .await
            .unwrap_or_else(CommandResult::spawn_failed);

        log::info!("{} {} -> {}", step.as_str(), id, result.exit_code);
        batch.log_output(&result.output);
        result
    }

    pub async fn package_exists(&self, id: &str) -> AdapterResult<bool> {
        self.ensure_available()?;
        let id = id.to_string();
        Ok(self
            .blocking(move |pm| pm.package_exists(&id))
            .await
            .unwrap_or(false))
    }

    pub async fn search(&self, query: &str) -> AdapterResult<Vec<SearchRow>> {
        self.ensure_available()?;
        let query = query.to_string();
        self.blocking(move |pm| pm.search(&query))
            .await
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// 按快照顺序执行一批操作
    pub async fn apply(&self, requests: Vec<ActionRequest>) -> AdapterResult<BatchReport> {
        self.ensure_available()?;
        let _guard = RunGuard::acquire(&self.applying, "apply")?;

        let mut batch = Batch::new(&self.events);
        if requests.is_empty() {
            return Ok(batch.report);
        }

        batch.emit(BatchEvent::Started {
            total: requests.len(),
        });
        batch.log(&format!("=== Batch started ({}) ===", timestamp()));

        for request in &requests {
            self.apply_one(&mut batch, request).await;
            // 让出执行权，界面层可以在两项之间观察到中间状态
            tokio::task::yield_now().await;
        }

        batch.log(&format!("=== Batch finished ({}) ===", timestamp()));
        batch.emit(BatchEvent::Finished);
        Ok(batch.report)
    }

    async fn apply_one(&self, batch: &mut Batch<'_>, request: &ActionRequest) {
        let id = request.id.trim();
        if request.action == Action::Pause {
            batch.status(id, STATUS_PAUSED);
            return;
        }
        if id.is_empty() {
            return;
        }

        match request.action {
            Action::Install => {
                batch.status(id, Step::Upgrade.pending_status());
                let upgraded = self.run_step(batch, &request.name, id, Step::Upgrade).await;
                if upgraded.success() {
                    batch.status(id, STATUS_OK);
                    return;
                }
                if exit_codes::is_no_upgrade_needed(upgraded.exit_code) {
                    batch.status(id, STATUS_UP_TO_DATE);
                    return;
                }

                // 未安装的包升级必然失败，此时改为全新安装
                batch.status(id, Step::Install.pending_status());
                let installed = self.run_step(batch, &request.name, id, Step::Install).await;
                let outcome = exit_codes::classify(installed.exit_code);
                let status = match outcome.category {
                    OutcomeCategory::Success => STATUS_OK.to_string(),
                    OutcomeCategory::AlreadyInstalled => STATUS_ALREADY_INSTALLED.to_string(),
                    _ => outcome.message,
                };
                batch.status(id, &status);
            }
            Action::Uninstall => {
                batch.status(id, Step::Uninstall.pending_status());
                let removed = self.run_step(batch, &request.name, id, Step::Uninstall).await;
                let status = if removed.success() {
                    STATUS_OK.to_string()
                } else {
                    exit_codes::message(removed.exit_code)
                };
                batch.status(id, &status);
            }
            Action::Pause => {}
        }
    }

    /// 重新读取并合并更新列表
    pub async fn refresh_updates(&self) -> AdapterResult<UpdateSet> {
        self.ensure_available()?;
        let _guard = RunGuard::acquire(&self.updating, "updates")?;
        self.load_updates().await
    }

    async fn load_updates(&self) -> AdapterResult<UpdateSet> {
        let set = self
            .blocking(|pm| pm.load_updates())
            .await
            .unwrap_or_else(|| Ok(UpdateSet::default()))?;
        let _ = self
            .events
            .send(BatchEvent::UpdatesRefreshed(set.rows().to_vec()));
        Ok(set)
    }

    /// 对已勾选的条目逐个执行 upgrade（不回退到 install），结束后刷新列表
    pub async fn apply_updates(&self, set: &UpdateSet) -> AdapterResult<UpdateRun> {
        self.ensure_available()?;
        let _guard = RunGuard::acquire(&self.updating, "updates")?;

        let selected = set.selected();
        let mut batch = Batch::new(&self.events);
        if selected.is_empty() {
            return Ok(UpdateRun::default());
        }

        batch.emit(BatchEvent::Started {
            total: selected.len(),
        });
        batch.log(&format!("=== Updates started ({}) ===", timestamp()));

        for row in &selected {
            batch.status(&row.id, Step::Upgrade.pending_status());
            let result = self.run_step(&mut batch, &row.name, &row.id, Step::Upgrade).await;
            let status = if result.success() {
                STATUS_OK.to_string()
            } else {
                let message = exit_codes::message(result.exit_code);
                batch.log(&message);
                if exit_codes::is_no_upgrade_needed(result.exit_code) {
                    STATUS_UP_TO_DATE.to_string()
                } else {
                    message
                }
            };
            batch.status(&row.id, &status);
            tokio::task::yield_now().await;
        }

        batch.log(&format!("=== Updates finished ({}) ===", timestamp()));
        batch.emit(BatchEvent::Finished);

        let refreshed = match self.load_updates().await {
            Ok(set) => Some(set),
            Err(e) => {
                log::warn!("刷新更新列表失败: {}", e);
                None
            }
        };

        Ok(UpdateRun {
            report: batch.report,
            refreshed,
        })
    }
}
