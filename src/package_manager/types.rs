//! PackageManager 相关数据类型定义

use serde::{Deserialize, Serialize};

/// 调用失败（进程无法启动）时使用的哨兵退出码，由本程序合成，winget 自身不会返回
pub const SENTINEL_EXIT_CODE: i32 = 9999;

/// 一次外部命令调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub output: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// 进程无法启动时的结果
    pub fn spawn_failed() -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            output: "execution failed".to_string(),
        }
    }
}

/// 命令参数：`--flag` 及可选值。值为空时视为开关参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: String,
    pub value: Option<String>,
}

impl Flag {
    pub fn switch(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// 搜索结果条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub name: String,
    pub id: String,
    pub version: String,
}

/// 更新列表条目（已安装表与可升级表合并后）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRow {
    pub name: String,
    pub id: String,
    pub version: String,
    pub available: String,
    pub selected: bool,
}

/// 用户对某个包的预期操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Action {
    #[default]
    Install,
    Uninstall,
    Pause,
}

impl Action {
    /// 宽松解析：空值或未知值一律视为 Install
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("Uninstall") => Action::Uninstall,
            Some("Pause") => Action::Pause,
            _ => Action::Install,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "Install",
            Action::Uninstall => "Uninstall",
            Action::Pause => "Pause",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 批处理中的一项请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub name: String,
    pub id: String,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(name: &str, id: &str, action: Action) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCategory {
    Success,
    AlreadyUpToDate,
    AlreadyInstalled,
    Failure,
}

/// 退出码分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub category: OutcomeCategory,
    pub message: String,
}

/// `--version` 探测结果，构造编排器时显式传入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub available: bool,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            version: None,
        }
    }
}

/// 包 ID 比较不区分大小写
pub fn same_id(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
