use std::path::PathBuf;
use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{tool} 不可用（--version 探测失败）")]
    ToolUnavailable { tool: String },

    #[error("已有{0}任务正在运行")]
    AlreadyRunning(&'static str),

    #[error("`{command}` 输出中有 {count} 行无法解析")]
    UnparsedRows { command: String, count: usize },

    #[error("读取应用列表 {} 失败: {source}", path.display())]
    AppListIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("应用列表格式错误: {0}")]
    AppListFormat(#[from] serde_json::Error),

    #[error("分组 {0} 不存在")]
    UnknownTab(String),

    #[error("ID {0} 已存在于当前分组")]
    DuplicateId(String),
}
