//! 包管理器模块：对 winget 命令行的封装

pub mod exit_codes;
pub mod invoker;
pub mod normalize;
pub mod parser;
pub mod reconcile;
pub mod types;

// 重新导出常用类型和函数
pub use invoker::{Invoker, ProcessInvoker};
pub use normalize::normalize_output;
pub use parser::{ColumnTableParser, HeaderLocale};
pub use reconcile::UpdateSet;
pub use types::{
    Action, ActionRequest, CommandResult, Flag, OutcomeCategory, SearchRow, ToolStatus, UpdateRow,
};

use crate::config::Config;
use crate::error::{AdapterError, AdapterResult};
use parser::ParsedTable;

#[derive(Debug, Clone)]
pub struct PackageManager<I> {
    invoker: I,
    tool: String,
    source: String,
    strict: bool,
    parser: ColumnTableParser,
}

impl PackageManager<ProcessInvoker> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(ProcessInvoker::new(&config.tool), config)
    }
}

impl<I: Invoker> PackageManager<I> {
    pub fn new(invoker: I, config: &Config) -> Self {
        Self {
            invoker,
            tool: config.tool.clone(),
            source: config.source.clone(),
            strict: config.strict_parsing,
            parser: ColumnTableParser::with_extra_locales(&config.locales),
        }
    }

    pub fn name(&self) -> &str {
        &self.tool
    }

    #[cfg(test)]
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// 探测工具是否可用（`--version` 能启动且退出码为 0）
    pub fn probe(&self) -> ToolStatus {
        let result = self.invoker.invoke("--version", &[]);
        if !result.success() {
            log::warn!("{} --version 失败，退出码 {}", self.tool, result.exit_code);
            return ToolStatus::unavailable();
        }
        let version = result
            .output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);
        log::info!("检测到 {} {}", self.tool, version.as_deref().unwrap_or("?"));
        ToolStatus {
            available: true,
            version,
        }
    }

    /// 检查 ID 是否能在源中精确匹配到包
    pub fn package_exists(&self, id: &str) -> bool {
        let result = self.invoker.invoke(
            "show",
            &[
                Flag::with_value("--id", id),
                Flag::with_value("--source", &self.source),
                Flag::switch("--exact"),
                Flag::switch("--accept-source-agreements"),
            ],
        );
        result.success()
    }

    // ===== 查询 =====

    pub fn search(&self, query: &str) -> AdapterResult<Vec<SearchRow>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let result = self.invoker.invoke(
            "search",
            &[
                Flag::with_value("--query", query),
                Flag::with_value("--source", &self.source),
                Flag::switch("--accept-source-agreements"),
            ],
        );
        self.accept("search", self.parser.search(&result.output))
    }

    /// 读取可升级列表与已安装列表并合并
    pub fn load_updates(&self) -> AdapterResult<UpdateSet> {
        let listing_flags = [
            Flag::with_value("--source", &self.source),
            Flag::switch("--accept-source-agreements"),
        ];
        let upgrades = self.invoker.invoke("upgrade", &listing_flags);
        let installed = self.invoker.invoke("list", &listing_flags);

        let upgrades = self.accept("upgrade", self.parser.upgrades(&upgrades.output))?;
        let installed = self.accept("list", self.parser.installed(&installed.output))?;
        log::debug!(
            "可升级 {} 项，已安装 {} 项",
            upgrades.len(),
            installed.len()
        );

        Ok(UpdateSet::reconcile(installed, upgrades))
    }

    fn accept<T>(&self, command: &str, parsed: ParsedTable<T>) -> AdapterResult<Vec<T>> {
        if parsed.rejected > 0 {
            if self.strict {
                return Err(AdapterError::UnparsedRows {
                    command: command.to_string(),
                    count: parsed.rejected,
                });
            }
            log::debug!("{} 输出中丢弃了 {} 行", command, parsed.rejected);
        }
        Ok(parsed.rows)
    }

    // ===== 操作 =====

    pub fn upgrade(&self, id: &str) -> CommandResult {
        self.invoker.invoke("upgrade", &Self::action_flags(id, true))
    }

    pub fn install(&self, id: &str) -> CommandResult {
        self.invoker.invoke("install", &Self::action_flags(id, true))
    }

    pub fn uninstall(&self, id: &str) -> CommandResult {
        self.invoker.invoke("uninstall", &Self::action_flags(id, false))
    }

    fn action_flags(id: &str, package_agreements: bool) -> Vec<Flag> {
        let mut flags = vec![Flag::with_value("--id", id), Flag::switch("--exact")];
        if package_agreements {
            flags.push(Flag::switch("--accept-package-agreements"));
        }
        flags.push(Flag::switch("--accept-source-agreements"));
        flags.push(Flag::switch("--disable-interactivity"));
        flags
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInvoker;
    use super::*;

    fn manager(invoker: ScriptedInvoker, strict: bool) -> PackageManager<ScriptedInvoker> {
        let config = Config {
            strict_parsing: strict,
            ..Config::default()
        };
        PackageManager::new(invoker, &config)
    }

    const UPGRADE_OUT: &str = "\
Name   Id        Version  Available  Source
-------------------------------------------
Git    Git.Git   2.44.0   2.45.1     winget
1 upgrades available.";

    const LIST_OUT: &str = "\
Name     Id          Version  Available Source
----------------------------------------------
7-Zip    7zip.7zip   23.01              winget
Git      Git.Git     2.44.0   2.45.1    winget";

    #[test]
    fn probe_reports_version() {
        let pm = manager(
            ScriptedInvoker::default().respond("--version", 0, "v1.8.1911\n"),
            false,
        );
        let status = pm.probe();
        assert!(status.available);
        assert_eq!(status.version.as_deref(), Some("v1.8.1911"));
    }

    #[test]
    fn probe_fails_on_sentinel() {
        let pm = manager(
            ScriptedInvoker::default().respond("--version", 9999, "execution failed"),
            false,
        );
        assert_eq!(pm.probe(), ToolStatus::unavailable());
    }

    #[test]
    fn blank_search_does_not_invoke() {
        let pm = manager(ScriptedInvoker::default(), false);
        assert!(pm.search("   ").unwrap().is_empty());
        assert!(pm.invoker.calls().is_empty());
    }

    #[test]
    fn search_passes_query_and_source() {
        let pm = manager(
            ScriptedInvoker::default().respond(
                "search",
                0,
                "Name   Id        Version\nGit    Git.Git   2.45.1\n",
            ),
            false,
        );
        let rows = pm.search(" git ").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "Git.Git");
        assert_eq!(
            pm.invoker.calls()[0],
            vec![
                "search",
                "--query",
                "git",
                "--source",
                "winget",
                "--accept-source-agreements"
            ]
        );
    }

    #[test]
    fn load_updates_reconciles_both_tables() {
        let pm = manager(
            ScriptedInvoker::default()
                .respond("upgrade", 0, UPGRADE_OUT)
                .respond("list", 0, LIST_OUT),
            false,
        );
        let set = pm.load_updates().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows()[0].id, "7zip.7zip");
        assert!(!set.rows()[0].selected);
        let git = set.get("git.git").unwrap();
        assert!(git.selected);
        assert_eq!(git.available, "2.45.1");
    }

    #[test]
    fn strict_mode_surfaces_unparsed_rows() {
        let noisy = "Name   Id        Version\nGit    Git.Git   2.44.0\nBad    not valid id 1.0\n";
        let lenient = manager(
            ScriptedInvoker::default().respond("search", 0, noisy),
            false,
        );
        assert_eq!(lenient.search("x").unwrap().len(), 2);

        let strict = manager(
            ScriptedInvoker::default()
                .respond("upgrade", 0, "")
                .respond("list", 0, noisy),
            true,
        );
        match strict.load_updates() {
            Err(AdapterError::UnparsedRows { command, count }) => {
                assert_eq!(command, "list");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn action_flags_match_tool_contract() {
        let pm = manager(ScriptedInvoker::default(), false);
        pm.uninstall("Git.Git");
        pm.install("Git.Git");
        let calls = pm.invoker.calls();
        assert_eq!(
            calls[0],
            vec![
                "uninstall",
                "--id",
                "Git.Git",
                "--exact",
                "--accept-source-agreements",
                "--disable-interactivity"
            ]
        );
        assert!(calls[1].contains(&"--accept-package-agreements".to_string()));
    }
}
