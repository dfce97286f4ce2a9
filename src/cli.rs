use crate::app_list::DEFAULT_TAB;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "onlywinget")]
#[command(about = "Batch install, upgrade and uninstall through winget", long_about = None)]
pub struct Cli {
    /// 使用其他配置文件
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 检测包管理器是否可用
    Probe,
    Search {
        query: String,
    },
    /// 列出已安装的包以及可用的升级
    Updates,
    /// 升级可升级的包，`--only` 限定范围
    UpgradeAll {
        #[arg(long = "only")]
        only: Vec<String>,
    },
    /// 执行应用列表中某个分组的操作
    Apply {
        #[arg(long, default_value = DEFAULT_TAB)]
        tab: String,
    },
    /// 把包加入应用列表
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "Install")]
        action: String,
        #[arg(long, default_value = DEFAULT_TAB)]
        tab: String,
    },
}
