use crate::package_manager::HeaderLocale;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 包管理器可执行文件
    pub tool: String,
    /// 查询与操作使用的源
    pub source: String,
    /// 开启后，读命令输出中出现无法解析的行即报错
    pub strict_parsing: bool,
    pub app_list: PathBuf,
    pub log_dir: PathBuf,
    pub save_logs: bool,
    /// 内置英语、意大利语之外的表头语言
    pub locales: Vec<HeaderLocale>,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            tool: "winget".to_string(),
            source: "winget".to_string(),
            strict_parsing: false,
            app_list: home.join(".config/onlywinget/AppsList.json"),
            log_dir: home.join(".onlywinget/logs"),
            save_logs: true,
            locales: Vec::new(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/onlywinget/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
