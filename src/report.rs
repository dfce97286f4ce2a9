use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::PathBuf;

/// 把一次批处理的执行日志按日期归档
pub struct LogSaver {
    base_dir: PathBuf,
}

impl LogSaver {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn save(&self, lines: &[String], title: &str) -> Result<PathBuf> {
        let now = Local::now();

        // 目录结构: YYYY/MM/DD/
        let dir = self
            .base_dir
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(now.format("%d").to_string());
        fs::create_dir_all(&dir)?;

        // 文件名: HH-MM-SS.log
        let filepath = dir.join(now.format("%H-%M-%S.log").to_string());

        let mut content = format!("{} 执行日志 {}\n", title, now.format("%Y-%m-%d %H:%M:%S"));
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }

        fs::write(&filepath, content)?;
        log::info!("执行日志已保存到 {}", filepath.display());

        Ok(filepath)
    }
}
