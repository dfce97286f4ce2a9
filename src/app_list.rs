//! 应用列表的读写
//!
//! 文件格式为 `{ "tabs": [ { "name", "apps": [ { "name", "id", "action" } ] } ] }`，
//! 旧版本保存的顶层数组按单个 `Default` 分组读取。读取时属性名不区分大小写。

use crate::error::{AdapterError, AdapterResult};
use crate::package_manager::types::same_id;
use crate::package_manager::{Action, ActionRequest};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const DEFAULT_TAB: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEntry {
    pub name: String,
    pub id: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub name: String,
    pub apps: Vec<AppEntry>,
}

impl Tab {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            apps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppList {
    tabs: Vec<Tab>,
}

impl Default for AppList {
    fn default() -> Self {
        Self {
            tabs: vec![Tab::empty(DEFAULT_TAB)],
        }
    }
}

impl AppList {
    /// 读取应用列表；文件缺失或损坏时返回只含空 `Default` 分组的列表
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("应用列表 {} 不存在，使用空列表", path.display());
            return Self::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(source) => {
                let err = AdapterError::AppListIo {
                    path: path.to_path_buf(),
                    source,
                };
                log::warn!("{}", err);
                return Self::default();
            }
        };

        Self::parse(&content).unwrap_or_else(|e| {
            log::warn!("{}，使用空列表", e);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> AdapterResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let root: Value = serde_json::from_str(content)?;
        let mut tabs: Vec<Tab> = Vec::new();

        match &root {
            // 旧格式：应用数组
            Value::Array(apps) => tabs.push(Tab {
                name: DEFAULT_TAB.to_string(),
                apps: read_apps(apps),
            }),
            Value::Object(obj) => {
                let entries = field(obj, "tabs").and_then(Value::as_array);
                for tab in entries.into_iter().flatten().filter_map(Value::as_object) {
                    let name = text(tab, "name");
                    let name = if name.is_empty() {
                        DEFAULT_TAB.to_string()
                    } else {
                        name
                    };
                    if tabs.iter().any(|t| same_id(&t.name, &name)) {
                        log::debug!("忽略重复分组 {}", name);
                        continue;
                    }
                    let apps = field(tab, "apps")
                        .and_then(Value::as_array)
                        .map(|apps| read_apps(apps))
                        .unwrap_or_default();
                    tabs.push(Tab { name, apps });
                }
            }
            _ => {}
        }

        if tabs.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { tabs })
    }

    pub fn save(&self, path: &Path) -> AdapterResult<()> {
        let io_err = |source| AdapterError::AppListIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| same_id(&t.name, name))
    }

    /// 某个分组当前内容的快照，用于交给编排器执行
    pub fn to_requests(&self, tab: &str) -> AdapterResult<Vec<ActionRequest>> {
        let tab = self
            .tab(tab)
            .ok_or_else(|| AdapterError::UnknownTab(tab.to_string()))?;
        Ok(tab
            .apps
            .iter()
            .map(|app| ActionRequest::new(&app.name, &app.id, app.action))
            .collect())
    }

    /// 向分组追加应用，分组不存在时创建
    pub fn add(&mut self, tab: &str, entry: AppEntry) -> AdapterResult<()> {
        let index = match self.tabs.iter().position(|t| same_id(&t.name, tab)) {
            Some(index) => index,
            None => {
                self.tabs.push(Tab::empty(tab));
                self.tabs.len() - 1
            }
        };

        let apps = &mut self.tabs[index].apps;
        if apps.iter().any(|app| same_id(&app.id, &entry.id)) {
            return Err(AdapterError::DuplicateId(entry.id));
        }
        apps.push(entry);
        Ok(())
    }
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    field(obj, key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn read_apps(values: &[Value]) -> Vec<AppEntry> {
    values
        .iter()
        .filter_map(Value::as_object)
        .map(|app| AppEntry {
            name: text(app, "name"),
            id: text(app, "id"),
            action: Action::normalize(field(app, "action").and_then(Value::as_str)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, id: &str, action: Action) -> AppEntry {
        AppEntry {
            name: name.to_string(),
            id: id.to_string(),
            action,
        }
    }

    #[test]
    fn reads_tabs_with_any_property_case() {
        let json = r#"{
            "Tabs": [
                { "Name": "Work", "Apps": [
                    { "Name": "Git", "Id": "Git.Git", "Action": "Uninstall" },
                    { "name": "7-Zip", "id": "7zip.7zip", "action": "Bogus" }
                ]},
                { "name": "Work", "apps": [ { "name": "Dup", "id": "Dup.Dup" } ] },
                { "name": "Games", "apps": [ { "name": "Steam", "id": "Valve.Steam", "action": "Pause" } ] }
            ]
        }"#;
        let list = AppList::parse(json).unwrap();

        let names: Vec<&str> = list.tabs().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Games"]);

        let work = list.tab("Work").unwrap();
        assert_eq!(work.apps.len(), 2);
        assert_eq!(work.apps[0].action, Action::Uninstall);
        assert_eq!(work.apps[1].action, Action::Install);
        assert_eq!(list.tab("Games").unwrap().apps[0].action, Action::Pause);
    }

    #[test]
    fn tab_names_ignore_case() {
        let json = r#"{ "tabs": [
            { "name": "Work", "apps": [ { "name": "Git", "id": "Git.Git" } ] },
            { "name": "WORK", "apps": [ { "name": "Dup", "id": "Dup.Dup" } ] }
        ]}"#;
        let mut list = AppList::parse(json).unwrap();
        assert_eq!(list.tabs().len(), 1);
        assert_eq!(list.to_requests("work").unwrap().len(), 1);

        list.add("wOrK", entry("VLC", "VideoLAN.VLC", Action::Install))
            .unwrap();
        assert_eq!(list.tabs().len(), 1);
        assert_eq!(list.tab("Work").unwrap().apps.len(), 2);
    }

    #[test]
    fn legacy_array_becomes_default_tab() {
        let list = AppList::parse(r#"[{ "Name": "Git", "Id": "Git.Git" }]"#).unwrap();
        assert_eq!(list.tabs().len(), 1);
        assert_eq!(list.tabs()[0].name, DEFAULT_TAB);
        assert_eq!(list.tabs()[0].apps[0].id, "Git.Git");
    }

    #[test]
    fn missing_or_broken_files_fall_back_to_empty_default() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("none.json");
        assert_eq!(AppList::load(&missing), AppList::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(AppList::load(&broken), AppList::default());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "   ").unwrap();
        assert_eq!(AppList::load(&empty), AppList::default());
    }

    #[test]
    fn save_then_load_keeps_tab_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/AppsList.json");

        let mut list = AppList::default();
        list.add("Tools", entry("Git", "Git.Git", Action::Install)).unwrap();
        list.add(DEFAULT_TAB, entry("VLC", "VideoLAN.VLC", Action::Pause))
            .unwrap();
        list.save(&path).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"action\": \"Pause\""));

        let loaded = AppList::load(&path);
        assert_eq!(loaded, list);
        assert_eq!(loaded.tabs()[0].name, DEFAULT_TAB);
        assert_eq!(loaded.tabs()[1].name, "Tools");
    }

    #[test]
    fn add_rejects_duplicate_ids_ignoring_case() {
        let mut list = AppList::default();
        list.add(DEFAULT_TAB, entry("Git", "Git.Git", Action::Install))
            .unwrap();
        let err = list
            .add(DEFAULT_TAB, entry("git", "GIT.GIT", Action::Uninstall))
            .unwrap_err();
        assert!(matches!(err, AdapterError::DuplicateId(id) if id == "GIT.GIT"));

        // 其他分组可以有相同 ID
        assert!(list
            .add("Other", entry("Git", "Git.Git", Action::Install))
            .is_ok());
    }

    #[test]
    fn requests_snapshot_a_tab() {
        let mut list = AppList::default();
        list.add(DEFAULT_TAB, entry("Git", "Git.Git", Action::Install))
            .unwrap();
        list.add(DEFAULT_TAB, entry("VLC", "VideoLAN.VLC", Action::Pause))
            .unwrap();

        let requests = list.to_requests(DEFAULT_TAB).unwrap();
        assert_eq!(
            requests,
            vec![
                ActionRequest::new("Git", "Git.Git", Action::Install),
                ActionRequest::new("VLC", "VideoLAN.VLC", Action::Pause),
            ]
        );
        assert!(matches!(
            list.to_requests("Missing"),
            Err(AdapterError::UnknownTab(_))
        ));
    }
}
