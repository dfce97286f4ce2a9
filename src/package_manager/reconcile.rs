//! 合并“已安装”与“可升级”两张表

use super::types::{same_id, UpdateRow};
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 名称排序键：分解后去掉附加符号并转小写，"Éditeur" 与 "editeur" 排在同一位置
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// 合并后的更新列表：每个 ID（不区分大小写）至多一条，按名称排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSet {
    rows: Vec<UpdateRow>,
}

impl UpdateSet {
    /// 先放入已安装条目，再用可升级条目整条覆盖同 ID 的记录
    pub fn reconcile(installed: Vec<UpdateRow>, upgrades: Vec<UpdateRow>) -> Self {
        let mut combined: HashMap<String, UpdateRow> = HashMap::new();
        for row in installed.into_iter().chain(upgrades) {
            combined.insert(row.id.to_lowercase(), row);
        }

        let mut rows: Vec<UpdateRow> = combined.into_values().collect();
        rows.sort_by_cached_key(|row| {
            (
                collation_key(&row.name),
                row.name.to_lowercase(),
                row.id.to_lowercase(),
            )
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[UpdateRow] {
        &self.rows
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&UpdateRow> {
        self.rows.iter().find(|row| same_id(&row.id, id))
    }

    /// 修改某个条目的勾选状态，返回是否找到该条目
    pub fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.rows.iter_mut().find(|row| same_id(&row.id, id)) {
            Some(row) => {
                row.selected = selected;
                true
            }
            None => false,
        }
    }

    /// 按列表顺序返回已勾选条目的快照
    pub fn selected(&self) -> Vec<UpdateRow> {
        self.rows.iter().filter(|row| row.selected).cloned().collect()
    }
}
