//! winget 表格输出解析
//!
//! winget 的 search / list / upgrade 输出是按列对齐的人类可读表格，表头随系统语言变化，
//! 列宽也随内容变化。这里先按语言关键字定位表头，由表头推出各列起始位置，再逐行切片。

use super::normalize::last_carriage_segment;
use super::types::{SearchRow, UpdateRow};
use serde::{Deserialize, Serialize};

/// 一种语言的表头关键字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLocale {
    pub tag: String,
    pub name: String,
    pub id: String,
    pub version: String,
    pub available: String,
}

impl HeaderLocale {
    pub fn english() -> Self {
        Self {
            tag: "en".to_string(),
            name: "Name".to_string(),
            id: "Id".to_string(),
            version: "Version".to_string(),
            available: "Available".to_string(),
        }
    }

    pub fn italian() -> Self {
        Self {
            tag: "it".to_string(),
            name: "Nome".to_string(),
            id: "ID".to_string(),
            version: "Versione".to_string(),
            available: "Disponibile".to_string(),
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::english(), Self::italian()]
    }
}

/// 表格种类，决定需要哪些列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Search,
    Upgrade,
    Installed,
}

/// 切片后的一行，尚未转换为具体条目
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub name: String,
    pub id: String,
    pub version: String,
    pub available: String,
}

impl From<TableRow> for SearchRow {
    fn from(row: TableRow) -> Self {
        SearchRow {
            name: row.name,
            id: row.id,
            version: row.version,
        }
    }
}

/// 解析结果；`rejected` 为看起来像数据行但结构校验失败而被丢弃的行数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable<T> {
    pub rows: Vec<T>,
    pub rejected: usize,
}

impl<T> ParsedTable<T> {
    fn map<U>(self, f: impl FnMut(T) -> U) -> ParsedTable<U> {
        ParsedTable {
            rows: self.rows.into_iter().map(f).collect(),
            rejected: self.rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Columns {
    /// id / version / available 列的字符偏移（按出现顺序，只含当前种类用到的列）
    offsets: Vec<usize>,
    has_version: bool,
}

#[derive(Debug, Clone)]
pub struct ColumnTableParser {
    locales: Vec<HeaderLocale>,
}

impl Default for ColumnTableParser {
    fn default() -> Self {
        Self::new(HeaderLocale::builtin())
    }
}

impl ColumnTableParser {
    pub fn new(locales: Vec<HeaderLocale>) -> Self {
        Self { locales }
    }

    /// 内置语言之外追加额外语言
    pub fn with_extra_locales(extra: &[HeaderLocale]) -> Self {
        let mut locales = HeaderLocale::builtin();
        locales.extend(extra.iter().cloned());
        Self::new(locales)
    }

    pub fn search(&self, raw: &str) -> ParsedTable<SearchRow> {
        self.parse(raw, TableKind::Search).map(SearchRow::from)
    }

    pub fn upgrades(&self, raw: &str) -> ParsedTable<UpdateRow> {
        self.parse(raw, TableKind::Upgrade).map(|row| UpdateRow {
            name: row.name,
            id: row.id,
            version: row.version,
            available: row.available,
            selected: true,
        })
    }

    pub fn installed(&self, raw: &str) -> ParsedTable<UpdateRow> {
        self.parse(raw, TableKind::Installed).map(|row| UpdateRow {
            name: row.name,
            id: row.id,
            version: row.version,
            available: String::new(),
            selected: false,
        })
    }

    /// 解析整段输出。找不到表头时返回空结果，不视为错误
    pub fn parse(&self, raw: &str, kind: TableKind) -> ParsedTable<TableRow> {
        let mut rows = Vec::new();
        let mut rejected = 0;
        let mut columns: Option<Columns> = None;

        for line in raw.lines().map(last_carriage_segment) {
            // 表体中再次出现表头（winget 会为需要显式指定的包另起一张表），按新表头重新定位
            if let Some(found) = self.header_columns(line, kind) {
                columns = Some(found);
                continue;
            }
            let Some(cols) = columns.as_ref() else {
                continue;
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.chars().all(|c| c == '-' || c == ' ') {
                continue;
            }

            let chars: Vec<char> = line.chars().collect();
            let last_offset = cols.offsets.last().copied().unwrap_or(0);
            if chars.len() < last_offset {
                // 表格之后的说明文字（如 "2 upgrades available."）
                continue;
            }

            match slice_row(&chars, cols, kind) {
                Some(row) => rows.push(row),
                None => {
                    log::debug!("丢弃无法解析的行: {}", trimmed);
                    rejected += 1;
                }
            }
        }

        ParsedTable { rows, rejected }
    }

    fn header_columns(&self, line: &str, kind: TableKind) -> Option<Columns> {
        let lowered = line.to_lowercase();
        let is_header = self
            .locales
            .iter()
            .any(|l| !l.name.is_empty() && lowered.starts_with(&l.name.to_lowercase()));
        if !is_header {
            return None;
        }

        let id = self.find_column(line, |l| &l.id)?;
        let version = self.find_column(line, |l| &l.version);
        let available = self.find_column(line, |l| &l.available);

        let mut offsets = vec![id];
        let has_version = match (kind, version) {
            (_, Some(v)) => {
                offsets.push(v);
                true
            }
            (TableKind::Search, None) => false,
            (_, None) => return None,
        };
        if kind == TableKind::Upgrade {
            offsets.push(available?);
        }

        // 名称列从 0 开始，后续各列必须严格递增
        let mut prev = 0;
        for &offset in &offsets {
            if offset <= prev {
                return None;
            }
            prev = offset;
        }

        Some(Columns {
            offsets,
            has_version,
        })
    }

    fn find_column(&self, line: &str, keyword: impl Fn(&HeaderLocale) -> &String) -> Option<usize> {
        self.locales
            .iter()
            .find_map(|locale| find_word(line, keyword(locale)))
    }
}

/// 以整词方式查找关键字，返回字符偏移
fn find_word(line: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(rel) = line[from..].find(word) {
        let start = from + rel;
        let end = start + word.len();
        let before = line[..start].chars().next_back().map_or(true, char::is_whitespace);
        let after = line[end..].chars().next().map_or(true, char::is_whitespace);
        if before && after {
            return Some(line[..start].chars().count());
        }
        from = end;
    }
    None
}

/// 每个列偏移都落在空白边界上（或行尾之后）
fn is_aligned(chars: &[char], offsets: &[usize]) -> bool {
    offsets.iter().all(|&pos| {
        pos == 0
            || pos >= chars.len()
            || chars[pos - 1].is_whitespace()
            || chars[pos].is_whitespace()
    })
}

fn field(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect::<String>().trim().to_string()
}

fn first_token(value: &str) -> String {
    value.split_whitespace().next().unwrap_or_default().to_string()
}

fn slice_row(chars: &[char], cols: &Columns, kind: TableKind) -> Option<TableRow> {
    let column_count = cols.offsets.len() + 1;
    let tokens: Vec<String> = chars
        .iter()
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    // 未按表头对齐、但每列恰好一个词的紧凑行，按词序取值；其余情况按列切片
    let mut fields: Vec<String> =
        if !is_aligned(chars, &cols.offsets) && tokens.len() == column_count {
            tokens
        } else {
            let mut bounds = vec![0];
            bounds.extend(cols.offsets.iter().map(|&o| o.min(chars.len())));
            bounds.push(chars.len());
            bounds.windows(2).map(|w| field(chars, w[0], w[1])).collect()
        };
    if let Some(last) = fields.last_mut() {
        *last = first_token(last);
    }

    let mut fields = fields.into_iter();
    let name = fields.next().unwrap_or_default();
    let id = fields.next().unwrap_or_default();
    let version = if cols.has_version {
        fields.next().unwrap_or_default()
    } else {
        String::new()
    };
    let available = if kind == TableKind::Upgrade {
        fields.next().unwrap_or_default()
    } else {
        String::new()
    };

    if id.is_empty() {
        return None;
    }
    if kind != TableKind::Search && id.chars().any(char::is_whitespace) {
        return None;
    }

    Some(TableRow {
        name,
        id,
        version,
        available,
    })
}
