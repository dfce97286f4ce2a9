//! 日志输出清理：修复编码错位字符，去掉旋转指示符与进度条

/// 以 Windows-1252 误解码 UTF-8 时产生的常见双字节序列
const MOJIBAKE: &[(&str, &str)] = &[
    ("Ã¨", "è"),
    ("Ã©", "é"),
    ("Ã ", "à"),
    ("Ã¬", "ì"),
    ("Ã²", "ò"),
    ("Ã¹", "ù"),
    ("Ã‰", "É"),
    ("Ãˆ", "È"),
    ("Ã€", "À"),
    ("Ã’", "Ò"),
    ("Ã™", "Ù"),
];

/// 清理一段原始输出，用于展示或写入日志。结果可重复清理而不变
pub fn normalize_output(raw: &str) -> String {
    raw.lines()
        .map(|line| repair_encoding(&strip_ansi(last_carriage_segment(line))))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .filter(|line| !is_spinner_line(line))
        .filter(|line| !is_progress_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `\r` 就地刷新的行只保留最后一帧
pub fn last_carriage_segment(line: &str) -> &str {
    let line = line.strip_suffix('\r').unwrap_or(line);
    match line.rfind('\r') {
        Some(pos) => &line[pos + 1..],
        None => line,
    }
}

pub fn repair_encoding(line: &str) -> String {
    if !line.contains('Ã') {
        return line.to_string();
    }
    MOJIBAKE
        .iter()
        .fold(line.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

/// 去掉 ANSI 转义序列和其余控制字符（保留制表符）
fn strip_ansi(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            c if c.is_control() && c != '\t' => {}
            _ => result.push(c),
        }
    }

    result
}

fn is_spinner_line(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '/' | '\\' | '-' | '|'))
}

fn is_progress_line(line: &str) -> bool {
    // "â–" 是方块字符被误解码后的前缀
    if line.contains("â–") {
        return true;
    }
    if line.chars().any(|c| ('\u{2580}'..='\u{259F}').contains(&c)) {
        return true;
    }
    line.to_lowercase().contains("mb /")
}
