// 守护进程日志查看：通过 logread 增量读取 clash 相关日志

use crate::atoms::host::Host;
use crate::services::PathService;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static MSG_FIELD: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r#"msg="(.*?)""#).ok());

// 带 msg="..." 字段的结构化日志只保留前缀和消息内容
pub fn format_log_line(line: &str) -> String {
    let Some(captures) = MSG_FIELD.as_ref().and_then(|re| re.captures(line)) else {
        return line.to_string();
    };
    let message = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let prefix = line.split("]: ").next().unwrap_or(line);
    format!("{}]: {}", prefix, message)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "lines", rename_all = "lowercase")]
pub enum LogUpdate {
    // 新增的行（已格式化）
    Append(Vec<String>),
    // 日志被清空
    Reset,
    Unchanged,
}

// 记录已显示的行数，每次轮询只返回新增部分
#[derive(Debug, Default)]
pub struct LogTail {
    seen: usize,
}

impl LogTail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn consume(&mut self, output: &str) -> LogUpdate {
        let output = output.trim();
        if output.is_empty() {
            if self.seen > 0 {
                self.seen = 0;
                return LogUpdate::Reset;
            }
            return LogUpdate::Unchanged;
        }

        let lines: Vec<&str> = output.split('\n').collect();
        if lines.len() <= self.seen {
            return LogUpdate::Unchanged;
        }

        let fresh = lines[self.seen..]
            .iter()
            .map(|line| format_log_line(line))
            .collect();
        self.seen = lines.len();
        LogUpdate::Append(fresh)
    }

    // logread 不存在时返回 None；执行失败只记录日志
    pub async fn poll<H: Host + ?Sized>(&mut self, host: &H, paths: &PathService) -> Option<LogUpdate> {
        let logread = paths.logread();
        match host.stat(logread).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::debug!("未找到 logread：{}", logread.display());
                return None;
            }
            Err(e) => {
                log::warn!("无法检查 logread：{}", e);
                return None;
            }
        }

        let program = logread.to_string_lossy();
        match host.exec(&program, &["-e", "clash"]).await {
            Ok(output) => Some(self.consume(&output.stdout)),
            Err(e) => {
                log::error!("执行 logread 失败：{}", e);
                Some(LogUpdate::Unchanged)
            }
        }
    }
}
