// 本地规则列表管理：/opt/clash/lst/*.txt，供 rule-providers 以 file 类型引用

use crate::atoms::host::Host;
use crate::error::{HubError, HubResult};
use crate::services::PathService;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io;
use std::path::PathBuf;

static LIST_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleList {
    pub file_name: String,
    pub content: String,
}

// 校验名称并生成文件名：小写，追加 .txt
pub fn list_file_name(name: &str) -> HubResult<String> {
    let name = name.trim();
    let valid = LIST_NAME.as_ref().is_some_and(|re| re.is_match(name));
    if !valid {
        return Err(HubError::InvalidInput(format!(
            "规则列表名称只能包含字母、数字、下划线和连字符：{}",
            name
        )));
    }
    Ok(format!("{}.txt", name.to_lowercase()))
}

// 去除首尾空白，非空内容以换行结尾
pub fn normalize_content(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

pub struct RuleLists<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
}

impl<'a, H: Host + ?Sized> RuleLists<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self { host, paths }
    }

    // 只接受目录内的 .txt 文件名
    fn file_path(&self, file_name: &str) -> HubResult<PathBuf> {
        if !file_name.ends_with(".txt") || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(HubError::InvalidInput(format!("无效的规则列表文件：{}", file_name)));
        }
        Ok(self.paths.rulesets_dir().join(file_name))
    }

    // 目录不存在时视为没有规则列表
    pub async fn list(&self) -> HubResult<Vec<RuleList>> {
        let dir = self.paths.rulesets_dir();
        let names = match self.host.list_dir(&dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HubError::persistence("读取规则列表目录", &dir, e)),
        };

        let mut lists = Vec::new();
        for file_name in names.into_iter().filter(|name| name.ends_with(".txt")) {
            let path = dir.join(&file_name);
            let content = self
                .host
                .read_file(&path)
                .await
                .map_err(|e| HubError::persistence("读取规则列表", &path, e))?;
            lists.push(RuleList { file_name, content });
        }
        Ok(lists)
    }

    // 新建空列表，同名文件已存在时拒绝覆盖
    pub async fn create(&self, name: &str) -> HubResult<String> {
        let file_name = list_file_name(name)?;
        let path = self.file_path(&file_name)?;

        let exists = self
            .host
            .stat(&path)
            .await
            .map_err(|e| HubError::persistence("检查规则列表", &path, e))?
            .is_some();
        if exists {
            return Err(HubError::InvalidInput(format!("规则列表已存在：{}", file_name)));
        }

        self.host
            .write_file(&path, "")
            .await
            .map_err(|e| HubError::persistence("创建规则列表", &path, e))?;
        log::info!("已创建规则列表：{}", file_name);
        Ok(file_name)
    }

    pub async fn save(&self, file_name: &str, content: &str) -> HubResult<()> {
        let path = self.file_path(file_name)?;
        self.host
            .write_file(&path, &normalize_content(content))
            .await
            .map_err(|e| HubError::persistence("保存规则列表", &path, e))?;
        log::info!("已保存规则列表：{}", file_name);
        Ok(())
    }

    pub async fn delete(&self, file_name: &str) -> HubResult<()> {
        let path = self.file_path(file_name)?;
        self.host
            .remove_file(&path)
            .await
            .map_err(|e| HubError::persistence("删除规则列表", &path, e))?;
        log::info!("已删除规则列表：{}", file_name);
        Ok(())
    }
}
