// 统一错误类型，每个变体对应一个失败域
// CLI 以 { "kind": "...", "message": "..." } 的形式输出

use serde::ser::SerializeStruct;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    // 持久化文件读写失败，操作中止，内存状态保持不变
    #[error("{0}")]
    Persistence(String),

    // 外部命令执行失败（init.d、ubus 等）
    #[error("{0}")]
    Exec(String),

    // 远程发布信息不可用（网络错误、预发布版本、缺少资源）
    #[error("{0}")]
    Release(String),

    // 核心下载、解压或安装失败
    #[error("{0}")]
    Download(String),

    // 非法输入
    #[error("{0}")]
    InvalidInput(String),

    // 配置文件解析失败
    #[error("{0}")]
    Config(String),
}

pub type HubResult<T> = Result<T, HubError>;

impl HubError {
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::Persistence(_) => "Persistence",
            HubError::Exec(_) => "Exec",
            HubError::Release(_) => "Release",
            HubError::Download(_) => "Download",
            HubError::InvalidInput(_) => "InvalidInput",
            HubError::Config(_) => "Config",
        }
    }

    pub(crate) fn persistence(action: &str, path: &std::path::Path, e: impl std::fmt::Display) -> Self {
        HubError::Persistence(format!("{}失败：{}（{}）", action, path.display(), e))
    }
}

impl serde::Serialize for HubError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("HubError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}
