// 宿主能力抽象：文件读写、命令执行与网络设备枚举。
// 生产环境使用 LocalHost，测试使用内存实现。

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(test)]
pub mod mock;

// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

// 文件元信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
}

#[async_trait]
pub trait Host: Send + Sync {
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    // 整文件替换写入
    async fn write_file(&self, path: &Path, content: &str) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    // 返回目录下的条目名称（已排序）
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    // 文件不存在时返回 None
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    async fn exec(&self, program: &str, args: &[&str]) -> io::Result<ExecOutput>;

    // 系统网络设备 API 返回的接口名称
    async fn system_interfaces(&self) -> io::Result<Vec<String>>;

    // 读取文件，不存在时返回默认值
    async fn read_or_default(&self, path: &Path, default: &str) -> io::Result<String> {
        match self.read_file(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(default.to_string()),
            Err(e) => Err(e),
        }
    }
}

// 执行命令，启动失败或退出码非零都视为执行错误
pub async fn run_checked<H: Host + ?Sized>(
    host: &H,
    program: &str,
    args: &[&str],
) -> crate::error::HubResult<ExecOutput> {
    let command_line = format!("{} {}", program, args.join(" "));
    let output = host
        .exec(program, args)
        .await
        .map_err(|e| crate::error::HubError::Exec(format!("无法执行 {}：{}", command_line, e)))?;

    if !output.success() {
        let detail = output.stderr.trim();
        return Err(crate::error::HubError::Exec(format!(
            "{} 退出码 {}{}",
            command_line,
            output.code,
            if detail.is_empty() {
                String::new()
            } else {
                format!("：{}", detail)
            }
        )));
    }
    Ok(output)
}

// 本机实现
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        Self
    }

    // 同目录临时文件，rename 保证读者只能看到完整内容
    fn staging_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.ssclash-tmp", file_name))
    }

    async fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = Self::staging_path(path);
        tokio::fs::write(&staging, bytes).await?;

        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        log::debug!("写入文件：{}（{} 字节）", path.display(), content.len());
        Self::replace_file(path, content.as_bytes()).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(Some(FileStat {
                size: meta.len(),
                is_dir: meta.is_dir(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn exec(&self, program: &str, args: &[&str]) -> io::Result<ExecOutput> {
        log::debug!("执行命令：{} {:?}", program, args);

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await?;

        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn system_interfaces(&self) -> io::Result<Vec<String>> {
        use network_interface::NetworkInterface;
        use network_interface::NetworkInterfaceConfig;

        let interfaces = NetworkInterface::show()
            .map_err(|e| io::Error::other(format!("无法获取网络接口：{}", e)))?;

        log::debug!("network-interface 返回了{}个接口", interfaces.len());

        Ok(unique_names(interfaces.into_iter().map(|iface| iface.name)))
    }
}

// 同一接口的每个地址族各占一条记录，且不一定相邻
fn unique_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
