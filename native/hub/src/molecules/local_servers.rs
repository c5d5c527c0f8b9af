// 本地服务器列表：持久化存储于 /opt/clash，运行时副本位于 tmpfs

use crate::atoms::host::Host;
use crate::error::{HubError, HubResult};
use crate::molecules::rule_lists::normalize_content;
use crate::services::PathService;
use serde::Serialize;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    // 持久化副本是否写入成功
    pub persisted: bool,
}

pub struct LocalServers<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
}

impl<'a, H: Host + ?Sized> LocalServers<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self { host, paths }
    }

    pub async fn load(&self) -> HubResult<String> {
        let path = self.paths.local_servers_persistent();
        match self.host.read_file(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(HubError::persistence("读取本地服务器列表", &path, e)),
        }
    }

    // 先写运行时副本（失败即报错），再写持久化副本（失败只告警）
    pub async fn save(&self, content: &str) -> HubResult<SaveReport> {
        let content = normalize_content(content);

        let runtime = self.paths.local_servers_runtime();
        self.host
            .write_file(&runtime, &content)
            .await
            .map_err(|e| HubError::persistence("写入本地服务器列表", &runtime, e))?;

        let persistent = self.paths.local_servers_persistent();
        let persisted = match self.host.write_file(&persistent, &content).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("本地服务器列表持久化失败：{}（{}）", persistent.display(), e);
                false
            }
        };

        log::info!("本地服务器列表已保存（{} 字节）", content.len());
        Ok(SaveReport { persisted })
    }

    pub async fn clear(&self) -> HubResult<SaveReport> {
        self.save("").await
    }
}
