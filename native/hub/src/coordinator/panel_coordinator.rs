// 面板协调器：持有宿主、路径与探测策略，编排各层操作

use crate::atoms::host::{Host, LocalHost};
use crate::atoms::interface_settings::{Settings, SettingsDraft, SettingsStore};
use crate::atoms::network_interfaces::DetectionPolicy;
use crate::clash::{ClashConfig, ServiceController};
use crate::error::HubResult;
use crate::molecules::{InterfaceManager, KernelManager, LocalServers, RuleLists};
use crate::services::PathService;
use std::sync::Arc;

pub struct PanelCoordinator<H: Host + ?Sized = LocalHost> {
    host: Arc<H>,
    paths: PathService,
    policy: DetectionPolicy,
    // 已加载的接口设置，只有保存成功才会替换
    settings: Option<Settings>,
}

impl PanelCoordinator<LocalHost> {
    // 本机宿主，路径来自环境变量
    pub fn local() -> Self {
        Self::new(Arc::new(LocalHost::new()), PathService::from_env())
    }
}

impl<H: Host + ?Sized> PanelCoordinator<H> {
    pub fn new(host: Arc<H>, paths: PathService) -> Self {
        Self {
            host,
            paths,
            policy: DetectionPolicy::default(),
            settings: None,
        }
    }

    pub fn with_policy(mut self, policy: DetectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn paths(&self) -> &PathService {
        &self.paths
    }

    pub fn policy(&self) -> &DetectionPolicy {
        &self.policy
    }

    pub fn interfaces(&self) -> InterfaceManager<'_, H> {
        InterfaceManager::new(&*self.host, &self.paths, &self.policy)
    }

    pub fn service(&self) -> ServiceController<'_, H> {
        ServiceController::new(&*self.host, &self.paths)
    }

    pub fn config(&self) -> ClashConfig<'_, H> {
        ClashConfig::new(&*self.host, &self.paths)
    }

    pub fn rule_lists(&self) -> RuleLists<'_, H> {
        RuleLists::new(&*self.host, &self.paths)
    }

    pub fn local_servers(&self) -> LocalServers<'_, H> {
        LocalServers::new(&*self.host, &self.paths)
    }

    pub fn kernel(&self) -> KernelManager<'_, H> {
        KernelManager::new(&*self.host, &self.paths)
    }

    // 首次访问时从存储加载
    pub async fn settings(&mut self) -> HubResult<&Settings> {
        if self.settings.is_none() {
            let loaded = SettingsStore::new(&*self.host, &self.paths).load().await?;
            self.settings = Some(loaded);
        }
        Ok(self.settings.get_or_insert_with(Settings::default))
    }

    pub async fn save_settings(&mut self, draft: SettingsDraft) -> HubResult<&Settings> {
        let saved = self.interfaces().save(draft).await?;
        Ok(self.settings.insert(saved))
    }

    // 以当前设置为基础修改后保存
    pub async fn update_settings<F>(&mut self, edit: F) -> HubResult<&Settings>
    where
        F: FnOnce(&mut SettingsDraft),
    {
        let mut draft = SettingsDraft::from_settings(self.settings().await?);
        edit(&mut draft);
        self.save_settings(draft).await
    }
}
