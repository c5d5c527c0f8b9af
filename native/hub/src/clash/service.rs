// Clash 系统服务控制
//
// 状态通过 ubus 查询，启停通过 init.d 脚本执行；
// 启动同时设置开机自启，停止同时取消开机自启。

use crate::atoms::host::{Host, run_checked};
use crate::error::HubResult;
use crate::services::PathService;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// 轮询间隔与次数：500ms × 10 次，总计 5 秒
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Reload,
    Restart,
}

impl ServiceAction {
    // 每个动作依次执行的 init.d 子命令
    fn commands(self) -> &'static [&'static str] {
        match self {
            ServiceAction::Start => &["start", "enable"],
            ServiceAction::Stop => &["stop", "disable"],
            ServiceAction::Reload => &["reload"],
            ServiceAction::Restart => &["restart"],
        }
    }
}

// 切换结果：到达目标状态，或超时后的实际状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub running: bool,
    pub reached_target: bool,
}

// 解析 `ubus call service list` 的输出，取第一个实例的 running 字段
pub fn parse_service_running(json: &str, service: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return false;
    };
    value
        .get(service)
        .and_then(|s| s.get("instances"))
        .and_then(Value::as_object)
        .and_then(|instances| instances.values().next())
        .and_then(|instance| instance.get("running"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub struct ServiceController<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl<'a, H: Host + ?Sized> ServiceController<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self {
            host,
            paths,
            poll_interval: POLL_INTERVAL,
            poll_attempts: POLL_ATTEMPTS,
        }
    }

    pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    // 服务名取自 init 脚本文件名
    pub fn service_name(&self) -> String {
        self.paths
            .init_script()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clash".to_string())
    }

    // 查询失败一律视为未运行
    pub async fn is_running(&self) -> bool {
        let service = self.service_name();
        let filter = serde_json::json!({ "name": service }).to_string();

        match self
            .host
            .exec("ubus", &["call", "service", "list", &filter])
            .await
        {
            Ok(output) if output.success() => parse_service_running(&output.stdout, &service),
            Ok(output) => {
                log::debug!("ubus 查询服务状态失败，退出码 {}", output.code);
                false
            }
            Err(e) => {
                log::debug!("无法执行 ubus：{}", e);
                false
            }
        }
    }

    pub async fn run(&self, action: ServiceAction) -> HubResult<()> {
        let script = self.paths.init_script().to_string_lossy().into_owned();
        for command in action.commands() {
            log::info!("执行服务命令：{} {}", script, command);
            run_checked(self.host, &script, &[*command]).await?;
        }
        Ok(())
    }

    pub async fn start(&self) -> HubResult<()> {
        self.run(ServiceAction::Start).await
    }

    pub async fn stop(&self) -> HubResult<()> {
        self.run(ServiceAction::Stop).await
    }

    pub async fn reload(&self) -> HubResult<()> {
        self.run(ServiceAction::Reload).await
    }

    pub async fn restart(&self) -> HubResult<()> {
        self.run(ServiceAction::Restart).await
    }

    // 轮询直到服务达到目标状态，超时返回最后一次查询结果
    pub async fn wait_for(&self, target: bool) -> ToggleOutcome {
        for _ in 0..self.poll_attempts {
            if self.is_running().await == target {
                return ToggleOutcome {
                    running: target,
                    reached_target: true,
                };
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let running = self.is_running().await;
        log::warn!(
            "等待服务{}超时，当前状态：{}",
            if target { "启动" } else { "停止" },
            if running { "运行中" } else { "已停止" }
        );
        ToggleOutcome {
            running,
            reached_target: running == target,
        }
    }

    // 根据当前状态启动或停止服务，并等待状态变化
    pub async fn toggle(&self) -> HubResult<ToggleOutcome> {
        let running = self.is_running().await;
        if running {
            self.stop().await?;
        } else {
            self.start().await?;
        }
        Ok(self.wait_for(!running).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::host::ExecOutput;
    use crate::atoms::host::mock::MockHost;

    const STATUS_CMD: &str = r#"ubus call service list {"name":"clash"}"#;
    const RUNNING: &str = r#"{"clash":{"instances":{"instance1":{"running":true,"pid":1234}}}}"#;
    const STOPPED: &str = r#"{"clash":{"instances":{"instance1":{"running":false}}}}"#;

    fn stdout(content: &str) -> Result<ExecOutput, String> {
        Ok(ExecOutput {
            code: 0,
            stdout: content.to_string(),
            stderr: String::new(),
        })
    }

    #[test]
    fn test_parse_service_running() {
        assert!(parse_service_running(RUNNING, "clash"));
        assert!(!parse_service_running(STOPPED, "clash"));
        assert!(!parse_service_running("{}", "clash"));
        assert!(!parse_service_running(r#"{"clash":{}}"#, "clash"));
        assert!(!parse_service_running("not json", "clash"));
    }

    #[tokio::test]
    async fn test_status_failure_means_not_running() {
        let host = MockHost::new().with_failing_command(STATUS_CMD);
        let paths = PathService::default();

        assert!(!ServiceController::new(&host, &paths).is_running().await);
    }

    #[tokio::test]
    async fn test_start_also_enables() {
        let host = MockHost::new()
            .with_command("/etc/init.d/clash start", "")
            .with_command("/etc/init.d/clash enable", "");
        let paths = PathService::default();

        ServiceController::new(&host, &paths).start().await.unwrap();
        assert_eq!(
            host.executed(),
            vec!["/etc/init.d/clash start", "/etc/init.d/clash enable"]
        );
    }

    #[tokio::test]
    async fn test_failed_stop_is_exec_error() {
        let host = MockHost::new().with_command_code("/etc/init.d/clash stop", 1, "busy");
        let paths = PathService::default();

        let err = ServiceController::new(&host, &paths).stop().await.unwrap_err();
        assert_eq!(err.kind(), "Exec");
        // 停止失败时不再取消自启
        assert!(!host.executed().contains(&"/etc/init.d/clash disable".to_string()));
    }

    #[tokio::test]
    async fn test_toggle_polls_until_running() {
        let host = MockHost::new()
            .with_command("/etc/init.d/clash start", "")
            .with_command("/etc/init.d/clash enable", "");
        host.push_response(STATUS_CMD, stdout(STOPPED));
        host.push_response(STATUS_CMD, stdout(STOPPED));
        host.push_response(STATUS_CMD, stdout(RUNNING));
        let paths = PathService::default();

        let outcome = ServiceController::new(&host, &paths)
            .with_polling(Duration::ZERO, 5)
            .toggle()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome {
                running: true,
                reached_target: true
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_times_out() {
        let host = MockHost::new()
            .with_command(STATUS_CMD, RUNNING)
            .with_command("/etc/init.d/clash stop", "")
            .with_command("/etc/init.d/clash disable", "");
        let paths = PathService::default();

        let outcome = ServiceController::new(&host, &paths)
            .with_polling(Duration::ZERO, 3)
            .toggle()
            .await
            .unwrap();

        assert!(outcome.running);
        assert!(!outcome.reached_target);
    }
}
