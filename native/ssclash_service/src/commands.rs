// 命令实现：每个命令驱动一个协调器操作，结果以 JSON 输出到 stdout

use anyhow::{Context, Result, bail};
use hub::PanelCoordinator;
use hub::atoms::Host;
use hub::atoms::interface_settings::{AutoDetectKind, InterfaceMode};
use hub::atoms::network_interfaces::InterfaceCategory;
use hub::clash::ServiceAction;
use hub::molecules::interface_management::{detection_hint, disable_auto_detect, status_lines};
use hub::molecules::{InterfaceOverview, LogTail, LogUpdate};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;

const LOG_POLL_INTERVAL: Duration = Duration::from_secs(2);

// 判断命令是否会修改系统状态
pub fn requires_root(args: &[String]) -> bool {
    let sub = args.get(1).map(String::as_str);
    match args.first().map(String::as_str) {
        Some("save" | "toggle" | "hwid") => true,
        Some("exclusions") => args.len() > 1,
        Some("service") => !matches!(sub, None | Some("status")),
        Some("config") => sub == Some("apply"),
        Some("rules") => matches!(sub, Some("create" | "save" | "delete")),
        Some("servers") => matches!(sub, Some("save" | "clear")),
        Some("kernel") => sub == Some("install"),
        _ => false,
    }
}

pub fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("无效的开关值：{}（应为 on 或 off）", other),
    }
}

// 文件参数，- 表示标准输入
async fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("读取标准输入失败")?;
        return Ok(content);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取文件失败：{}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("缺少参数：{}", name))
}

pub async fn run<H: Host + ?Sized>(panel: &mut PanelCoordinator<H>, args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        bail!("缺少命令");
    };

    match command.as_str() {
        "interfaces" => show_interfaces(panel).await,
        "detect" => print_json(&panel.interfaces().detect().await),
        "settings" => print_json(panel.settings().await?),
        "save" => save_selection(panel, &args[1..]).await,
        "toggle" => toggle_setting(panel, arg(args, 1, "开关名称")?, arg(args, 2, "on|off")?).await,
        "hwid" => {
            let user_agent = arg(args, 1, "user-agent")?.to_string();
            let device_os = arg(args, 2, "device-os")?.to_string();
            let saved = panel
                .update_settings(|draft| {
                    draft.hwid_user_agent = user_agent;
                    draft.hwid_device_os = device_os;
                })
                .await?;
            print_json(saved)
        }
        "exclusions" => exclusions(panel, &args[1..]).await,
        "service" => service(panel, args.get(1).map(String::as_str).unwrap_or("status")).await,
        "config" => config(panel, &args[1..]).await,
        "rules" => rules(panel, &args[1..]).await,
        "servers" => servers(panel, &args[1..]).await,
        "kernel" => kernel(panel, args.get(1).map(String::as_str).unwrap_or("status")).await,
        "logs" => follow_logs(panel).await,
        other => bail!("未知命令：{}，使用 help 查看可用命令", other),
    }
}

#[derive(Serialize)]
struct InterfaceGroup<'a> {
    title: &'static str,
    names: Vec<&'a str>,
}

#[derive(Serialize)]
struct InterfacesOutput<'a> {
    #[serde(flatten)]
    overview: &'a InterfaceOverview,
    groups: Vec<InterfaceGroup<'a>>,
    status: Vec<String>,
    hint: String,
}

// 按类别分组，空分组不输出
fn group_interfaces(overview: &InterfaceOverview) -> Vec<InterfaceGroup<'_>> {
    InterfaceCategory::DISPLAY_ORDER
        .iter()
        .filter_map(|category| {
            let names: Vec<&str> = overview
                .interfaces
                .iter()
                .filter(|iface| iface.category == *category)
                .map(|iface| iface.name.as_str())
                .collect();
            (!names.is_empty()).then(|| InterfaceGroup {
                title: category.title(),
                names,
            })
        })
        .collect()
}

async fn show_interfaces<H: Host + ?Sized>(panel: &PanelCoordinator<H>) -> Result<()> {
    let overview = panel.interfaces().load().await?;
    print_json(&InterfacesOutput {
        groups: group_interfaces(&overview),
        status: status_lines(&overview.settings, &overview.selection),
        hint: detection_hint(&overview.settings),
        overview: &overview,
    })
}

async fn save_selection<H: Host + ?Sized>(
    panel: &mut PanelCoordinator<H>,
    args: &[String],
) -> Result<()> {
    let mode: InterfaceMode = arg(args, 0, "exclude|explicit")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let selection = args[1..].to_vec();

    let saved = panel
        .update_settings(|draft| {
            draft.mode = mode;
            draft.selection = selection;
        })
        .await?;
    print_json(&saved.effective_interfaces())
}

async fn toggle_setting<H: Host + ?Sized>(
    panel: &mut PanelCoordinator<H>,
    name: &str,
    value: &str,
) -> Result<()> {
    let enabled = parse_switch(value)?;
    let kind = match name {
        "auto-lan" => Some(AutoDetectKind::Lan),
        "auto-wan" => Some(AutoDetectKind::Wan),
        "block-quic" | "hwid" => None,
        other => bail!("未知的开关：{}", other),
    };
    let current = panel.settings().await?.clone();

    let saved = panel
        .update_settings(|draft| match kind {
            Some(kind) => {
                draft.set_auto_detect(kind, enabled);
                // 关闭自动探测时取消勾选探测到的接口
                if !enabled {
                    draft.selection = disable_auto_detect(&current, kind, &draft.selection);
                }
            }
            None if name == "block-quic" => draft.block_quic = enabled,
            None => draft.enable_hwid = enabled,
        })
        .await?;
    print_json(saved)
}

async fn exclusions<H: Host + ?Sized>(panel: &PanelCoordinator<H>, names: &[String]) -> Result<()> {
    let manager = panel.interfaces();
    if !names.is_empty() {
        manager.save_exclusions(names).await?;
    }
    print_json(&manager.load_exclusions().await?)
}

async fn service<H: Host + ?Sized>(panel: &PanelCoordinator<H>, action: &str) -> Result<()> {
    let controller = panel.service();
    match action {
        "status" => {}
        "start" => controller.run(ServiceAction::Start).await?,
        "stop" => controller.run(ServiceAction::Stop).await?,
        "reload" => controller.run(ServiceAction::Reload).await?,
        "restart" => controller.run(ServiceAction::Restart).await?,
        "toggle" => return print_json(&controller.toggle().await?),
        other => bail!("未知的服务操作：{}", other),
    }
    print_json(&serde_json::json!({ "running": controller.is_running().await }))
}

async fn config<H: Host + ?Sized>(panel: &PanelCoordinator<H>, args: &[String]) -> Result<()> {
    let config = panel.config();
    match args.first().map(String::as_str).unwrap_or("show") {
        "show" => {
            print!("{}", config.load().await?);
            Ok(())
        }
        "apply" => {
            let content = read_input(arg(args, 1, "配置文件")?).await?;
            print_json(&config.save_and_apply(&content).await?)
        }
        "dashboard" => {
            let host = args.get(1).map(String::as_str).unwrap_or("192.168.1.1");
            println!("{}", config.dashboard(host).await?);
            Ok(())
        }
        other => bail!("未知的配置操作：{}", other),
    }
}

async fn rules<H: Host + ?Sized>(panel: &PanelCoordinator<H>, args: &[String]) -> Result<()> {
    let lists = panel.rule_lists();
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => print_json(&lists.list().await?),
        "create" => {
            let file_name = lists.create(arg(args, 1, "名称")?).await?;
            println!("{}", file_name);
            Ok(())
        }
        "save" => {
            let file_name = arg(args, 1, "文件名")?;
            let content = read_input(arg(args, 2, "内容文件")?).await?;
            lists.save(file_name, &content).await?;
            Ok(())
        }
        "delete" => {
            lists.delete(arg(args, 1, "文件名")?).await?;
            Ok(())
        }
        other => bail!("未知的规则列表操作：{}", other),
    }
}

async fn servers<H: Host + ?Sized>(panel: &PanelCoordinator<H>, args: &[String]) -> Result<()> {
    let servers = panel.local_servers();
    match args.first().map(String::as_str).unwrap_or("show") {
        "show" => {
            print!("{}", servers.load().await?);
            Ok(())
        }
        "save" => {
            let content = read_input(arg(args, 1, "服务器列表文件")?).await?;
            print_json(&servers.save(&content).await?)
        }
        "clear" => print_json(&servers.clear().await?),
        other => bail!("未知的服务器列表操作：{}", other),
    }
}

async fn kernel<H: Host + ?Sized>(panel: &PanelCoordinator<H>, action: &str) -> Result<()> {
    let kernel = panel.kernel();
    match action {
        "status" => print_json(&kernel.kernel_report().await),
        "install" => print_json(&kernel.install_latest().await?),
        other => bail!("未知的内核操作：{}", other),
    }
}

// 实时输出日志，Ctrl+C 退出
async fn follow_logs<H: Host + ?Sized>(panel: &PanelCoordinator<H>) -> Result<()> {
    let mut tail = LogTail::new();

    loop {
        match tail.poll(panel.host(), panel.paths()).await {
            None => bail!("未找到 logread：{}", panel.paths().logread().display()),
            Some(LogUpdate::Append(lines)) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Some(LogUpdate::Reset) => println!("--- 日志已清空 ---"),
            Some(LogUpdate::Unchanged) => {}
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("收到 Ctrl+C 信号");
                return Ok(());
            }
            _ = tokio::time::sleep(LOG_POLL_INTERVAL) => {}
        }
    }
}
