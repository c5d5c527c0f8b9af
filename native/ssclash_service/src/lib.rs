// SSClash Service Library
//
// 路由器面板命令行程序，驱动 hub 完成接口设置、服务控制与内核管理

pub mod commands;
pub mod logger;

use anyhow::Result;

// 命令行入口
pub fn cli() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() <= 1 {
        print_usage();
        return Ok(());
    }

    // 修改系统状态的命令需要 root 权限
    if commands::requires_root(&args[1..]) && !check_privileges() {
        print_privilege_error();
        std::process::exit(1);
    }

    logger::init_logger();
    handle_command(&args)
}

// 检查是否有足够的权限运行
fn check_privileges() -> bool {
    #[cfg(not(windows))]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(windows)]
    {
        false
    }
}

// 打印权限不足的错误信息
pub fn print_privilege_error() {
    eprintln!("错误: 此操作需要 root 权限");
    eprintln!();
    eprintln!("提示: 使用 root 账户或 sudo 运行此命令");
}

// 打印使用说明
pub fn print_usage() {
    println!("SSClash Service v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("可用命令：");
    println!("  interfaces                              - 列出网络接口与当前选择");
    println!("  detect                                  - 探测 LAN/WAN 接口");
    println!("  settings                                - 显示接口设置");
    println!("  save <exclude|explicit> [接口...]        - 保存模式与接口选择");
    println!("  toggle <auto-lan|auto-wan|block-quic|hwid> <on|off>");
    println!("                                          - 切换设置开关");
    println!("  hwid <user-agent> <device-os>           - 设置 HWID 请求头");
    println!("  exclusions [接口...]                     - 显示或设置排除列表");
    println!("  service <status|start|stop|toggle|reload|restart>");
    println!("                                          - 控制 Clash 服务");
    println!("  config <show|apply 文件|dashboard 主机>  - 配置文件与控制面板");
    println!("  rules <list|create 名称|save 文件名 内容文件|delete 文件名>");
    println!("                                          - 管理本地规则列表");
    println!("  servers <show|save 文件|clear>           - 管理本地服务器列表");
    println!("  kernel <status|install>                 - 内核状态与安装");
    println!("  logs                                    - 实时查看 Clash 日志");
    println!("  version                                 - 显示版本号");
    println!();
    println!("注意：修改设置、控制服务、安装内核需要 root 权限；文件参数为 - 时从标准输入读取");
}

// 处理命令行参数
pub fn handle_command(args: &[String]) -> Result<()> {
    if args.len() <= 1 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "version" | "-v" | "--version" => {
            println!("SSClash Service v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let mut panel = hub::PanelCoordinator::local();
                commands::run(&mut panel, &args[1..]).await
            })
        }
    }
}
