// 日志初始化：默认 info 级别，可通过 RUST_LOG 覆盖，输出到 stderr

use env_logger::Env;
use std::io::Write;

pub fn init_logger() {
    let result = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();

    if let Err(e) = result {
        eprintln!("日志初始化失败：{}", e);
    }
}
