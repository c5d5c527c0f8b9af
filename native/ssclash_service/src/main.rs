fn main() {
    if let Err(e) = ssclash_service::cli() {
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}
