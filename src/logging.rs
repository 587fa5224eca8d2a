use tracing_subscriber::EnvFilter;

/// ログ出力を初期化（`RUST_LOG` が設定されていればそちらを優先）
///
/// 既に初期化済みの場合は何もしない。初期化した場合に `true` を返す。
pub fn init_logging(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
