use dotenv::dotenv;
use legacy_import::{ImportConfig, ImportOrchestrator, JsonStore, LegacyRecord, init_logging};
use std::env;
use std::error::Error;
use std::sync::Arc;

/// 旧システムのレコード（JSON）を JsonStore に取り込むサンプル
///
/// 使い方:
///   cargo run --example import_example -- <records.json> [data_dir]
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // .envファイルを読み込み
    match dotenv() {
        Ok(path) => println!(".envファイルを読み込みました: {:?}", path),
        Err(_) => println!(".envファイルが見つかりません（システム環境変数を使用）"),
    }
    init_logging("info");

    let mut args = env::args().skip(1);
    let Some(records_path) = args.next().or_else(|| env::var("IMPORT_RECORDS_FILE").ok()) else {
        println!("NG 取り込むレコードファイルを指定してください");
        println!("  cargo run --example import_example -- <records.json> [data_dir]");
        return Ok(());
    };
    let data_dir = args
        .next()
        .or_else(|| env::var("IMPORT_DATA_DIR").ok())
        .unwrap_or_else(|| "./data".to_string());

    // 設定を確認
    let config = ImportConfig::from_env()?;
    println!("\n=== 設定 ===");
    println!("Legacy IDフィールド: {}", config.legacy_id_field);
    println!("ログインリダイレクト判定: {}", config.login_redirect_pattern);
    println!("未登録Issueの作成: {}", config.create_missing_issues);
    println!("変更履歴の削除: {}", config.reset_journals);

    // レコードを読み込み
    let raw = tokio::fs::read_to_string(&records_path).await?;
    let records: Vec<LegacyRecord> = serde_json::from_str(&raw)?;
    println!("\n{} 件のレコードを読み込みました: {}", records.len(), records_path);

    // ストアを開いてインポート
    let store = Arc::new(JsonStore::new(&data_dir).load().await?);
    println!("ストア: {}", store.snapshot_path().display());

    let mut orchestrator = ImportOrchestrator::new(store, config).await?;
    println!("照合対象のIssue: {} 件", orchestrator.matcher().len());

    let report = orchestrator.run(&records).await?;

    println!("\n=== インポート結果 ===");
    println!("処理レコード数: {}", report.processed_records);
    println!("  新規作成: {}", report.created_issues);
    println!("  更新: {}", report.updated_issues);
    println!("  失敗: {}", report.failed_records);
    println!("添付ファイル: {} 件保存", report.imported_attachments);
    println!(
        "削除: 添付ファイル {} 件, 変更履歴 {} 件",
        report.attachments_deleted, report.journals_deleted
    );
    println!("処理時間: {:.2}秒", report.duration_seconds());

    if !report.skipped_attachments.is_empty() {
        println!("\nスキップした添付ファイル:");
        for skipped in &report.skipped_attachments {
            println!("  - {} {}: {}", skipped.legacy_id, skipped.filename, skipped.reason);
        }
    }

    if report.is_success {
        println!("\nOK インポートが完了しました");
    } else {
        println!("\nNG エラーがあります:");
        for message in &report.error_messages {
            println!("  - {}", message);
        }
    }

    Ok(())
}
