use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;

/// データベース接続を初期化し、テーブルを作成する
///
/// # 引数
/// * `database_path` - SQLiteデータベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. データベースファイルの親ディレクトリの確保
/// 2. データベース接続の開設
/// 3. テーブルとインデックスの作成
pub fn initialize_database(database_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::configuration(format!("データディレクトリの作成に失敗: {e}"))
            })?;
            log::info!("データディレクトリを作成: {:?}", parent);
        }
    }

    let is_first_run = !database_path.exists();

    let conn = Connection::open(database_path)?;
    create_tables(&conn)?;

    if is_first_run {
        log::info!("新規データベースを作成しました: {:?}", database_path);
    } else {
        log::info!("データベースを初期化しました: {:?}", database_path);
    }

    Ok(conn)
}

/// データベーステーブルを作成する
///
/// 既存のテーブルがある場合は何もしない。
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    create_subscriptions_table(conn)?;
    create_indexes(conn)?;
    Ok(())
}

/// サブスクリプションテーブルを作成する
///
/// 日付は `YYYY-MM-DD` 形式のテキストで保存するため、
/// 文字列比較がそのまま日付の前後関係になる。
fn create_subscriptions_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            service_name TEXT NOT NULL,
            price INTEGER NOT NULL CHECK(price >= 0),
            start_date TEXT NOT NULL,
            end_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// インデックスを作成する
fn create_indexes(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_user_id ON subscriptions(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_service_name ON subscriptions(service_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_start_date ON subscriptions(start_date)",
        [],
    )?;

    Ok(())
}
