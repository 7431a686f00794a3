pub mod features;
pub mod server;
pub mod shared;

use log::{error, info, warn};
use rusqlite::Connection;
use server::ApiServer;
use shared::config::{initialize_logging_system, load_environment_variables, EnvironmentConfig};
use shared::database::initialize_database;
use shared::errors::{AppError, AppResult};
use std::sync::{Arc, Mutex};

/// アプリケーション状態（データベース接続を保持）
pub struct AppState {
    pub db: Mutex<Connection>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// データベース接続をロックして処理を実行する
    ///
    /// ロックは `f` の実行中のみ保持される。
    pub fn with_db<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = self
            .db
            .lock()
            .map_err(|e| AppError::Database(format!("データベースロックエラー: {e}")))?;
        f(&conn)
    }
}

/// アプリケーションを起動し、Ctrl-C を受信するまでリクエストを処理する
pub async fn run() -> AppResult<()> {
    // 環境変数を読み込み（.envファイルがある場合）
    let loaded_env_file = load_environment_variables();

    let config = EnvironmentConfig::from_env()?;

    // ログシステムを初期化
    initialize_logging_system(&config);

    match loaded_env_file {
        Some(file) => info!("{file}ファイルを読み込みました"),
        // 本番環境では環境変数が直接設定される
        None if config.is_production() => info!("環境変数から設定を読み込みました"),
        None => warn!(".envファイルが見つかりません。環境変数が直接設定されていることを確認してください。"),
    }

    info!(
        "アプリケーション初期化を開始します: environment={}, database={:?}",
        config.environment.as_str(),
        config.database_path
    );

    let db_conn = initialize_database(&config.database_path).map_err(|e| {
        error!("データベースの初期化に失敗しました: {e}");
        e
    })?;
    info!("データベースの初期化が完了しました");

    let state = Arc::new(AppState::new(db_conn));
    let server = ApiServer::bind(config.socket_addr()?, state).await?;

    info!("アプリケーション初期化が完了しました");

    server
        .serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("シグナル待機に失敗しました: {e}");
            }
        })
        .await?;

    info!("アプリケーションを終了しました");
    Ok(())
}
