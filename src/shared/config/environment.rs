use crate::shared::errors::{AppError, AppResult};
use std::net::SocketAddr;
use std::path::PathBuf;

/// アプリケーションのデータディレクトリ名
const APP_DIR_NAME: &str = "subscription-aggregator";

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 8080;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: Environment,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
    /// HTTPサーバーの待ち受けホスト
    pub server_host: String,
    /// HTTPサーバーの待ち受けポート
    pub server_port: u16,
    /// SQLiteデータベースファイルのパス
    pub database_path: PathBuf,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合は設定エラー
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// # 引数
    /// * `lookup` - 環境変数名から値を返す関数
    ///
    /// # 既定値
    /// - SERVER_HOST: 0.0.0.0
    /// - SERVER_PORT: 8080
    /// - DATABASE_PATH: データディレクトリ配下の環境別ファイル
    /// - LOG_LEVEL: 開発環境は debug、プロダクション環境は info
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|value| Environment::parse(&value))
            .unwrap_or_else(default_environment);
        let debug_mode = environment == Environment::Development;

        let log_level = non_empty(lookup("LOG_LEVEL")).unwrap_or_else(|| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        let server_host =
            non_empty(lookup("SERVER_HOST")).unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());

        let server_port = match non_empty(lookup("SERVER_PORT")) {
            Some(value) => value.parse::<u16>().map_err(|e| {
                AppError::configuration(format!("SERVER_PORT が不正です: {value} ({e})"))
            })?,
            None => DEFAULT_SERVER_PORT,
        };

        let database_path = non_empty(lookup("DATABASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path(environment));

        Ok(Self {
            environment,
            debug_mode,
            log_level,
            server_host,
            server_port,
            database_path,
        })
    }

    /// 待ち受けアドレスを取得する
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let addr = format!("{}:{}", self.server_host, self.server_port);
        addr.parse::<SocketAddr>().map_err(|e| {
            AppError::configuration(format!("待ち受けアドレスが不正です: {addr} ({e})"))
        })
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// フォールバック: ビルド設定に基づく判定
fn default_environment() -> Environment {
    if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    }
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// データディレクトリ配下の既定のデータベースパスを取得する
///
/// データディレクトリが取得できない環境ではカレントディレクトリを使用する。
pub fn default_database_path(env: Environment) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(get_database_filename(env))
}

/// 環境に応じた.envファイルを読み込む
///
/// ロガー初期化前に呼ばれるため、結果は戻り値で返して呼び出し側でログ出力する。
///
/// # 戻り値
/// 読み込んだファイル名。見つからなかった場合は None
pub fn load_environment_variables() -> Option<&'static str> {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    if dotenv::from_filename(env_file).is_ok() {
        return Some(env_file);
    }

    // 環境固有のファイルがない場合は、デフォルトの.envを試行
    if env_file != ".env" && dotenv::dotenv().is_ok() {
        return Some(".env");
    }

    None
}

/// ログレベル文字列を LevelFilter に変換する
pub fn parse_log_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

/// ログシステムを初期化する
///
/// # 引数
/// * `config` - 環境設定
pub fn initialize_logging_system(config: &EnvironmentConfig) {
    env_logger::Builder::from_default_env()
        .filter_level(parse_log_level(&config.log_level))
        .format_timestamp_secs()
        .format_module_path(config.debug_mode)
        .format_target(false)
        .init();

    log::info!(
        "ログシステムを初期化しました: level={}, environment={}",
        config.log_level,
        config.environment.as_str()
    );
}
