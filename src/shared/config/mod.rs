/// 環境設定関連のモジュール
pub mod environment;

// 便利な再エクスポート
pub use environment::{
    default_database_path, get_database_filename, initialize_logging_system,
    load_environment_variables, parse_log_level, Environment, EnvironmentConfig,
};
