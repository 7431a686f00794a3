/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するコード（モデル、リポジトリ、ハンドラー、集計ロジック）
/// を含む自己完結型のユニットです。
pub mod billing;
pub mod subscriptions;
