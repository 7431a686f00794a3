/// 料金集計機能モジュール
///
/// サブスクリプション期間の集合とレポートウィンドウから請求総額を計算します：
/// - ウィンドウによる期間の切り詰め
/// - 重複・隣接する期間の統合（最大料金を採用）
/// - 課金区間ごとの月数計算と合計
///
/// このモジュールは純粋な計算のみを行い、I/Oや共有状態を持ちません。
pub mod merger;
pub mod models;
pub mod months;
pub mod service;

pub use merger::{clip, merge, ADJACENCY_TOLERANCE_DAYS};
pub use models::{BilledSegment, ClippedPeriod, MergedSegment, Period, Window};
pub use months::months_between;
pub use service::{bill, sum_cost};
