/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション管理に関連するすべての機能を提供します：
/// - サブスクリプションの作成、読み取り、更新、削除
/// - 利用者・サービス名・期間による請求総額の集計
pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{CostFilter, CreateSubscriptionDto, Page, Subscription, UpdateSubscriptionDto};

pub use repository::{
    calculate_total_cost, create, delete, find_all, find_by_id, find_periods, update,
};
