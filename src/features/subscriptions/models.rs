use crate::features::billing::Window;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// サブスクリプションデータモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_name: String,
    /// 月額料金
    pub price: i64,
    pub start_date: NaiveDate,
    /// 終了日。未設定の場合は継続中
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// サブスクリプション作成用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct CreateSubscriptionDto {
    pub user_id: Uuid,
    pub service_name: String,
    pub price: i64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// サブスクリプション更新用DTO
///
/// 指定されなかったフィールドは既存の値を維持する。
/// `end_date` に `null` を指定すると終了日を解除する。
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateSubscriptionDto {
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub end_date: Option<Option<NaiveDate>>,
}

/// 値が存在すれば `null` も含めて `Some` に包む
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// 料金集計の絞り込み条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub filter_start: NaiveDate,
    pub filter_end: NaiveDate,
}

impl CostFilter {
    /// 集計ウィンドウを取得する
    pub fn window(&self) -> Window {
        Window::new(self.filter_start, self.filter_end)
    }
}

/// 一覧取得のページ指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// リポジトリ層でのページ指定の既定値
    pub const DEFAULT_LIMIT: u32 = 1000;

    /// 1未満の値を既定値に補正したページ指定を作成する
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: if limit < 1 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}
