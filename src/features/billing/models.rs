use chrono::NaiveDate;

/// 課金対象となるサブスクリプション期間
///
/// `start` と `end` はどちらも日付単位で、両端を含む。
/// `end` が `None` の場合は現在も継続中であることを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// 月額料金
    pub price: u64,
    /// 開始日（この日を含む）
    pub start: NaiveDate,
    /// 終了日（この日を含む）。未設定なら継続中
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn new(price: u64, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { price, start, end }
    }

    /// 終了日が未設定のまま継続している期間を作成する
    pub fn open_ended(price: u64, start: NaiveDate) -> Self {
        Self::new(price, start, None)
    }
}

/// 集計対象の期間（レポートウィンドウ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// 下限日。`NaiveDate::MIN` は下限なしを意味する
    pub filter_start: NaiveDate,
    /// 上限日
    pub filter_end: NaiveDate,
}

impl Window {
    pub fn new(filter_start: NaiveDate, filter_end: NaiveDate) -> Self {
        Self {
            filter_start,
            filter_end,
        }
    }

    pub fn has_lower_bound(&self) -> bool {
        self.filter_start != NaiveDate::MIN
    }
}

/// ウィンドウで切り詰めた後の期間
///
/// 集計呼び出しごとに一時的に生成され、永続化はされない。
/// ウィンドウ外の期間は `start > end` となり、課金区間の統合から除外される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedPeriod {
    pub price: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClippedPeriod {
    pub fn is_degenerate(&self) -> bool {
        self.end < self.start
    }
}

/// 重複・隣接する期間を統合した課金区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedSegment {
    /// 統合された期間のうち最も高い月額料金
    pub price: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<ClippedPeriod> for MergedSegment {
    fn from(period: ClippedPeriod) -> Self {
        Self {
            price: period.price,
            start: period.start,
            end: period.end,
        }
    }
}

/// 課金区間ごとの請求内訳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BilledSegment {
    pub segment: MergedSegment,
    /// 請求対象の月数
    pub months: u32,
    /// `price * months`
    pub amount: u64,
}
