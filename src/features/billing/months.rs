use chrono::{Datelike, NaiveDate};

/// 期間 `[start, end]` に対して請求する月数を計算する
///
/// 期間が触れる暦月をすべて数えるが、最終月は `end` の日が
/// `start` の日以上に達している場合のみ1か月として数える。
/// `end` が `start` より前の場合は0を返す。
///
/// # 例
/// * 2024-01-01 〜 2024-04-01 → 4
/// * 2024-01-15 〜 2024-02-14 → 1
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    let mut months = year_diff * 12 + month_diff;

    if end.day() < start.day() {
        months -= 1;
    }

    u32::try_from(months + 1).unwrap_or(0)
}
