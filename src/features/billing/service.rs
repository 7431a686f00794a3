use super::merger::merge;
use super::models::{BilledSegment, MergedSegment, Period, Window};
use super::months::months_between;

/// 課金区間ごとの請求内訳を計算する
///
/// # 引数
/// * `periods` - 利用者・サービスで絞り込み済みの期間
/// * `window` - 集計ウィンドウ
///
/// # 戻り値
/// 開始日順に並んだ課金区間ごとの請求額
pub fn bill(periods: &[Period], window: &Window) -> Vec<BilledSegment> {
    merge(periods, window).into_iter().map(bill_segment).collect()
}

fn bill_segment(segment: MergedSegment) -> BilledSegment {
    let months = months_between(segment.start, segment.end);
    BilledSegment {
        segment,
        months,
        amount: segment.price.saturating_mul(u64::from(months)),
    }
}

/// ウィンドウ内の請求総額を計算する
///
/// 期間が1つもウィンドウに重ならない場合は0を返す。
pub fn sum_cost(periods: &[Period], window: &Window) -> u64 {
    bill(periods, window)
        .iter()
        .fold(0u64, |total, billed| total.saturating_add(billed.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use quickcheck_macros::quickcheck;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_input_costs_nothing() {
        let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
        assert_eq!(sum_cost(&[], &window), 0);
        assert_eq!(sum_cost(&[], &Window::new(NaiveDate::MIN, date(2024, 1, 1))), 0);
    }

    #[test]
    fn test_single_period_inside_window() {
        let window = Window::new(date(2024, 1, 1), date(2024, 4, 1));
        let periods = [Period::new(100, date(2024, 1, 1), Some(date(2024, 3, 1)))];

        assert_eq!(sum_cost(&periods, &window), 300);
    }

    #[test]
    fn test_overlapping_periods_billed_at_max_price() {
        let window = Window::new(date(2024, 1, 1), date(2024, 4, 1));
        let periods = [
            Period::new(100, date(2024, 1, 1), Some(date(2024, 3, 1))),
            Period::new(150, date(2024, 2, 1), Some(date(2024, 4, 1))),
        ];

        let billed = bill(&periods, &window);
        assert_eq!(billed.len(), 1);
        assert_eq!(billed[0].months, 4);
        assert_eq!(billed[0].segment.price, 150);
        assert_eq!(sum_cost(&periods, &window), 600);
    }

    #[test]
    fn test_open_ended_period_clipped_to_single_day() {
        let window = Window::new(date(2024, 1, 1), date(2024, 1, 1));
        let periods = [Period::open_ended(499, date(2023, 6, 1))];

        assert_eq!(sum_cost(&periods, &window), 499);
    }

    #[test]
    fn test_periods_outside_window_cost_nothing() {
        let window = Window::new(date(2024, 1, 1), date(2024, 6, 30));
        let before = [Period::new(100, date(2023, 1, 1), Some(date(2023, 6, 30)))];
        let after = [Period::new(100, date(2024, 8, 1), Some(date(2024, 9, 30)))];

        assert_eq!(sum_cost(&before, &window), 0);
        assert_eq!(sum_cost(&after, &window), 0);
    }

    #[test]
    fn test_expired_period_mixed_with_active_one() {
        let window = Window::new(date(2024, 1, 1), date(2024, 6, 30));
        let active = Period::new(100, date(2024, 1, 1), Some(date(2024, 6, 30)));
        let expired = Period::new(999, date(2023, 1, 1), Some(date(2023, 6, 30)));

        assert_eq!(sum_cost(&[active], &window), 600);
        assert_eq!(sum_cost(&[active, expired], &window), 600);
        assert_eq!(sum_cost(&[expired, active], &window), 600);
    }

    #[test]
    fn test_adjacent_plans_billed_as_one_run() {
        let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
        let periods = [
            Period::new(100, date(2024, 1, 1), Some(date(2024, 1, 31))),
            Period::new(200, date(2024, 2, 1), Some(date(2024, 2, 29))),
        ];

        let billed = bill(&periods, &window);
        assert_eq!(billed.len(), 1);
        // 1/1 〜 2/29 は2か月、料金は高い方
        assert_eq!(sum_cost(&periods, &window), 400);
    }

    #[test]
    fn test_separate_segments_are_summed() {
        let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
        let periods = [
            Period::new(100, date(2024, 1, 1), Some(date(2024, 2, 1))),
            Period::new(300, date(2024, 6, 1), Some(date(2024, 6, 30))),
        ];

        // 2か月 × 100 + 1か月 × 300
        assert_eq!(sum_cost(&periods, &window), 500);
    }

    #[test]
    fn test_unbounded_window_starts_at_first_period() {
        let window = Window::new(NaiveDate::MIN, date(2024, 3, 31));
        let periods = [Period::open_ended(10, date(2024, 1, 1))];

        assert_eq!(sum_cost(&periods, &window), 30);
    }

    #[test]
    fn test_large_prices_saturate() {
        let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
        let periods = [Period::open_ended(u64::MAX, date(2024, 1, 1))];

        assert_eq!(sum_cost(&periods, &window), u64::MAX);
    }

    #[quickcheck]
    fn prop_cost_bounded_by_most_expensive_plan(raw: Vec<(u16, u16, Option<u16>)>) -> bool {
        let base = date(2024, 1, 1);
        let window = Window::new(base, date(2024, 12, 31));
        let periods: Vec<Period> = raw
            .into_iter()
            .map(|(price, start, len)| {
                let start = base + Days::new(u64::from(start % 366));
                let end = len.map(|len| start + Days::new(u64::from(len % 366)));
                Period::new(u64::from(price), start, end)
            })
            .collect();

        let max_price = periods.iter().map(|p| p.price).max().unwrap_or(0);
        let total = sum_cost(&periods, &window);

        // 隣接区間は別々に端月を数えるため、区間数に応じて上限が増える
        let segments = bill(&periods, &window).len() as u64;
        total <= max_price * (12 + segments)
    }

    #[quickcheck]
    fn prop_periods_outside_window_do_not_change_cost(
        inside: Vec<(u16, u16, Option<u16>)>,
        outside: Vec<(u16, u16, u16, bool)>,
    ) -> bool {
        let base = date(2024, 1, 1);
        let window = Window::new(base, date(2024, 12, 31));
        let mut periods: Vec<Period> = inside
            .into_iter()
            .map(|(price, start, len)| {
                let start = base + Days::new(u64::from(start % 366));
                let end = len.map(|len| start + Days::new(u64::from(len % 366)));
                Period::new(u64::from(price), start, end)
            })
            .collect();
        let expected = sum_cost(&periods, &window);

        // ウィンドウの前に終わる期間と、後に始まる期間を混ぜる
        for (price, offset, len, before) in outside {
            let period = if before {
                let end = base - Days::new(1 + u64::from(offset % 400));
                Period::new(u64::from(price), end - Days::new(u64::from(len % 400)), Some(end))
            } else {
                let start = date(2025, 1, 1) + Days::new(u64::from(offset % 400));
                let end = (len % 2 == 0).then(|| start + Days::new(u64::from(len % 400)));
                Period::new(u64::from(price), start, end)
            };
            let at = usize::from(offset) % (periods.len() + 1);
            periods.insert(at, period);
        }

        sum_cost(&periods, &window) == expected
    }
}
