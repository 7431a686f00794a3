use super::models::{ClippedPeriod, MergedSegment, Period, Window};
use chrono::{Days, NaiveDate};

/// 隣接とみなす日数の許容幅
///
/// 旧プランの終了日と新プランの開始日が連続している場合に、
/// 1つの連続した課金区間として扱うための固定値。
pub const ADJACENCY_TOLERANCE_DAYS: u64 = 1;

/// 期間をウィンドウの範囲に切り詰める
///
/// 継続中の期間はウィンドウの上限日で終了するものとして扱う。
pub fn clip(period: &Period, window: &Window) -> ClippedPeriod {
    let end = period
        .end
        .unwrap_or(window.filter_end)
        .min(window.filter_end);

    ClippedPeriod {
        price: period.price,
        start: period.start.max(window.filter_start),
        end,
    }
}

/// 期間の集合をウィンドウで切り詰め、重複・隣接する期間を統合する
///
/// # 引数
/// * `periods` - 課金対象の期間
/// * `window` - 集計ウィンドウ
///
/// # 戻り値
/// 開始日順に並んだ、互いに重ならない課金区間
///
/// # 統合ルール
/// 開始日が直前の区間の終了日 + 1日以内であれば同じ区間に統合し、
/// 料金は統合された期間の最大値を区間全体に適用する。
/// ウィンドウと重ならない期間（切り詰め後に `start > end`）は統合の対象外。
pub fn merge(periods: &[Period], window: &Window) -> Vec<MergedSegment> {
    let mut clipped: Vec<ClippedPeriod> = periods
        .iter()
        .map(|p| clip(p, window))
        .filter(|p| !p.is_degenerate())
        .collect();

    // 安定ソート: 開始日が同じ期間は入力順を保つ
    clipped.sort_by_key(|p| p.start);

    coalesce(clipped)
}

/// 開始日順に並んだ期間を畳み込んで課金区間のリストを作る
fn coalesce<I>(sorted: I) -> Vec<MergedSegment>
where
    I: IntoIterator<Item = ClippedPeriod>,
{
    let mut periods = sorted.into_iter();
    let Some(first) = periods.next() else {
        return Vec::new();
    };

    let (mut merged, last) = periods.fold(
        (Vec::new(), MergedSegment::from(first)),
        |(mut merged, running), next| {
            if absorbs(&running, &next) {
                (merged, extend(running, &next))
            } else {
                merged.push(running);
                (merged, MergedSegment::from(next))
            }
        },
    );
    merged.push(last);
    merged
}

fn absorbs(running: &MergedSegment, next: &ClippedPeriod) -> bool {
    next.start <= adjacency_limit(running.end)
}

fn extend(running: MergedSegment, next: &ClippedPeriod) -> MergedSegment {
    MergedSegment {
        price: running.price.max(next.price),
        start: running.start,
        end: running.end.max(next.end),
    }
}

fn adjacency_limit(end: NaiveDate) -> NaiveDate {
    end.checked_add_days(Days::new(ADJACENCY_TOLERANCE_DAYS))
        .unwrap_or(NaiveDate::MAX)
}
