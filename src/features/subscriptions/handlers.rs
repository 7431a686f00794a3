use super::models::{CostFilter, CreateSubscriptionDto, Page, UpdateSubscriptionDto};
use super::repository;
use crate::server::http::{empty_response, json_response, query_params, read_json, BoxError};
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use chrono::{NaiveDate, Utc};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use uuid::Uuid;

/// 一覧取得のページサイズの既定値
const DEFAULT_PAGE_LIMIT: u32 = 10;

/// サービス名の最大文字数
const MAX_SERVICE_NAME_CHARS: usize = 100;

/// サブスクリプションを作成する
///
/// # 戻り値
/// 201 と作成されたサブスクリプション
pub async fn create_subscription<B>(
    req: Request<B>,
    state: &AppState,
) -> AppResult<Response<String>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let dto: CreateSubscriptionDto = read_json(req.into_body()).await?;

    // バリデーション
    validate_create_subscription_dto(&dto)?;

    let subscription = state.with_db(|conn| repository::create(conn, dto))?;

    log::info!(
        "サブスクリプションを作成しました: id={}, user_id={}",
        subscription.id,
        subscription.user_id
    );
    json_response(StatusCode::CREATED, &subscription)
}

/// サブスクリプション一覧を取得する
///
/// クエリ `page`（既定 1）と `limit`（既定 10）でページを指定する。
pub fn list_subscriptions<B>(req: &Request<B>, state: &AppState) -> AppResult<Response<String>> {
    let params = query_params(req.uri().query());
    let page = Page::new(
        parse_positive(&params, "page").unwrap_or(1),
        parse_positive(&params, "limit").unwrap_or(DEFAULT_PAGE_LIMIT),
    );

    let subscriptions = state.with_db(|conn| repository::find_all(conn, page))?;

    log::info!("サブスクリプション一覧を取得しました: count={}", subscriptions.len());
    json_response(StatusCode::OK, &subscriptions)
}

/// IDでサブスクリプションを取得する
pub fn get_subscription(id: &str, state: &AppState) -> AppResult<Response<String>> {
    let id = parse_subscription_id(id)?;
    let subscription = state.with_db(|conn| repository::find_by_id(conn, id))?;

    log::info!("サブスクリプションを取得しました: id={id}");
    json_response(StatusCode::OK, &subscription)
}

/// サブスクリプションを更新する
pub async fn update_subscription<B>(
    req: Request<B>,
    id: &str,
    state: &AppState,
) -> AppResult<Response<String>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let id = parse_subscription_id(id)?;
    let dto: UpdateSubscriptionDto = read_json(req.into_body()).await?;

    // バリデーション
    validate_update_subscription_dto(&dto)?;

    let subscription = state.with_db(|conn| repository::update(conn, id, dto))?;

    log::info!("サブスクリプションを更新しました: id={id}");
    json_response(StatusCode::OK, &subscription)
}

/// サブスクリプションを削除する
///
/// # 戻り値
/// 204（ボディなし）
pub fn delete_subscription(id: &str, state: &AppState) -> AppResult<Response<String>> {
    let id = parse_subscription_id(id)?;
    state.with_db(|conn| repository::delete(conn, id))?;

    log::info!("サブスクリプションを削除しました: id={id}");
    empty_response(StatusCode::NO_CONTENT)
}

/// 絞り込み条件に一致するサブスクリプションの請求総額を取得する
///
/// # クエリ
/// * `user_id` - 利用者ID（UUID）
/// * `service_name` - サービス名
/// * `start_date` / `end_date` - 集計期間（MM-YYYY）
///
/// # 戻り値
/// `{"total_price": <合計>}`
pub fn sum_subscriptions_cost<B>(req: &Request<B>, state: &AppState) -> AppResult<Response<String>> {
    let params = query_params(req.uri().query());
    let filter = parse_cost_filter(&params, Utc::now().date_naive())?;

    let total = state.with_db(|conn| repository::calculate_total_cost(conn, &filter))?;

    log::info!(
        "請求総額を計算しました: user_id={:?}, service_name={:?}, total_price={}",
        filter.user_id,
        filter.service_name,
        total
    );
    json_response(StatusCode::OK, &serde_json::json!({ "total_price": total }))
}

/// 集計クエリを絞り込み条件に変換する
///
/// # 引数
/// * `params` - クエリパラメータ
/// * `today` - `end_date` 省略時に使用する日付
///
/// # 既定値
/// - `start_date` 省略時は下限なし
/// - `end_date` 省略時は `today`
pub fn parse_cost_filter(params: &HashMap<String, String>, today: NaiveDate) -> AppResult<CostFilter> {
    let user_id = match non_empty_param(params, "user_id") {
        Some(value) => Some(
            Uuid::parse_str(value)
                .map_err(|_| AppError::validation("user_id はUUID形式で指定してください"))?,
        ),
        None => None,
    };

    let service_name = non_empty_param(params, "service_name").map(str::to_string);

    let filter_start = match non_empty_param(params, "start_date") {
        Some(value) => parse_month_year(value).ok_or_else(|| {
            AppError::validation("start_date の形式が不正です（MM-YYYY形式で指定してください）")
        })?,
        None => NaiveDate::MIN,
    };

    let filter_end = match non_empty_param(params, "end_date") {
        Some(value) => parse_month_year(value).ok_or_else(|| {
            AppError::validation("end_date の形式が不正です（MM-YYYY形式で指定してください）")
        })?,
        None => today,
    };

    Ok(CostFilter {
        user_id,
        service_name,
        filter_start,
        filter_end,
    })
}

/// MM-YYYY 形式の文字列をその月の1日に変換する
fn parse_month_year(value: &str) -> Option<NaiveDate> {
    let (month, year) = value.split_once('-')?;
    if month.len() != 2 || year.len() != 4 {
        return None;
    }
    if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

fn non_empty_param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_positive(params: &HashMap<String, String>, key: &str) -> Option<u32> {
    non_empty_param(params, key)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value >= 1)
}

fn parse_subscription_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::validation(format!("UUIDが不正です: {id}")))
}

/// サブスクリプション作成DTOのバリデーション
///
/// # 戻り値
/// バリデーション成功時はOk(())、失敗時はバリデーションエラー
fn validate_create_subscription_dto(dto: &CreateSubscriptionDto) -> AppResult<()> {
    validate_service_name(&dto.service_name)?;
    validate_price(dto.price)?;

    // バリデーション: 終了日は開始日以降
    if let Some(end_date) = dto.end_date {
        if end_date < dto.start_date {
            return Err(AppError::validation(
                "終了日は開始日以降の日付を指定してください",
            ));
        }
    }

    Ok(())
}

/// サブスクリプション更新DTOのバリデーション
///
/// 開始日と終了日の前後関係は既存の値と合わせてリポジトリ側で確認する。
fn validate_update_subscription_dto(dto: &UpdateSubscriptionDto) -> AppResult<()> {
    if let Some(ref service_name) = dto.service_name {
        validate_service_name(service_name)?;
    }

    if let Some(price) = dto.price {
        validate_price(price)?;
    }

    Ok(())
}

fn validate_service_name(service_name: &str) -> AppResult<()> {
    // バリデーション: サービス名は必須
    if service_name.trim().is_empty() {
        return Err(AppError::validation("サービス名を入力してください"));
    }

    // 保存されるのは前後の空白を除いた名前
    if service_name.trim().chars().count() > MAX_SERVICE_NAME_CHARS {
        return Err(AppError::validation(
            "サービス名は100文字以内で入力してください",
        ));
    }

    Ok(())
}

fn validate_price(price: i64) -> AppResult<()> {
    // バリデーション: 料金は0以上
    if price < 0 {
        return Err(AppError::validation("料金は0以上の整数で指定してください"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_month_year() {
        assert_eq!(parse_month_year("07-2025"), Some(date(2025, 7, 1)));
        assert_eq!(parse_month_year("12-1999"), Some(date(1999, 12, 1)));

        assert_eq!(parse_month_year("7-2025"), None);
        assert_eq!(parse_month_year("13-2025"), None);
        assert_eq!(parse_month_year("2025-07"), None);
        assert_eq!(parse_month_year("07-25"), None);
        assert_eq!(parse_month_year("+7-2025"), None);
        assert_eq!(parse_month_year(""), None);
    }

    #[test]
    fn test_parse_cost_filter_defaults() {
        let today = date(2025, 10, 18);
        let filter = parse_cost_filter(&params(&[]), today).unwrap();

        assert_eq!(filter.user_id, None);
        assert_eq!(filter.service_name, None);
        assert_eq!(filter.filter_start, NaiveDate::MIN);
        assert_eq!(filter.filter_end, today);
    }

    #[test]
    fn test_parse_cost_filter_values() {
        let filter = parse_cost_filter(
            &params(&[
                ("user_id", "60601fee-2bf1-4721-ae6f-7636e79a0cba"),
                ("service_name", "Yandex Plus"),
                ("start_date", "01-2024"),
                ("end_date", "06-2024"),
            ]),
            date(2025, 1, 1),
        )
        .unwrap();

        assert_eq!(
            filter.user_id,
            Some(Uuid::parse_str("60601fee-2bf1-4721-ae6f-7636e79a0cba").unwrap())
        );
        assert_eq!(filter.service_name.as_deref(), Some("Yandex Plus"));
        assert_eq!(filter.filter_start, date(2024, 1, 1));
        assert_eq!(filter.filter_end, date(2024, 6, 1));
    }

    #[test]
    fn test_parse_cost_filter_empty_values_are_absent() {
        let today = date(2025, 1, 1);
        let filter = parse_cost_filter(
            &params(&[("user_id", ""), ("start_date", ""), ("end_date", "")]),
            today,
        )
        .unwrap();

        assert_eq!(filter.user_id, None);
        assert_eq!(filter.filter_start, NaiveDate::MIN);
        assert_eq!(filter.filter_end, today);
    }

    #[test]
    fn test_parse_cost_filter_rejects_malformed_values() {
        let today = date(2025, 1, 1);
        for pairs in [
            [("start_date", "2024-01")],
            [("end_date", "1-2024")],
            [("user_id", "not-a-uuid")],
        ] {
            let result = parse_cost_filter(&params(&pairs), today);
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_validate_create_subscription_dto() {
        let valid = CreateSubscriptionDto {
            user_id: Uuid::new_v4(),
            service_name: "svc".to_string(),
            price: 0,
            start_date: date(2024, 1, 1),
            end_date: Some(date(2024, 1, 1)),
        };
        assert!(validate_create_subscription_dto(&valid).is_ok());

        let blank_name = CreateSubscriptionDto {
            service_name: "  ".to_string(),
            ..valid.clone()
        };
        assert!(validate_create_subscription_dto(&blank_name).is_err());

        let negative_price = CreateSubscriptionDto {
            price: -1,
            ..valid.clone()
        };
        assert!(validate_create_subscription_dto(&negative_price).is_err());

        let ends_before_start = CreateSubscriptionDto {
            end_date: Some(date(2023, 12, 31)),
            ..valid.clone()
        };
        assert!(validate_create_subscription_dto(&ends_before_start).is_err());

        let long_name = CreateSubscriptionDto {
            service_name: "あ".repeat(101),
            ..valid
        };
        assert!(validate_create_subscription_dto(&long_name).is_err());
    }

    #[test]
    fn test_service_name_length_ignores_surrounding_whitespace() {
        let padded = format!("  {}  ", "あ".repeat(100));
        assert!(validate_service_name(&padded).is_ok());

        let too_long = format!("  {}  ", "あ".repeat(101));
        assert!(validate_service_name(&too_long).is_err());
    }

    #[test]
    fn test_validate_update_subscription_dto() {
        assert!(validate_update_subscription_dto(&UpdateSubscriptionDto::default()).is_ok());

        let negative_price = UpdateSubscriptionDto {
            price: Some(-5),
            ..Default::default()
        };
        assert!(validate_update_subscription_dto(&negative_price).is_err());
    }

    #[test]
    fn test_parse_positive() {
        let values = params(&[("page", "0"), ("limit", "abc")]);
        assert_eq!(parse_positive(&values, "page"), None);
        assert_eq!(parse_positive(&values, "limit"), None);
        assert_eq!(parse_positive(&params(&[("page", "3")]), "page"), Some(3));
    }
}
