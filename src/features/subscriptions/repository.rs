use super::models::{CostFilter, CreateSubscriptionDto, Page, Subscription, UpdateSubscriptionDto};
use crate::features::billing::{self, Period};
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, service_name, price, start_date, end_date, created_at, updated_at
     FROM subscriptions";

/// サブスクリプションを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - サブスクリプション作成用DTO
///
/// # 戻り値
/// 作成されたサブスクリプション、または失敗時はエラー
pub fn create(conn: &Connection, dto: CreateSubscriptionDto) -> AppResult<Subscription> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO subscriptions (id, user_id, service_name, price, start_date, end_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            dto.user_id.to_string(),
            dto.service_name.trim(),
            dto.price,
            dto.start_date,
            dto.end_date,
            now,
            now
        ],
    )?;

    find_by_id(conn, id)
}

/// IDでサブスクリプションを取得する
///
/// # 戻り値
/// サブスクリプション、または存在しない場合は NotFound
pub fn find_by_id(conn: &Connection, id: Uuid) -> AppResult<Subscription> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id.to_string()],
        map_subscription,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::NotFound(format!("ID {id} のサブスクリプションが見つかりません"))
        }
        _ => AppError::Database(e.to_string()),
    })
}

/// サブスクリプション一覧を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `page` - ページ指定
///
/// # 戻り値
/// 開始日順のサブスクリプションのリスト
pub fn find_all(conn: &Connection, page: Page) -> AppResult<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} ORDER BY start_date, id LIMIT ?1 OFFSET ?2"
    ))?;

    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
    let subscriptions = stmt.query_map(params![i64::from(page.limit), offset], map_subscription)?;

    subscriptions
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// サブスクリプションを更新する
///
/// 利用者IDは変更できない。更新後の終了日が開始日より前になる場合は
/// バリデーションエラーを返す。
pub fn update(
    conn: &Connection,
    id: Uuid,
    dto: UpdateSubscriptionDto,
) -> AppResult<Subscription> {
    let now = Utc::now();

    // 既存のサブスクリプションを取得
    let existing = find_by_id(conn, id)?;

    // 更新するフィールドを決定
    let service_name = dto
        .service_name
        .map(|name| name.trim().to_string())
        .unwrap_or(existing.service_name);
    let price = dto.price.unwrap_or(existing.price);
    let start_date = dto.start_date.unwrap_or(existing.start_date);
    let end_date = dto.end_date.unwrap_or(existing.end_date);

    if let Some(end_date) = end_date {
        if end_date < start_date {
            return Err(AppError::validation(
                "終了日は開始日以降の日付を指定してください",
            ));
        }
    }

    conn.execute(
        "UPDATE subscriptions
         SET service_name = ?1, price = ?2, start_date = ?3, end_date = ?4, updated_at = ?5
         WHERE id = ?6",
        params![service_name, price, start_date, end_date, now, id.to_string()],
    )?;

    find_by_id(conn, id)
}

/// サブスクリプションを削除する
pub fn delete(conn: &Connection, id: Uuid) -> AppResult<()> {
    let rows_affected = conn.execute(
        "DELETE FROM subscriptions WHERE id = ?1",
        params![id.to_string()],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のサブスクリプションが見つかりません"
        )));
    }

    Ok(())
}

/// 集計ウィンドウに重なる可能性のある期間を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `filter` - 利用者・サービス名・ウィンドウの絞り込み条件
///
/// # 戻り値
/// 課金期間のリスト。ウィンドウとの厳密な重なりは集計側で判定する
pub fn find_periods(conn: &Connection, filter: &CostFilter) -> AppResult<Vec<Period>> {
    let window = filter.window();
    let user_id = filter.user_id.map(|id| id.to_string());

    let mut sql =
        String::from("SELECT price, start_date, end_date FROM subscriptions WHERE start_date <= ?1");
    let mut values: Vec<&dyn ToSql> = vec![&filter.filter_end];

    // 下限なしのウィンドウでは終了日の条件を付けない
    if window.has_lower_bound() {
        values.push(&filter.filter_start);
        sql.push_str(&format!(
            " AND (end_date IS NULL OR end_date >= ?{})",
            values.len()
        ));
    }

    if let Some(user_id) = &user_id {
        values.push(user_id);
        sql.push_str(&format!(" AND user_id = ?{}", values.len()));
    }

    if let Some(service_name) = &filter.service_name {
        values.push(service_name);
        sql.push_str(&format!(" AND service_name = ?{}", values.len()));
    }

    log::debug!("料金集計クエリ: {sql}");

    let mut stmt = conn.prepare(&sql)?;
    let periods = stmt.query_map(values.as_slice(), |row| {
        let price: i64 = row.get(0)?;
        let price = u64::try_from(price)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
        Ok(Period::new(price, row.get(1)?, row.get(2)?))
    })?;

    periods
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// 絞り込み条件に一致するサブスクリプションの請求総額を計算する
///
/// # 戻り値
/// 請求総額、または失敗時はエラー
pub fn calculate_total_cost(conn: &Connection, filter: &CostFilter) -> AppResult<u64> {
    let periods = find_periods(conn, filter)?;
    let total = billing::sum_cost(&periods, &filter.window());

    log::debug!(
        "請求総額を計算しました: periods={}, total={}",
        periods.len(),
        total
    );

    Ok(total)
}

fn map_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: parse_uuid(row, 0)?,
        user_id: parse_uuid(row, 1)?,
        service_name: row.get(2)?,
        price: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
