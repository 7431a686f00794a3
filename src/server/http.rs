use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// ボディ読み込み時のエラー型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// 受け付けるリクエストボディの最大サイズ（バイト）
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// リクエストボディを読み込み、JSONとして解析する
///
/// # 引数
/// * `body` - リクエストボディ
///
/// # 戻り値
/// 解析済みの値。ボディが `MAX_BODY_BYTES` を超える場合やJSONとして不正な場合は
/// 400 となるエラー、それ以外の読み込み失敗は HTTP エラー
pub async fn read_json<T, B>(body: B) -> AppResult<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                AppError::validation(format!(
                    "リクエストボディが大きすぎます（上限 {MAX_BODY_BYTES} バイト）"
                ))
            } else {
                AppError::http(format!("リクエストボディの読み込みに失敗しました: {e}"))
            }
        })?
        .to_bytes();

    Ok(serde_json::from_slice(&bytes)?)
}

/// クエリ文字列を解析する
///
/// 同じキーが複数回現れた場合は最初の値を採用する。
pub fn query_params(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// 値をJSONとしてシリアライズしたレスポンスを作成する
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> AppResult<Response<String>> {
    let body = serde_json::to_string(value)?;
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body)
        .map_err(|e| AppError::http(format!("レスポンスの作成に失敗しました: {e}")))
}

/// ボディを持たないレスポンスを作成する
pub fn empty_response(status: StatusCode) -> AppResult<Response<String>> {
    Response::builder()
        .status(status)
        .body(String::new())
        .map_err(|e| AppError::http(format!("レスポンスの作成に失敗しました: {e}")))
}

/// エラーをJSONレスポンスに変換する
///
/// 重要度が低いエラーは warn、それ以外は error でログ出力する。
pub fn error_response(error: &AppError) -> Response<String> {
    match error.severity() {
        ErrorSeverity::Low => log::warn!("リクエスト処理エラー: {}", error.details()),
        _ => log::error!("リクエスト処理エラー: {}", error.details()),
    }

    let body = serde_json::json!({ "error": error.user_message() }).to_string();
    let mut response = Response::new(body);
    *response.status_mut() = error.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
