use crate::features::subscriptions::handlers;
use crate::server::http::{error_response, json_response, BoxError};
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};

const SUBSCRIPTIONS_PATH: &str = "/subscriptions";

/// ルーティング先
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Subscriptions,
    SubscriptionsSum,
    Subscription(&'a str),
}

impl<'a> Route<'a> {
    /// パスからルートを解決する。末尾のスラッシュは無視する
    fn resolve(path: &'a str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/health" => Some(Route::Health),
            SUBSCRIPTIONS_PATH => Some(Route::Subscriptions),
            "/subscriptions/sum" => Some(Route::SubscriptionsSum),
            _ => {
                let id = path.strip_prefix("/subscriptions/")?;
                (!id.contains('/')).then_some(Route::Subscription(id))
            }
        }
    }

    fn allowed_methods(&self) -> &'static str {
        match self {
            Route::Health | Route::SubscriptionsSum => "GET",
            Route::Subscriptions => "GET, POST",
            Route::Subscription(_) => "GET, PUT, DELETE",
        }
    }
}

/// リクエストを対応するハンドラーへ振り分ける
///
/// ハンドラーのエラーはここでJSONのエラーレスポンスに変換する。
pub async fn route<B>(req: Request<B>, state: &AppState) -> Response<String>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match dispatch(req, state).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> AppResult<Response<String>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let route = Route::resolve(&path)
        .ok_or_else(|| AppError::NotFound(format!("パスが見つかりません: {path}")))?;

    match (req.method().clone(), &route) {
        (Method::GET, Route::Health) => {
            json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
        }
        (Method::GET, Route::Subscriptions) => handlers::list_subscriptions(&req, state),
        (Method::POST, Route::Subscriptions) => handlers::create_subscription(req, state).await,
        (Method::GET, Route::SubscriptionsSum) => handlers::sum_subscriptions_cost(&req, state),
        (Method::GET, Route::Subscription(id)) => handlers::get_subscription(id, state),
        (Method::PUT, Route::Subscription(id)) => {
            handlers::update_subscription(req, id, state).await
        }
        (Method::DELETE, Route::Subscription(id)) => handlers::delete_subscription(id, state),
        (method, route) => Err(AppError::MethodNotAllowed(format!(
            "{method} {path}（許可: {}）",
            route.allowed_methods()
        ))),
    }
}
