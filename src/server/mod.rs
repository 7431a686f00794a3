pub mod http;
pub mod router;

use crate::shared::errors::AppResult;
use crate::AppState;
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// サブスクリプションAPIのHTTPサーバー
pub struct ApiServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl ApiServer {
    /// 指定アドレスでリッスンを開始する
    ///
    /// # 引数
    /// * `addr` - バインドするアドレス（ポート0で自動割り当て）
    /// * `state` - 全リクエストで共有するアプリケーション状態
    pub async fn bind(addr: SocketAddr, state: Arc<AppState>) -> AppResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("HTTPサーバーがリッスンを開始しました: http://{}", listener.local_addr()?);
        Ok(Self { listener, state })
    }

    /// 実際にバインドされたアドレスを取得する
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// `shutdown` が完了するまで接続を受け付ける
    ///
    /// 処理中の接続はそれぞれのタスクで最後まで処理される。
    pub async fn serve_until<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("シャットダウン要求を受信しました。新規接続の受け付けを停止します");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            handle_connection(stream, remote_addr, state).await;
                        });
                    }
                    Err(e) => {
                        log::error!("接続受け入れエラー: {e}");
                    }
                },
            }
        }

        Ok(())
    }
}

/// TCP接続を処理する
async fn handle_connection(stream: TcpStream, remote_addr: SocketAddr, state: Arc<AppState>) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| handle_request(req, remote_addr, Arc::clone(&state)));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: {err}");
    }
}

/// HTTPリクエストを処理し、開始と完了をログに残す
async fn handle_request(
    req: Request<Incoming>,
    remote_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<String>, Infallible> {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    log::info!(
        "リクエスト開始: request_id={request_id}, method={method}, path={path}, remote_addr={remote_addr}"
    );

    let mut response = router::route(req, &state).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    log::info!(
        "リクエスト完了: request_id={request_id}, method={method}, path={path}, status={}, duration_ms={}",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    Ok(response)
}
