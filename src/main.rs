#[tokio::main]
async fn main() {
    if let Err(e) = subscription_aggregator_lib::run().await {
        log::error!("アプリケーションの起動に失敗しました: {}", e.details());
        eprintln!("{}", e.details());
        std::process::exit(1);
    }
}
