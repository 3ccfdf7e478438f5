use std::sync::Arc;

use reqwest::Client;
use server::app::build_router;
use server::auth::jwt;
use server::config::Config;
use server::db::MemoryMatchRepository;
use server::events::BroadcastBus;
use server::model::PlayerId;
use server::service::GameService;

pub const SECRET: &str = "integration-test-secret";

/// An in-process server bound to an ephemeral port, backed by the
/// in-memory match store.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let config = Config::local(SECRET);
        let bus = Arc::new(BroadcastBus::new(256));
        let service = Arc::new(GameService::new(
            Arc::new(MemoryMatchRepository::new()),
            bus.clone(),
            config.game,
        ));
        let app = build_router(config, service, bus);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server crashed");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    /// Build a URL for an API endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// A fresh player and a bearer token naming them.
pub fn new_player() -> (PlayerId, String) {
    let player = PlayerId::new();
    let token = jwt::create_token(player, SECRET, 1).expect("Failed to sign token");
    (player, token)
}
