pub mod config;
pub mod errors;
pub mod routes;
pub mod service;

use crate::config::Config;
use crate::errors::GatewayError;
use crate::service::GatewayService;
use megaverse::Megaverse;
use shared::admin_service::AdminService;
use shared::http::serve_http;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

/// Binds both listeners and serves until one of them fails.
pub async fn run(config: Config, megaverse: Megaverse) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(config.listener.address()).await?;
    let admin_listener = TcpListener::bind(config.admin_listener.address()).await?;
    serve(listener, admin_listener, megaverse).await
}

/// Serves the API and admin endpoints on already bound listeners.
///
/// Readiness is reported once the API listener is bound.
pub async fn serve(
    listener: TcpListener,
    admin_listener: TcpListener,
    megaverse: Megaverse,
) -> Result<(), GatewayError> {
    let ready = Arc::new(AtomicBool::new(false));

    let admin_task = serve_http(admin_listener, AdminService::<GatewayError>::new(ready.clone()));

    ready.store(true, Ordering::Relaxed);
    let api_task = serve_http(listener, GatewayService::new(megaverse));

    tokio::try_join!(api_task, admin_task)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use megaverse::config::{Config as MegaverseConfig, PacingConfig, RetryConfig, UpstreamConfig};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_serve_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/polyanets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = MegaverseConfig {
            upstream: UpstreamConfig {
                base_url: Url::parse(&format!("{}/api/", server.uri())).unwrap(),
                candidate_id: "candidate-1".to_string(),
                timeout_secs: 5,
            },
            grid_size: 11,
            pacing: PacingConfig { delay_ms: 0 },
            retry: RetryConfig::default(),
        };
        let megaverse = Megaverse::new(&config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_addr = listener.local_addr().unwrap();
        let admin_addr = admin_listener.local_addr().unwrap();
        let handle = tokio::spawn(serve(listener, admin_listener, megaverse));

        let client = reqwest::Client::new();

        let ready = client
            .get(format!("http://{admin_addr}/ready"))
            .send()
            .await
            .unwrap();
        assert_eq!(ready.status(), 200);

        let response = client
            .post(format!("http://{api_addr}/api/polyanets"))
            .json(&serde_json::json!({"row": 5, "column": 5}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.json::<serde_json::Value>().await.unwrap(),
            serde_json::json!({"message": "Polyanet created successfully."})
        );

        let response = client
            .get(format!("http://{api_addr}/missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        handle.abort();
    }
}
