use std::path::PathBuf;

use tokio::{net::TcpListener, task::JoinHandle};
use vigia_config::{VigiaConfig, VigiaUserConfig};
use vigia_web::state::AppState;
use vigiad::api::setup_api;

use super::api_client::ApiClient;

fn config_toml() -> String {
    let pem = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../libs/vigia-auth/testdata/rsa-2048.pem");
    format!(
        r#"
[jwt]
algorithm = "rs256"
rsa_pem_path = '{}'

[hash]
memory_kib = 8
iterations = 1
parallelism = 1

[[accounts]]
login = "fulano"
secret = "1234"
email = "fulano@mail.com"

[[accounts]]
login = "admin"
secret = "admin"
admin = true

[authorization_server]

[[authorization_server.clients]]
client_id = "vigia-app"
client_secret = "vigia-app-secret"
redirect_uri = "http://localhost:8080/authorized"
scopes = ["read", "write"]

[[access.rules]]
pattern = "/v1/login"
public = true

[[access.rules]]
pattern = "/v1/users"
public = true

[[access.rules]]
pattern = "/oauth2/**"
public = true

[[access.rules]]
pattern = "/v1/admin/**"
roles = ["ADMIN"]
"#,
        pem.display()
    )
}

/// A server on an ephemeral port, stopped when dropped.
pub struct TestContext {
    pub api: ApiClient,
    pub client: reqwest::Client,
    pub config: VigiaConfig,
    handle: JoinHandle<vigiad::prelude::Result<()>>,
}

impl TestContext {
    pub async fn new() -> Self {
        let user_config =
            VigiaUserConfig::from_toml(&config_toml()).expect("Invalid test configuration");
        let config =
            VigiaConfig::from_user_config(user_config).expect("Invalid test configuration");
        let state = AppState::from_config(&config).expect("Failed to build state");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let handle = setup_api(state, listener)
            .await
            .expect("Failed to start API");

        let client = reqwest::ClientBuilder::new()
            .build()
            .expect("Failed to build reqwest Client");
        Self {
            api: ApiClient {
                url: format!("http://{addr}"),
            },
            client,
            config,
            handle,
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
