#![allow(dead_code)]
use std::error::Error;

use api_client::ApiClient;
use vigia_auth::auth_body::{LoginRequest, LoginResponse};

pub mod api_client;
pub mod test_context;

pub const CLIENT_ID: &str = "vigia-app";
pub const CLIENT_SECRET: &str = "vigia-app-secret";
pub const REDIRECT_URI: &str = "http://localhost:8080/authorized";

pub async fn login(
    api: &ApiClient,
    client: &reqwest::Client,
    login: &str,
    secret: &str,
) -> Result<LoginResponse, Box<dyn Error>> {
    let body = LoginRequest {
        login: String::from(login),
        secret: String::from(secret),
    };
    let login: LoginResponse = api.post(client, "v1/login", &body).await?.json().await?;
    Ok(login)
}
