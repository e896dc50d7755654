use std::str::FromStr;

use reqwest::{Response, Url};
use serde::Serialize;

pub struct ApiClient {
    pub url: String,
}

impl ApiClient {
    fn path(&self, endpoint: &str) -> Url {
        Url::from_str(&format!("{}/{endpoint}", self.url)).expect("Invalid endpoint")
    }

    pub async fn get(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        token: Option<&str>,
    ) -> reqwest::Result<Response> {
        let mut request = client.get(self.path(endpoint));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        body: &T,
    ) -> reqwest::Result<Response> {
        client.post(self.path(endpoint)).json(body).send().await
    }

    /// Form post authenticated with HTTP Basic client credentials.
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        credentials: Option<(&str, &str)>,
        form: &T,
    ) -> reqwest::Result<Response> {
        let mut request = client.post(self.path(endpoint)).form(form);
        if let Some((id, secret)) = credentials {
            request = request.basic_auth(id, Some(secret));
        }
        request.send().await
    }
}
