use crate::error::{PushFailure, WatchError};
use clap::ValueEnum;
use log::info;
use reqwest::{Client, Request, Url};
use serde::Serialize;

const SERVERCHAN_BASE: &str = "https://sctapi.ftqq.com";
const PUSHPLUS_BASE: &str = "https://www.pushplus.plus";
const BARK_BASE: &str = "https://api.day.app";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PushProvider {
    #[default]
    None,
    #[value(name = "serverchan")]
    ServerChan,
    #[value(name = "pushplus")]
    PushPlus,
    Bark,
}

impl PushProvider {
    pub fn name(&self) -> &'static str {
        match self {
            PushProvider::None => "none",
            PushProvider::ServerChan => "serverchan",
            PushProvider::PushPlus => "pushplus",
            PushProvider::Bark => "bark",
        }
    }

    fn default_base(&self) -> &'static str {
        match self {
            PushProvider::None => "",
            PushProvider::ServerChan => SERVERCHAN_BASE,
            PushProvider::PushPlus => PUSHPLUS_BASE,
            PushProvider::Bark => BARK_BASE,
        }
    }
}

#[derive(Serialize)]
struct PushPlusMessage<'a> {
    token: &'a str,
    title: &'a str,
    content: &'a str,
}

/// A configured push backend. Only exists when a provider and a token are set.
pub struct PushClient {
    client: Client,
    provider: PushProvider,
    token: String,
    base: String,
}

impl PushClient {
    pub fn new(client: Client, provider: PushProvider, token: &str) -> Option<Self> {
        Self::with_base(client, provider, token, provider.default_base())
    }

    pub fn with_base(client: Client, provider: PushProvider, token: &str, base: &str) -> Option<Self> {
        let token = token.trim();
        if provider == PushProvider::None || token.is_empty() {
            return None;
        }

        Some(Self {
            client,
            provider,
            token: token.to_string(),
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn provider(&self) -> PushProvider {
        self.provider
    }

    pub fn build_request(&self, title: &str, body: &str) -> Result<Request, WatchError> {
        let request = match self.provider {
            PushProvider::ServerChan => self
                .client
                .post(format!("{}/{}.send", self.base, self.token))
                .form(&[("title", title), ("desp", body)]),
            PushProvider::PushPlus => self
                .client
                .post(format!("{}/send", self.base))
                .json(&PushPlusMessage {
                    token: &self.token,
                    title,
                    content: body,
                }),
            PushProvider::Bark => {
                let mut url = Url::parse(&self.base).map_err(|e| WatchError::PushUrl(e.to_string()))?;
                url.path_segments_mut()
                    .map_err(|_| WatchError::PushUrl(format!("{} cannot be a base", self.base)))?
                    .pop_if_empty()
                    .push(&self.token)
                    .push(title)
                    .push(body);
                self.client.get(url)
            }
            PushProvider::None => {
                return Err(WatchError::Config("push provider is disabled".to_string()))
            }
        };

        Ok(request.build()?)
    }

    pub async fn send(&self, title: &str, body: &str) -> Result<(), PushFailure> {
        let failure = |source: WatchError| PushFailure {
            provider: self.provider.name(),
            source,
        };

        let request = self.build_request(title, body).map_err(failure)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| failure(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(WatchError::BadStatus(status)));
        }

        info!("push sent via {}: {}", self.provider.name(), title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(provider: PushProvider) -> PushClient {
        PushClient::new(Client::new(), provider, "tok").unwrap()
    }

    fn body_bytes(request: &Request) -> Vec<u8> {
        request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| b.to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn disabled_or_tokenless_push_is_not_built() {
        assert!(PushClient::new(Client::new(), PushProvider::None, "tok").is_none());
        assert!(PushClient::new(Client::new(), PushProvider::Bark, "").is_none());
        assert!(PushClient::new(Client::new(), PushProvider::PushPlus, "   ").is_none());
    }

    #[test]
    fn serverchan_posts_form_with_token_in_path() {
        let request = client(PushProvider::ServerChan)
            .build_request("hi", "up 3%")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://sctapi.ftqq.com/tok.send");
        assert_eq!(body_bytes(&request), b"title=hi&desp=up+3%25".to_vec());
    }

    #[test]
    fn pushplus_posts_json() {
        let request = client(PushProvider::PushPlus)
            .build_request("hi", "up 3%")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://www.pushplus.plus/send");
        let sent: Value = serde_json::from_slice(&body_bytes(&request)).unwrap();
        assert_eq!(sent, json!({"token": "tok", "title": "hi", "content": "up 3%"}));
    }

    #[test]
    fn bark_embeds_title_and_content_in_path() {
        let request = client(PushProvider::Bark)
            .build_request("BTC alert", "up 3%/h")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.day.app/tok/BTC%20alert/up%203%25%2Fh"
        );
        assert!(request.body().is_none());
    }

    async fn respond_with(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn send_succeeds_on_2xx() {
        let base = respond_with("200 OK").await;
        let push = PushClient::with_base(Client::new(), PushProvider::Bark, "tok", &base).unwrap();
        assert!(push.send("t", "b").await.is_ok());
    }

    #[tokio::test]
    async fn send_reports_non_2xx_as_failure() {
        let base = respond_with("500 Internal Server Error").await;
        let push = PushClient::with_base(Client::new(), PushProvider::PushPlus, "tok", &base).unwrap();

        let failure = push.send("t", "b").await.unwrap_err();
        assert_eq!(failure.provider, "pushplus");
        assert!(matches!(failure.source, WatchError::BadStatus(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn send_reports_network_error_as_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let push = PushClient::with_base(Client::new(), PushProvider::ServerChan, "tok", &base).unwrap();
        let failure = push.send("t", "b").await.unwrap_err();
        assert!(matches!(failure.source, WatchError::HttpError(_)));
    }
}
