//! HTTP implementation of the remote gateway

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::dto::{BoardDto, BoardWrite, CardDto, CardWrite, LabelDto, LabelWrite, StackDto, StackWrite};
use super::RemoteApi;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::Account;

/// Fixed API path below the account's server URL
const API_PATH: &str = "index.php/apps/deck/api/v1.0";

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Remote gateway speaking the server's REST API over reqwest.
///
/// Each call dispatches at most one request and never retries. Mutating
/// calls check connectivity first and fail with [`Error::Offline`] before
/// any I/O; pulls go straight out and surface transport failures naturally
/// so cached data can keep serving.
pub struct HttpRemote {
    client: reqwest::Client,
    connectivity: Arc<dyn Connectivity>,
    app_password: Option<String>,
}

impl HttpRemote {
    /// Create a gateway gated by the given connectivity source
    pub fn new(connectivity: Arc<dyn Connectivity>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            connectivity,
            app_password: None,
        })
    }

    /// Authenticate requests with an app password (HTTP basic auth)
    #[must_use]
    pub fn with_app_password(mut self, app_password: impl Into<String>) -> Self {
        self.app_password = Some(app_password.into());
        self
    }

    fn url(account: &Account, path: &str) -> String {
        format!("{}/{API_PATH}/{path}", account.normalized_url())
    }

    fn request(&self, method: Method, account: &Account, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, Self::url(account, path))
            .header("Accept", "application/json");
        if let Some(password) = &self.app_password {
            request = request.basic_auth(&account.user_name, Some(password));
        }
        request
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        account: &Account,
        path: &str,
        since: Option<i64>,
    ) -> Result<Vec<T>> {
        let mut request = self.request(Method::GET, account, path);
        if let Some(watermark) = since {
            request = request.header("If-Modified-Since", format_since(watermark));
        }

        let response = request.send().await?;
        // 304 means nothing changed since the watermark
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(Vec::new());
        }
        Self::decode(response).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        account: &Account,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.connectivity.ensure_online()?;
        let response = self
            .request(method, account, path)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn send_empty(&self, method: Method, account: &Account, path: &str) -> Result<()> {
        self.connectivity.ensure_online()?;
        let response = self.request(method, account, path).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Http {
                status: status.as_u16(),
            })
        }
    }

    /// Mutating call whose response body carries nothing we keep
    async fn send_command<B: Serialize + Sync>(
        &self,
        method: Method,
        account: &Account,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.connectivity.ensure_online()?;
        let response = self
            .request(method, account, path)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Http {
                status: status.as_u16(),
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Format a watermark (epoch ms) as the conditional-since header value.
///
/// The server expects a bare GMT HTTP-date; any trailing numeric UTC offset
/// a formatter might append is stripped.
pub(crate) fn format_since(watermark_ms: i64) -> String {
    // out-of-range watermarks fall back to the epoch
    let date = chrono::DateTime::from_timestamp_millis(watermark_ms).unwrap_or_default();
    strip_utc_offset(&date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

fn strip_utc_offset(header: &str) -> String {
    let re = Regex::new(r"\+[0-9]{2}:?[0-9]{2}$").expect("Invalid regex");
    re.replace(header.trim_end(), "").trim_end().to_string()
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn boards(&self, account: &Account, since: Option<i64>) -> Result<Vec<BoardDto>> {
        self.fetch_list(account, "boards?details=true", since).await
    }

    async fn create_board(&self, account: &Account, board: &BoardWrite) -> Result<BoardDto> {
        self.send_json(Method::POST, account, "boards", board).await
    }

    async fn update_board(
        &self,
        account: &Account,
        id: i64,
        board: &BoardWrite,
    ) -> Result<BoardDto> {
        self.send_json(Method::PUT, account, &format!("boards/{id}"), board)
            .await
    }

    async fn delete_board(&self, account: &Account, id: i64) -> Result<()> {
        self.send_empty(Method::DELETE, account, &format!("boards/{id}"))
            .await
    }

    async fn stacks(
        &self,
        account: &Account,
        board_id: i64,
        since: Option<i64>,
    ) -> Result<Vec<StackDto>> {
        self.fetch_list(account, &format!("boards/{board_id}/stacks"), since)
            .await
    }

    async fn create_stack(
        &self,
        account: &Account,
        board_id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto> {
        self.send_json(
            Method::POST,
            account,
            &format!("boards/{board_id}/stacks"),
            stack,
        )
        .await
    }

    async fn update_stack(
        &self,
        account: &Account,
        board_id: i64,
        id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto> {
        self.send_json(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{id}"),
            stack,
        )
        .await
    }

    async fn delete_stack(&self, account: &Account, board_id: i64, id: i64) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            account,
            &format!("boards/{board_id}/stacks/{id}"),
        )
        .await
    }

    async fn create_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card: &CardWrite,
    ) -> Result<CardDto> {
        self.send_json(
            Method::POST,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards"),
            card,
        )
        .await
    }

    async fn update_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
        card: &CardWrite,
    ) -> Result<CardDto> {
        self.send_json(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{id}"),
            card,
        )
        .await
    }

    async fn delete_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
    ) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{id}"),
        )
        .await
    }

    async fn create_label(
        &self,
        account: &Account,
        board_id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto> {
        self.send_json(
            Method::POST,
            account,
            &format!("boards/{board_id}/labels"),
            label,
        )
        .await
    }

    async fn update_label(
        &self,
        account: &Account,
        board_id: i64,
        id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto> {
        self.send_json(
            Method::PUT,
            account,
            &format!("boards/{board_id}/labels/{id}"),
            label,
        )
        .await
    }

    async fn delete_label(&self, account: &Account, board_id: i64, id: i64) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            account,
            &format!("boards/{board_id}/labels/{id}"),
        )
        .await
    }

    async fn assign_user(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()> {
        self.send_command(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{card_id}/assignUser"),
            &serde_json::json!({ "userId": uid }),
        )
        .await
    }

    async fn unassign_user(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()> {
        self.send_command(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{card_id}/unassignUser"),
            &serde_json::json!({ "userId": uid }),
        )
        .await
    }

    async fn assign_label(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()> {
        self.send_command(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{card_id}/assignLabel"),
            &serde_json::json!({ "labelId": label_id }),
        )
        .await
    }

    async fn unassign_label(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()> {
        self.send_command(
            Method::PUT,
            account,
            &format!("boards/{board_id}/stacks/{stack_id}/cards/{card_id}/removeLabel"),
            &serde_json::json!({ "labelId": label_id }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::NetworkStatus;

    fn account() -> Account {
        Account {
            id: 1,
            name: "work".to_string(),
            user_name: "jane".to_string(),
            url: "https://cloud.example.com/".to_string(),
            last_sync: None,
        }
    }

    #[test]
    fn test_url_joins_base_and_api_path() {
        assert_eq!(
            HttpRemote::url(&account(), "boards/4/stacks"),
            "https://cloud.example.com/index.php/apps/deck/api/v1.0/boards/4/stacks"
        );
    }

    #[test]
    fn test_format_since_is_bare_gmt() {
        assert_eq!(format_since(0), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(
            format_since(1_700_000_000_000),
            "Tue, 14 Nov 2023 22:13:20 GMT"
        );
    }

    #[test]
    fn test_trailing_offset_is_stripped() {
        assert_eq!(
            strip_utc_offset("Tue, 14 Nov 2023 22:13:20 GMT +01:00"),
            "Tue, 14 Nov 2023 22:13:20 GMT"
        );
        assert_eq!(
            strip_utc_offset("Tue, 14 Nov 2023 22:13:20 GMT"),
            "Tue, 14 Nov 2023 22:13:20 GMT"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mutation_while_offline_fails_before_any_io() {
        let remote = HttpRemote::new(Arc::new(NetworkStatus::new(false))).unwrap();
        let board = BoardWrite {
            title: "Backlog".to_string(),
            color: "0082c9".to_string(),
        };

        // the account URL is unreachable; an attempted request would surface
        // a transport error, not Offline
        let err = remote.create_board(&account(), &board).await.unwrap_err();
        assert!(matches!(err, Error::Offline));

        let err = remote
            .assign_user(&account(), 1, 2, 3, "jane")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Offline));
    }
}
