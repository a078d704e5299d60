use std::fmt;

use anyhow::Result;
use reqwest::Response;

/// リモートAPIが成功以外のステータスを返したことを表すエラー。
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFetchError {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl fmt::Display for RemoteFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request to {} failed with status {}: {}",
            self.url, self.status, self.body
        )
    }
}

impl std::error::Error for RemoteFetchError {}

/// レスポンスが成功ステータスでなければ、ステータスとボディを持つ`RemoteFetchError`を返す。
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteFetchError {
        url,
        status: status.as_u16(),
        body,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::{ensure_success, RemoteFetchError};

    #[tokio::test]
    async fn test_ensure_success_passes_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("fine")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/ok", server.url())).await.unwrap();
        let response = ensure_success(response).await.unwrap();

        assert_eq!(response.text().await.unwrap(), "fine");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_success_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/missing", server.url()))
            .await
            .unwrap();
        let err = ensure_success(response).await.unwrap_err();
        let fetch_err = err.downcast_ref::<RemoteFetchError>().unwrap();

        assert_eq!(fetch_err.status, 404);
        assert_eq!(fetch_err.body, "not found");
        assert!(fetch_err.url.ends_with("/missing"));
    }
}
