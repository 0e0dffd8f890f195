//! Post-sync HTTP notification.

use reqwest::Client;

use crate::error::SyncError;

/// Issues a GET to a fixed URL after every successful content update.
pub struct CallbackNotifier {
    client: Client,
    url: String,
}

impl CallbackNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Any status outside 2xx is an error, as is a transport failure.
    pub async fn notify(&self) -> Result<(), SyncError> {
        tracing::trace!("get url {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| SyncError::CallbackRequest {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::CallbackStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        tracing::debug!("url {} called successful", self.url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve every connection with a fixed status line and count the hits.
    async fn serve(status: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response =
                    format!("HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/"), hits)
    }

    #[tokio::test]
    async fn test_notify_success() {
        let (url, hits) = serve("200 OK").await;
        let notifier = CallbackNotifier::new(url);

        notifier.notify().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notify_server_error_fails() {
        let (url, hits) = serve("500 Internal Server Error").await;
        let notifier = CallbackNotifier::new(url.clone());

        let err = notifier.notify().await.unwrap_err();

        assert!(matches!(err, SyncError::CallbackStatus { status: 500, .. }));
        assert!(err.to_string().contains(&url));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notify_client_error_fails() {
        let (url, _) = serve("404 Not Found").await;
        let notifier = CallbackNotifier::new(url);

        let err = notifier.notify().await.unwrap_err();

        assert!(matches!(err, SyncError::CallbackStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_notify_unreachable_fails() {
        // bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = CallbackNotifier::new(format!("http://{addr}/"));
        let err = notifier.notify().await.unwrap_err();

        assert!(matches!(err, SyncError::CallbackRequest { .. }));
    }
}
