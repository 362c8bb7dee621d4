// HTTP user directory client

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::{DirectoryError, StreamAuthorization, UserDirectory};

#[derive(Serialize)]
struct LookupRequest<'a> {
    stream_key: &'a str,
}

/// User directory over HTTP + JSON
///
/// Sends `{"stream_key": "..."}` to the configured endpoint and expects
/// a `{"authorized": bool, "destinations": [{name, url, key}]}` body.
pub struct HttpUserDirectory {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpUserDirectory {
    /// Creates the client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the lookup endpoint
    pub fn new(endpoint: &str) -> HttpUserDirectory {
        HttpUserDirectory {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn lookup(&self, stream_key: &str) -> Result<StreamAuthorization, DirectoryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&LookupRequest { stream_key })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(DirectoryError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json::<StreamAuthorization>().await?)
    }
}
