use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use common::auth::Capability;
use common::client::Remote;
use common::codec;
use common::crypto::{AgreementPublicKey, ContentHash, PublicKey, Signature};
use common::error::ProtocolError;
use common::host::headers;

use super::error::ApiError;
use crate::http_server::api::paths;

/// A [`Remote`] reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRemote {
    pub remote: Url,
    client: Client,
}

impl HttpRemote {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.remote.join(path)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    async fn bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        Ok(self.send(request).await?.bytes().await?.to_vec())
    }

    async fn text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        Ok(self.send(request).await?.text().await?)
    }

    async fn names(&self, request: RequestBuilder) -> Result<Vec<String>, ApiError> {
        Ok(self.send(request).await?.json().await?)
    }

    fn owner_request(
        &self,
        path: &str,
        owner: &PublicKey,
        token: &str,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .client
            .get(self.url(path)?)
            .header(headers::PUBKEY, owner.to_hex())
            .header(headers::TOKEN, token))
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn auth(&self, capability: &Capability) -> Result<Vec<u8>, ProtocolError> {
        let request = self.client.post(self.url(paths::AUTH)?).json(capability);
        Ok(self.bytes(request).await?)
    }

    async fn chal(&self, body: Vec<u8>) -> Result<String, ProtocolError> {
        let request = self.client.post(self.url(paths::CHAL)?).body(body);
        Ok(self.text(request).await?)
    }

    async fn put(
        &self,
        location: &str,
        payload: Vec<u8>,
        signature: &Signature,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        let request = self
            .client
            .put(self.url(paths::PUT)?)
            .header(headers::PUBKEY, pub_key.to_hex())
            .header(headers::TOKEN, token)
            .header(headers::SIGNATURE, signature.to_hex())
            .header(headers::LOCATION, location)
            .body(payload);
        self.send(request).await?;
        Ok(())
    }

    async fn get(&self, location: &str) -> Result<Vec<u8>, ProtocolError> {
        let request = self
            .client
            .get(self.url(paths::GET)?)
            .header(headers::LOCATION, location);
        Ok(self.bytes(request).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ProtocolError> {
        let request = self
            .client
            .get(self.url(paths::LIST)?)
            .header(headers::LOCATION, prefix);
        Ok(self.names(request).await?)
    }

    async fn delete(
        &self,
        location: &str,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        let request = self
            .client
            .delete(self.url(paths::DELETE)?)
            .header(headers::PUBKEY, pub_key.to_hex())
            .header(headers::TOKEN, token)
            .header(headers::LOCATION, location);
        self.send(request).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        target: &PublicKey,
        ephemeral: &AgreementPublicKey,
        body: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        let request = self
            .client
            .post(self.url(paths::SUB)?)
            .header(headers::PUBKEY, target.to_hex())
            .header(headers::SUB_KEY, ephemeral.to_hex())
            .body(body);
        self.send(request).await?;
        Ok(())
    }

    async fn requests(
        &self,
        owner: &PublicKey,
        token: &str,
    ) -> Result<Vec<String>, ProtocolError> {
        let request = self.owner_request(paths::REQS, owner, token)?;
        Ok(self.names(request).await?)
    }

    async fn send_message(
        &self,
        target: &PublicKey,
        body: Vec<u8>,
        solution: &[u8],
    ) -> Result<ContentHash, ProtocolError> {
        let request = self
            .client
            .post(self.url(paths::INBOX)?)
            .header(headers::PUBKEY, target.to_hex())
            .header(headers::POW, codec::encode(solution))
            .body(body);
        let id = self.text(request).await?;
        Ok(ContentHash::from_hex(id.trim())?)
    }

    async fn inbox(&self, owner: &PublicKey, token: &str) -> Result<Vec<String>, ProtocolError> {
        let request = self.owner_request(paths::INBOX, owner, token)?;
        Ok(self.names(request).await?)
    }
}
