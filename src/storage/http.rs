use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, header};

use super::{BlobStore, StorageError, content_type_for, validate_key};

/// S3/R2 风格的 HTTP 桶：`GET/PUT/HEAD {base}/{key}`，404 视为不存在。
///
/// 对象键按段 URL 编码后拼接，键中的 `%` 等字符会原样落到桶内。
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, token: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    fn url_for(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        Ok(format!("{}/{}", self.base_url, encoded.join("/")))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let url = self.url_for(key)?;
        let resp = self.authorize(self.client.get(url)).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.bytes().await?)),
            s => Err(StorageError::Http {
                key: key.to_string(),
                status: s.as_u16(),
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let url = self.url_for(key)?;
        let req = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type_for(key))
            .body(bytes);
        let resp = self.authorize(req).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::Http {
                key: key.to_string(),
                status: resp.status().as_u16(),
            })
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let url = self.url_for(key)?;
        let resp = self.authorize(self.client.head(url)).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(StorageError::Http {
                key: key.to_string(),
                status: s.as_u16(),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("http:{}", self.base_url)
    }
}
