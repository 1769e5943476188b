//! Object Store Gateway (spec.md §4.6.1 / C10), grounded in dependency
//! choice on `KSD-CO-excelstream`'s `cloud-s3` feature (`aws-config` +
//! `aws-sdk-s3`), the only corpus crate touching S3 at all. Every
//! received file is uploaded keyed by its file name before parsing
//! begins, so even files that fail validation are archived.
//!
//! `ObjectStore` is pulled out as an `async_trait` seam (the style
//! `backend/src/services/integration_hub/connector.rs` uses for its
//! pluggable `IntegrationConnector`) so the email driver can be exercised
//! in tests against an in-memory stand-in instead of real S3.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::error::Error;
use tracing::info;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub struct ObjectStoreGateway {
    client: Client,
    bucket: String,
}

impl ObjectStoreGateway {
    pub async fn new(bucket: &str, region: &str, endpoint: Option<&str>) -> Self {
        let region_provider = aws_config::meta::region::RegionProviderChain::first_try(
            aws_sdk_s3::config::Region::new(region.to_string()),
        );
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region_provider);
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint.to_string());
        }
        let shared_config = loader.load().await;
        let client = Client::new(&shared_config);
        ObjectStoreGateway {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for ObjectStoreGateway {
    /// Uploads `bytes` keyed by `file_name`. Not versioned beyond
    /// whatever policy the bucket itself imposes (spec.md §6).
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(file_name)
            .body(ByteStream::from(bytes))
            .send()
            .await?;
        info!("archived '{file_name}' to bucket '{}'", self.bucket);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::ObjectStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::error::Error;
    use std::sync::Mutex;

    /// Records every upload in process memory; used by driver tests that
    /// exercise the full `process_email` flow without touching S3.
    #[derive(Default)]
    pub struct InMemoryObjectStore {
        uploads: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl InMemoryObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn uploaded_keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.uploads.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        pub fn contains(&self, file_name: &str) -> bool {
            self.uploads.lock().unwrap().contains_key(file_name)
        }
    }

    #[async_trait]
    impl ObjectStore for InMemoryObjectStore {
        async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.uploads.lock().unwrap().insert(file_name.to_string(), bytes);
            Ok(())
        }
    }
}
