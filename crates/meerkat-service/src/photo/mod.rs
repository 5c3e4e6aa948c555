//! Contact photos: the on-disk store and the remote fetcher that feeds it.

pub mod fetch;
pub mod store;

use fetch::ImageFetcher;
use store::{PhotoStore, SavedPhoto};

use crate::error::ServiceResult;

/// Where a photo's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Bytes carried in the request, with the media type the client declared.
    Embedded {
        bytes: Vec<u8>,
        media_type: Option<String>,
    },
    /// A URL to fetch.
    Remote { url: String },
}

/// Store plus fetcher, shared by the `CardDAV` adapter and the importer.
#[derive(Debug, Clone)]
pub struct Photos {
    pub store: PhotoStore,
    pub fetcher: ImageFetcher,
}

impl Photos {
    #[must_use]
    pub const fn new(store: PhotoStore, fetcher: ImageFetcher) -> Self {
        Self { store, fetcher }
    }

    /// ## Summary
    /// Resolves `source` to image bytes and writes them to the store.
    ///
    /// ## Errors
    /// Returns [`crate::error::ServiceError::RemoteFetchFailed`] when a URL
    /// cannot be fetched safely, or the store's error when the bytes are not
    /// a usable image.
    #[tracing::instrument(skip_all)]
    pub async fn materialize(&self, source: PhotoSource) -> ServiceResult<SavedPhoto> {
        let (bytes, media_type) = match source {
            PhotoSource::Embedded { bytes, media_type } => (bytes, media_type),
            PhotoSource::Remote { url } => {
                let fetched = self.fetcher.fetch(&url).await?;
                (fetched.bytes, Some(fetched.content_type))
            }
        };
        self.store.save(bytes, media_type.as_deref()).await
    }
}
