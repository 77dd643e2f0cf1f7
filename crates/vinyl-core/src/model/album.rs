use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ids::AlbumId;

/// Upper bound on stored cover size unless the store is configured otherwise.
pub const DEFAULT_MAX_COVER_BYTES: usize = 2 * 1024 * 1024;

const ACCEPTED_COVER_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A release that tracks belong to.
///
/// The cover image itself is not loaded with the album; `has_cover` tells
/// whether one can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub has_cover: bool,
}

/// Validated album artwork.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    mime: String,
    data: Vec<u8>,
}

impl Cover {
    /// Validate raw image bytes.
    ///
    /// The content type is sniffed from the bytes, never trusted from a file
    /// name. Empty, oversized, or non-image payloads are rejected.
    pub fn from_bytes(data: Vec<u8>, max_bytes: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::invalid("cover image is empty"));
        }
        if data.len() > max_bytes {
            return Err(Error::invalid(format!(
                "cover image is {} bytes, limit is {}",
                data.len(),
                max_bytes
            )));
        }

        let mime = infer::get(&data)
            .map(|kind| kind.mime_type())
            .filter(|mime| ACCEPTED_COVER_TYPES.contains(mime))
            .ok_or_else(|| Error::invalid("cover is not a JPEG, PNG, WebP or GIF image"))?;

        Ok(Self {
            mime: mime.to_string(),
            data,
        })
    }

    /// Rebuild a cover that was validated before it was stored.
    pub(crate) const fn from_stored(mime: String, data: Vec<u8>) -> Self {
        Self { mime, data }
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cover")
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}
