use super::digest_hex;

/// Container layout version written by this crate.
pub const CACHE_VERSION: u32 = 3;

/// On-disk cache container (before compression).
#[derive(Clone, PartialEq, prost::Message)]
pub struct CacheRecord {
    #[prost(string, tag = "1")]
    pub etag: String,
    #[prost(uint32, tag = "2")]
    pub version: u32,
    #[prost(string, tag = "3")]
    pub checksum: String,
    #[prost(bytes = "vec", tag = "4")]
    pub content: Vec<u8>,
}

impl CacheRecord {
    pub fn new(content: Vec<u8>, etag: &str) -> Self {
        Self {
            etag: etag.to_string(),
            version: CACHE_VERSION,
            checksum: digest_hex(&content),
            content,
        }
    }

    /// Checksum matches the content.
    pub fn is_intact(&self) -> bool {
        self.checksum == digest_hex(&self.content)
    }
}
