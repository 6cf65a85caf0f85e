//! Injectable collaborators the volume manager, block cache, file-length
//! cache, and crypto service would normally provide (§1, §6 — all out of
//! scope to implement fully here). [`SortedLogReader::open`] accepts these
//! as a bundle so the core never depends on their concrete implementations;
//! [`Capabilities::default`] wires in no-op/local-disk behavior sufficient
//! to exercise the rest of the workspace end to end.

use std::path::Path;
use std::sync::Arc;

/// Decrypts (or, by default, passes through) bytes read from a sorted file.
pub trait Crypto: Send + Sync {
    fn decrypt(&self, buf: &mut [u8]);
}

/// A no-op crypto service: the default when no encryption is configured.
#[derive(Debug, Default)]
pub struct NoopCrypto;

impl Crypto for NoopCrypto {
    fn decrypt(&self, _buf: &mut [u8]) {}
}

/// Read-mostly cache of file lengths, shared and externally synchronized;
/// treated as opaque by this crate.
pub trait FileLenCache: Send + Sync {
    fn cached_len(&self, path: &Path) -> Option<u64>;
}

/// Opaque block-cache provider; this crate never inspects its contents.
pub trait CacheProvider: Send + Sync {}

/// Bundle of capabilities accepted by [`crate::reader::SortedLogReader::open`].
#[derive(Clone)]
pub struct Capabilities {
    pub crypto: Arc<dyn Crypto>,
    pub file_len_cache: Option<Arc<dyn FileLenCache>>,
    pub cache_provider: Option<Arc<dyn CacheProvider>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            crypto: Arc::new(NoopCrypto),
            file_len_cache: None,
            cache_provider: None,
        }
    }
}
