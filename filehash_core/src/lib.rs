//! File hash cache core library
//!
//! Remembers content hashes of files by path so unchanged files are not
//! hashed twice. Lookups never block: a miss queues a job for a single
//! background worker, and the result is delivered to the requester through
//! a [`HashClient`] callback.
//!
//! ```no_run
//! use filehash_core::{HashClient, HashStore, HashStoreConfig, Lookup, FileHash};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl HashClient for Printer {
//!     fn hash_computed(&self, _token: u64, path: &Path, hash: FileHash, size: u64) {
//!         println!("{}: {hash} ({size} bytes)", path.display());
//!     }
//! }
//!
//! # async fn example() -> filehash_core::Result<()> {
//! let store = HashStore::new(HashStoreConfig::default())?;
//! match store.request_hash(Path::new("/srv/share/movie.avi"), 1_024, 1_700_000_000, Arc::new(Printer), 7)? {
//!     Lookup::Valid(hash) => println!("cached: {hash}"),
//!     Lookup::Pending => println!("hashing in the background"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod entry;
pub mod error;
pub mod hash;
pub mod hashing;
pub mod persistence;
pub mod store;

pub use client::{HashClient, NullClient, RequestToken};
pub use entry::{CacheEntry, SECONDS_PER_DAY, to_unix_secs, unix_now};
pub use error::{Error, Result};
pub use hash::{FileHash, HASH_LEN};
pub use hashing::{FileHasher, HashedFile, Sha1Hasher};
pub use persistence::CacheFile;
pub use store::{
    HashStore, HashStoreConfig, JobOutcome, Lookup, StoreStats, Tick, WorkerMode, WorkerState,
};
