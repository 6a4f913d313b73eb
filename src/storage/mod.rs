pub mod bootstrap;
pub mod index;
pub mod ingest;
pub mod keys;
pub mod layout;

pub use bootstrap::rebuild_index;
pub use index::{IndexError, OwnerAudioIndex};
pub use ingest::{IngestError, IngestOutcome, ingest_archive};
pub use keys::KeyStore;
pub use layout::StorageLayout;
