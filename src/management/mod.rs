mod batch;
mod credentials;
mod ledger;
mod playlist;
mod state;

pub use batch::BatchFile;
pub use credentials::{CredentialStore, NamingTemplates, StoredCredentials};
pub use ledger::{Ledger, LedgerKind, Ledgers};
pub use playlist::{render_manifest, write_manifest};
pub use state::{CollectionSummary, DownloadTracker};
