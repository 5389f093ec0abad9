// =============================================================================
// FIRESTORE MODULE
// =============================================================================
//
// Firestore identity for the service. Nothing here reads or writes documents;
// the process only needs to prove at startup that it holds a working
// identity (a service account key, or the host's attached account), and can
// mint access tokens with it on demand.

pub mod credential_loader;
pub mod metadata_server;
pub mod service_account;

pub use credential_loader::{
    CredentialLoader, CredentialSource, FirestoreIdentity, TokenSource,
    DEFAULT_LOCAL_CREDENTIALS_FILE,
};
pub use metadata_server::{MetadataServerAuth, DEFAULT_METADATA_SERVER};
pub use service_account::{CredentialError, ServiceAccountAuth};
