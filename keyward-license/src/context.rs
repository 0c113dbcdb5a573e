//! Collaborators shared by every component.

use keyward_crypto::CryptoProvider;
use keyward_storage::LicenseDb;
use keyward_types::{ActorId, Clock, SystemClock};
use std::sync::Arc;

/// Database, crypto capability, clock and acting user.
///
/// Cheap to clone; every component holds its own copy.
#[derive(Clone)]
pub struct LicenseContext {
    pub(crate) db: LicenseDb,
    pub(crate) crypto: Arc<dyn CryptoProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) actor: Option<ActorId>,
}

impl LicenseContext {
    /// Creates a context using the system clock and no acting user.
    pub fn new(db: LicenseDb, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            db,
            crypto,
            clock: Arc::new(SystemClock::new()),
            actor: None,
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Records `actor` in the audit columns of every mutation.
    #[must_use]
    pub fn acting_as(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Returns the database handle.
    pub fn db(&self) -> &LicenseDb {
        &self.db
    }

    /// Returns the crypto capability.
    pub fn crypto(&self) -> &Arc<dyn CryptoProvider> {
        &self.crypto
    }
}

impl std::fmt::Debug for LicenseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseContext")
            .field("db", &self.db)
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}
