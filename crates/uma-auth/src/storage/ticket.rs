//! Ticket storage.
//!
//! Ticket ids are single-use: [`TicketStore::take`] retrieves and removes a
//! ticket in one step, so two concurrent requests can never both redeem the
//! same id.

use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::types::Ticket;

/// Default lifetime of an unresolved ticket.
pub const DEFAULT_TICKET_LIFETIME: Duration = Duration::minutes(30);

/// Storage trait for unresolved negotiation tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Stores `ticket` under `id`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put(&self, id: &str, ticket: Ticket) -> AuthResult<()>;

    /// Atomically retrieves and removes the ticket stored under `id`.
    ///
    /// Returns `None` if no live ticket exists for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, id: &str) -> AuthResult<Option<Ticket>>;

    /// Deletes expired tickets, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

struct StoredTicket {
    ticket: Ticket,
    expires_at: OffsetDateTime,
}

/// In-memory ticket store.
pub struct InMemoryTicketStore {
    tickets: DashMap<String, StoredTicket>,
    lifetime: Duration,
}

impl InMemoryTicketStore {
    /// Creates a store whose tickets live for [`DEFAULT_TICKET_LIFETIME`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_lifetime(DEFAULT_TICKET_LIFETIME)
    }

    /// Creates a store whose tickets live for `lifetime`.
    #[must_use]
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            tickets: DashMap::new(),
            lifetime,
        }
    }

    /// Number of stored tickets, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Returns `true` if no tickets are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn put(&self, id: &str, ticket: Ticket) -> AuthResult<()> {
        let expires_at = OffsetDateTime::now_utc() + self.lifetime;
        self.tickets
            .insert(id.to_string(), StoredTicket { ticket, expires_at });
        Ok(())
    }

    async fn take(&self, id: &str) -> AuthResult<Option<Ticket>> {
        let Some((_, stored)) = self.tickets.remove(id) else {
            return Ok(None);
        };

        if stored.expires_at <= OffsetDateTime::now_utc() {
            tracing::debug!(ticket = %id, "Ticket expired");
            return Ok(None);
        }

        Ok(Some(stored.ticket))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0u64;
        self.tickets.retain(|_, stored| {
            let live = stored.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });

        if removed > 0 {
            tracing::debug!("Cleaned up {} expired tickets", removed);
        }

        Ok(removed)
    }
}
