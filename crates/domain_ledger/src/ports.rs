//! Ledger Domain Ports
//!
//! This module defines the storage port of the journal.
//!
//! # Architecture
//!
//! A [`JournalStore`] is one open unit of work, exactly like the inventory
//! store; the same Postgres transaction usually implements both so a sale's
//! stock movement and its entry commit together. Adapters:
//!
//! - **Postgres Adapter**: `infra_db::PgUnitOfWork`
//! - **Mock Adapter**: [`mock::InMemoryJournal`], for tests
//!
//! # Reporting contract
//!
//! [`JournalStore::account_totals`] and [`JournalStore::account_activity`]
//! only see *reportable* entries: not voided, and not the reversal of a
//! voided entry. A voided document therefore drops out of reports entirely,
//! while a reversal without a void keeps both entries visible.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{JournalEntryId, Money, PortError, UserId};

use crate::journal::{EntryDraft, JournalEntry};

/// Half-open time range `[start, end)`; `None` leaves a side unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AggregateWindow {
    /// The unbounded window
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Builds a window from calendar dates, both inclusive
    ///
    /// The end date is widened to the following midnight so every entry of
    /// that day is included.
    pub fn from_dates(start: Option<NaiveDate>, end_inclusive: Option<NaiveDate>) -> Self {
        Self {
            start: start.and_then(midnight),
            end: end_inclusive.and_then(|d| d.succ_opt()).and_then(midnight),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }

    /// True when no instant can fall inside the window
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s >= e)
    }

    /// Everything strictly before this window, `None` if it starts unbounded
    pub fn before_start(&self) -> Option<Self> {
        self.start.map(|start| Self {
            start: None,
            end: Some(start),
        })
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

/// Which accounts a balance query covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccountFilter {
    #[default]
    All,
    Code(String),
}

impl AccountFilter {
    pub fn code(code: impl Into<String>) -> Self {
        AccountFilter::Code(code.into())
    }

    pub fn matches(&self, account_code: &str) -> bool {
        match self {
            AccountFilter::All => true,
            AccountFilter::Code(code) => code == account_code,
        }
    }
}

/// Raw debit and credit sums of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    pub account_code: String,
    pub debit: Money,
    pub credit: Money,
}

/// One line of an account's activity with its entry header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedLine {
    pub entry_id: JournalEntryId,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
}

/// Storage port for journal entries
#[async_trait]
pub trait JournalStore: Send {
    /// Persists a validated draft with its lines in order
    async fn insert_entry(&mut self, draft: EntryDraft) -> Result<JournalEntry, PortError>;

    /// Retrieves and locks one entry
    async fn lock_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError>;

    /// Overwrites the mutable annotations of an entry
    async fn set_annotations(
        &mut self,
        id: JournalEntryId,
        description: &str,
        void_reason: Option<&str>,
    ) -> Result<(), PortError>;

    /// Stamps the void metadata of an entry
    async fn mark_voided(
        &mut self,
        id: JournalEntryId,
        voided_at: DateTime<Utc>,
        voided_by: Option<UserId>,
        reason: &str,
    ) -> Result<(), PortError>;

    /// Latest non-voided entry recorded for a business document
    async fn find_by_source(&mut self, source_ref: &str) -> Result<Option<JournalEntry>, PortError>;

    /// Debit and credit sums per account over reportable entries in the window
    async fn account_totals(
        &mut self,
        filter: &AccountFilter,
        window: &AggregateWindow,
    ) -> Result<Vec<AccountTotals>, PortError>;

    /// Lines posted to one account over reportable entries, oldest first
    async fn account_activity(
        &mut self,
        account_code: &str,
        window: &AggregateWindow,
    ) -> Result<Vec<PostedLine>, PortError>;
}

/// In-memory implementation of JournalStore for testing
///
/// Same scheme as the inventory mock: one async mutex, a private working
/// copy per unit of work, written back on commit.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::{DomainPort, TransactionScope, UnitOfWorkFactory};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    /// Default bound on waiting for the store
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Everything the in-memory journal holds
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct JournalState {
        pub entries: BTreeMap<JournalEntryId, JournalEntry>,
        next_entry_id: i64,
    }

    impl JournalState {
        fn is_reportable(&self, entry: &JournalEntry) -> bool {
            if entry.is_voided() {
                return false;
            }
            match entry.reversal_of.and_then(|id| self.entries.get(&id)) {
                Some(original) => !original.is_voided(),
                None => true,
            }
        }

        fn reportable<'a>(
            &'a self,
            window: &'a AggregateWindow,
        ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
            self.entries
                .values()
                .filter(move |e| self.is_reportable(e) && window.contains(e.created_at))
        }

        fn entry_mut(&mut self, id: JournalEntryId) -> Result<&mut JournalEntry, PortError> {
            self.entries
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("journal entry", id))
        }
    }

    /// Shared in-memory journal
    #[derive(Debug, Clone)]
    pub struct InMemoryJournal {
        state: Arc<Mutex<JournalState>>,
        lock_timeout: Duration,
    }

    impl Default for InMemoryJournal {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryJournal {
        /// Creates an empty journal
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(JournalState::default())),
                lock_timeout: DEFAULT_LOCK_TIMEOUT,
            }
        }

        /// Bounds how long `begin` waits for a concurrent unit of work
        pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
            self.lock_timeout = timeout;
            self
        }

        /// Copies the committed state
        pub async fn snapshot(&self) -> JournalState {
            self.state.lock().await.clone()
        }

        /// Opens a unit of work, waiting at most the configured timeout
        pub async fn begin_work(&self) -> Result<InMemoryJournalWork, PortError> {
            let guard = tokio::time::timeout(self.lock_timeout, Arc::clone(&self.state).lock_owned())
                .await
                .map_err(|_| {
                    PortError::timeout("lock in-memory journal", self.lock_timeout.as_millis() as u64)
                })?;
            let work = (*guard).clone();
            Ok(InMemoryJournalWork { guard, work })
        }
    }

    impl DomainPort for InMemoryJournal {}

    #[async_trait]
    impl UnitOfWorkFactory for InMemoryJournal {
        type Work = InMemoryJournalWork;

        async fn begin(&self) -> Result<Self::Work, PortError> {
            self.begin_work().await
        }
    }

    /// An open in-memory unit of work
    #[derive(Debug)]
    pub struct InMemoryJournalWork {
        guard: OwnedMutexGuard<JournalState>,
        work: JournalState,
    }

    impl InMemoryJournalWork {
        /// The uncommitted state as seen inside this unit
        pub fn state(&self) -> &JournalState {
            &self.work
        }
    }

    #[async_trait]
    impl TransactionScope for InMemoryJournalWork {
        async fn commit(self) -> Result<(), PortError> {
            let InMemoryJournalWork { mut guard, work } = self;
            *guard = work;
            Ok(())
        }
    }

    #[async_trait]
    impl JournalStore for InMemoryJournalWork {
        async fn insert_entry(&mut self, draft: EntryDraft) -> Result<JournalEntry, PortError> {
            if let Some(original) = draft.reversal_of {
                if !self.work.entries.contains_key(&original) {
                    return Err(PortError::Conflict {
                        message: format!("reversal references unknown entry {original}"),
                    });
                }
            }
            self.work.next_entry_id += 1;
            let entry = JournalEntry {
                id: JournalEntryId::new(self.work.next_entry_id),
                description: draft.description,
                created_at: draft.created_at.unwrap_or_else(Utc::now),
                lines: draft.lines,
                source_ref: draft.source_ref,
                reversal_of: draft.reversal_of,
                voided_at: None,
                voided_by: None,
                void_reason: None,
            };
            self.work.entries.insert(entry.id, entry.clone());
            Ok(entry)
        }

        async fn lock_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
            Ok(self.work.entries.get(&id).cloned())
        }

        async fn set_annotations(
            &mut self,
            id: JournalEntryId,
            description: &str,
            void_reason: Option<&str>,
        ) -> Result<(), PortError> {
            let entry = self.work.entry_mut(id)?;
            entry.description = description.to_string();
            entry.void_reason = void_reason.map(str::to_string);
            Ok(())
        }

        async fn mark_voided(
            &mut self,
            id: JournalEntryId,
            voided_at: DateTime<Utc>,
            voided_by: Option<UserId>,
            reason: &str,
        ) -> Result<(), PortError> {
            let entry = self.work.entry_mut(id)?;
            entry.voided_at = Some(voided_at);
            entry.voided_by = voided_by;
            entry.void_reason = Some(reason.to_string());
            Ok(())
        }

        async fn find_by_source(&mut self, source_ref: &str) -> Result<Option<JournalEntry>, PortError> {
            Ok(self
                .work
                .entries
                .values()
                .rev()
                .find(|e| !e.is_voided() && e.source_ref.as_deref() == Some(source_ref))
                .cloned())
        }

        async fn account_totals(
            &mut self,
            filter: &AccountFilter,
            window: &AggregateWindow,
        ) -> Result<Vec<AccountTotals>, PortError> {
            let mut totals: BTreeMap<String, (Money, Money)> = BTreeMap::new();
            for entry in self.work.reportable(window) {
                for line in entry.lines.iter().filter(|l| filter.matches(&l.account_code)) {
                    let sums = totals
                        .entry(line.account_code.clone())
                        .or_insert((Money::zero(), Money::zero()));
                    sums.0 += line.debit;
                    sums.1 += line.credit;
                }
            }
            Ok(totals
                .into_iter()
                .map(|(account_code, (debit, credit))| AccountTotals {
                    account_code,
                    debit,
                    credit,
                })
                .collect())
        }

        async fn account_activity(
            &mut self,
            account_code: &str,
            window: &AggregateWindow,
        ) -> Result<Vec<PostedLine>, PortError> {
            let mut entries: Vec<&JournalEntry> = self.work.reportable(window).collect();
            entries.sort_by_key(|e| (e.created_at, e.id));

            Ok(entries
                .into_iter()
                .flat_map(|entry| {
                    entry
                        .lines
                        .iter()
                        .filter(move |l| l.account_code == account_code)
                        .map(move |line| PostedLine {
                            entry_id: entry.id,
                            created_at: entry.created_at,
                            description: entry.description.clone(),
                            debit: line.debit,
                            credit: line.credit,
                        })
                })
                .collect())
        }
    }
}
