//! Double-entry journal operations
//!
//! This module provides the core ledger functionality, ensuring that
//! all entries are balanced and that history is only ever corrected by
//! reversing entries.
//!
//! # Invariants
//!
//! - Every persisted entry balances to the cent
//! - Lines are never edited; reversal posts the mirror image
//! - An entry is reversed at most once by `void_entry`

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use core_kernel::{JournalEntryId, Money, UserId};

use crate::error::LedgerError;
use crate::journal::{EntryDraft, JournalEntry, REVERSAL_PREFIX, REVERSED_MARKER};
use crate::ports::{AccountFilter, AggregateWindow, JournalStore};

/// Debit and credit sums of one account with `net = debit - credit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub debit: Money,
    pub credit: Money,
    pub net: Money,
}

/// One row of an account ledger with the balance after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub entry_id: JournalEntryId,
    pub created_at: chrono::DateTime<Utc>,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
    pub running_balance: Money,
}

/// Chronological activity of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountLedger {
    pub account_code: String,
    pub opening_balance: Money,
    pub rows: Vec<LedgerRow>,
    pub closing_balance: Money,
}

/// Validates that a draft can be posted
///
/// Checks, in order: at least one line, every line has an account code,
/// no negative amount, no line on both sides, debits equal credits.
pub fn validate(draft: &EntryDraft) -> Result<(), LedgerError> {
    if draft.lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }

    for (index, line) in draft.lines.iter().enumerate() {
        let line_no = index + 1;
        if !line.has_account() {
            return Err(LedgerError::InvalidLine {
                line: line_no,
                reason: "missing account code".to_string(),
            });
        }
        if line.debit.is_negative() || line.credit.is_negative() {
            return Err(LedgerError::InvalidLine {
                line: line_no,
                reason: format!("negative amount on {}", line.account_code),
            });
        }
        if line.debit.is_positive() && line.credit.is_positive() {
            return Err(LedgerError::InvalidLine {
                line: line_no,
                reason: format!("both debit and credit set on {}", line.account_code),
            });
        }
    }

    let (debits, credits) = draft.totals();
    if debits != credits {
        return Err(LedgerError::UnbalancedEntry { debits, credits });
    }

    Ok(())
}

/// Posts a balanced entry
///
/// Nothing is written when validation fails.
///
/// # Example
///
/// ```rust,ignore
/// let entry = ledger::post(&mut work, EntryDraft::new("Cash sale")
///     .debit("101", gross)
///     .credit("401", gross)).await?;
/// ```
#[instrument(skip(store, draft), fields(description = %draft.description, lines = draft.lines.len()))]
pub async fn post<S>(store: &mut S, draft: EntryDraft) -> Result<JournalEntry, LedgerError>
where
    S: JournalStore + ?Sized,
{
    if let Err(err) = validate(&draft) {
        warn!(error = %err, "Rejected journal entry");
        return Err(err);
    }

    let entry = store.insert_entry(draft).await?;
    info!(entry_id = %entry.id, total = %entry.total_debits(), "Journal entry posted");
    Ok(entry)
}

/// Posts the mirror image of an entry
///
/// Lines without an account code cannot be mirrored and are skipped. When
/// nothing is left the call is a no-op and returns `None`. Otherwise the
/// original is annotated with the reversed marker (once) and the reversal
/// id is appended to its reason trail.
#[instrument(skip(store))]
pub async fn reverse_entry<S>(
    store: &mut S,
    entry_id: JournalEntryId,
    reason: &str,
) -> Result<Option<JournalEntry>, LedgerError>
where
    S: JournalStore + ?Sized,
{
    let original = store
        .lock_entry(entry_id)
        .await?
        .ok_or(LedgerError::EntryNotFound(entry_id))?;

    let mut draft = EntryDraft::new(format!(
        "{REVERSAL_PREFIX} {} - {reason}",
        original.description
    ))
    .reversing(original.id);

    for line in &original.lines {
        if line.has_account() {
            draft = draft.line(line.reversed());
        } else {
            warn!(debit = %line.debit, credit = %line.credit, "Skipping line without account code");
        }
    }

    if draft.lines.is_empty() {
        warn!("Nothing reversible in entry");
        return Ok(None);
    }

    let reversal = post(&mut *store, draft).await?;

    let description = if original.is_reversed() {
        original.description.clone()
    } else {
        format!("{} {REVERSED_MARKER}", original.description)
    };
    let note = format!("Reversal JE #{}: {reason}", reversal.id.value());
    let trail = match original.void_reason.as_deref() {
        Some(previous) if !previous.is_empty() => format!("{previous} {note}"),
        _ => note,
    };
    store
        .set_annotations(original.id, &description, Some(&trail))
        .await?;

    info!(reversal_id = %reversal.id, "Journal entry reversed");
    Ok(Some(reversal))
}

/// Voids an entry: posts its reversal and stamps the void metadata
///
/// Returns the reversing entry, if one was posted.
#[instrument(skip(store))]
pub async fn void_entry<S>(
    store: &mut S,
    entry_id: JournalEntryId,
    reason: &str,
    voided_by: Option<UserId>,
) -> Result<Option<JournalEntry>, LedgerError>
where
    S: JournalStore + ?Sized,
{
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::MissingReason);
    }

    let original = store
        .lock_entry(entry_id)
        .await?
        .ok_or(LedgerError::EntryNotFound(entry_id))?;
    if original.is_voided() {
        return Err(LedgerError::AlreadyVoided(entry_id));
    }

    let reversal = reverse_entry(&mut *store, entry_id, reason).await?;

    // Keep the trail written by the reversal
    let trail = store
        .lock_entry(entry_id)
        .await?
        .and_then(|e| e.void_reason)
        .unwrap_or_else(|| reason.to_string());
    store.mark_voided(entry_id, Utc::now(), voided_by, &trail).await?;

    info!("Journal entry voided");
    Ok(reversal)
}

/// Sums debits and credits per account over reportable entries
///
/// Entries count when `created_at` falls in `[start, end)`. Voided entries
/// and reversals of voided entries are left out.
pub async fn aggregate<S>(
    store: &mut S,
    filter: &AccountFilter,
    window: &AggregateWindow,
) -> Result<BTreeMap<String, AccountBalance>, LedgerError>
where
    S: JournalStore + ?Sized,
{
    if window.is_empty() {
        return Ok(BTreeMap::new());
    }

    let totals = store.account_totals(filter, window).await?;
    Ok(totals
        .into_iter()
        .map(|t| {
            let balance = AccountBalance {
                debit: t.debit,
                credit: t.credit,
                net: t.debit - t.credit,
            };
            (t.account_code, balance)
        })
        .collect())
}

/// Chronological ledger of one account with running balance
///
/// The opening balance is the net of everything before the window start.
pub async fn account_ledger<S>(
    store: &mut S,
    account_code: &str,
    window: &AggregateWindow,
) -> Result<AccountLedger, LedgerError>
where
    S: JournalStore + ?Sized,
{
    let filter = AccountFilter::code(account_code);
    let opening_balance = match window.before_start() {
        Some(before) => aggregate(&mut *store, &filter, &before)
            .await?
            .get(account_code)
            .map(|b| b.net)
            .unwrap_or_default(),
        None => Money::zero(),
    };

    let mut running_balance = opening_balance;
    let rows: Vec<LedgerRow> = store
        .account_activity(account_code, window)
        .await?
        .into_iter()
        .map(|line| {
            running_balance += line.debit - line.credit;
            LedgerRow {
                entry_id: line.entry_id,
                created_at: line.created_at,
                description: line.description,
                debit: line.debit,
                credit: line.credit,
                running_balance,
            }
        })
        .collect();

    Ok(AccountLedger {
        account_code: account_code.to_string(),
        opening_balance,
        rows,
        closing_balance: running_balance,
    })
}

/// Latest non-voided entry recorded for a business document
pub async fn find_by_source<S>(store: &mut S, source_ref: &str) -> Result<Option<JournalEntry>, LedgerError>
where
    S: JournalStore + ?Sized,
{
    Ok(store.find_by_source(source_ref).await?)
}
