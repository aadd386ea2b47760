//! Journal entries and the draft builder
//!
//! An [`EntryDraft`] is assembled by the caller and validated by
//! [`crate::ledger::post`]; once persisted it becomes a [`JournalEntry`]
//! whose lines never change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{JournalEntryId, Money, UserId};

/// Marker appended to the description of an entry that has been reversed
pub const REVERSED_MARKER: &str = "[REVERSED]";

/// Prefix of the description of a reversing entry
pub const REVERSAL_PREFIX: &str = "[REVERSAL]";

/// One line of a journal entry
///
/// Exactly one of `debit` and `credit` is expected to be positive; the other
/// is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_code: String,
    pub debit: Money,
    pub credit: Money,
}

impl JournalLine {
    /// Creates a debit line
    pub fn debit(account_code: impl Into<String>, amount: Money) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Money::zero(),
        }
    }

    /// Creates a credit line
    pub fn credit(account_code: impl Into<String>, amount: Money) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Money::zero(),
            credit: amount,
        }
    }

    /// The same line with debit and credit swapped
    pub fn reversed(&self) -> Self {
        Self {
            account_code: self.account_code.clone(),
            debit: self.credit,
            credit: self.debit,
        }
    }

    pub fn has_account(&self) -> bool {
        !self.account_code.trim().is_empty()
    }

    /// `debit - credit`
    pub fn net(&self) -> Money {
        self.debit - self.credit
    }
}

/// A persisted journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
    /// Business document that produced the entry, e.g. `sale:12`
    pub source_ref: Option<String>,
    /// Entry this one reverses
    pub reversal_of: Option<JournalEntryId>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<UserId>,
    pub void_reason: Option<String>,
}

impl JournalEntry {
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }

    /// True once a reversing entry has been posted against this one
    pub fn is_reversed(&self) -> bool {
        self.description.contains(REVERSED_MARKER)
    }

    pub fn total_debits(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }
}

/// An entry being assembled, not yet validated or persisted
///
/// Lines keep the order in which they were added.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryDraft {
    pub description: String,
    pub lines: Vec<JournalLine>,
    pub source_ref: Option<String>,
    pub reversal_of: Option<JournalEntryId>,
    /// `None` lets the store stamp its own clock
    pub created_at: Option<DateTime<Utc>>,
}

impl EntryDraft {
    /// Starts a draft with the given description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Adds a debit line
    pub fn debit(mut self, account_code: impl Into<String>, amount: Money) -> Self {
        self.lines.push(JournalLine::debit(account_code, amount));
        self
    }

    /// Adds a credit line
    pub fn credit(mut self, account_code: impl Into<String>, amount: Money) -> Self {
        self.lines.push(JournalLine::credit(account_code, amount));
        self
    }

    /// Adds a debit line only when the amount is not zero
    pub fn debit_nonzero(self, account_code: impl Into<String>, amount: Money) -> Self {
        if amount.is_zero() {
            self
        } else {
            self.debit(account_code, amount)
        }
    }

    /// Adds a credit line only when the amount is not zero
    pub fn credit_nonzero(self, account_code: impl Into<String>, amount: Money) -> Self {
        if amount.is_zero() {
            self
        } else {
            self.credit(account_code, amount)
        }
    }

    /// Adds a prepared line
    pub fn line(mut self, line: JournalLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Records the business document behind the entry
    pub fn with_source(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// Marks the draft as the reversal of another entry
    pub fn reversing(mut self, original: JournalEntryId) -> Self {
        self.reversal_of = Some(original);
        self
    }

    /// Backdates the entry
    pub fn dated(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Returns `(total debits, total credits)`
    pub fn totals(&self) -> (Money, Money) {
        self.lines.iter().fold((Money::zero(), Money::zero()), |(d, c), line| {
            (d + line.debit, c + line.credit)
        })
    }

    /// Checks if debits equal credits
    pub fn is_balanced(&self) -> bool {
        let (debits, credits) = self.totals();
        debits == credits
    }
}
