//! Journal repository implementation
//!
//! Implements [`JournalStore`] on [`PgUnitOfWork`]. Entry headers live in
//! `journal_entries`, their lines in `journal_lines` ordered by `line_no`.
//!
//! Balance queries only see reportable entries: not voided, and not the
//! reversal of a voided entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::instrument;

use core_kernel::{JournalEntryId, Money, PortError, UserId};
use domain_ledger::{
    AccountFilter, AccountTotals, AggregateWindow, EntryDraft, JournalEntry, JournalLine, JournalStore,
    PostedLine,
};

use crate::unit_of_work::PgUnitOfWork;

const ENTRY_COLUMNS: &str = "id, description, created_at, source_ref, reversal_of, voided_at, voided_by, void_reason";

/// Joins and filters that restrict lines to reportable entries in a window
///
/// `$1` and `$2` bound the window, either may be NULL.
const REPORTABLE_LINES: &str = "FROM journal_lines l \
     JOIN journal_entries e ON e.id = l.entry_id \
     LEFT JOIN journal_entries o ON o.id = e.reversal_of \
     WHERE e.voided_at IS NULL \
       AND (o.id IS NULL OR o.voided_at IS NULL) \
       AND ($1::timestamptz IS NULL OR e.created_at >= $1) \
       AND ($2::timestamptz IS NULL OR e.created_at < $2)";

/// Database row for the journal_entries table
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub source_ref: Option<String>,
    pub reversal_of: Option<i64>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<i64>,
    pub void_reason: Option<String>,
}

impl EntryRow {
    fn into_entry(self, lines: Vec<JournalLine>) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(self.id),
            description: self.description,
            created_at: self.created_at,
            lines,
            source_ref: self.source_ref,
            reversal_of: self.reversal_of.map(JournalEntryId::new),
            voided_at: self.voided_at,
            voided_by: self.voided_by.map(UserId::new),
            void_reason: self.void_reason,
        }
    }
}

/// Database row for the journal_lines table
#[derive(Debug, Clone, FromRow)]
pub struct LineRow {
    pub account_code: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl From<LineRow> for JournalLine {
    fn from(row: LineRow) -> Self {
        JournalLine {
            account_code: row.account_code,
            debit: Money::new(row.debit),
            credit: Money::new(row.credit),
        }
    }
}

/// Aggregated debit and credit sums of one account
#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub account_code: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// One line of account activity with its entry header
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub entry_id: i64,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl PgUnitOfWork {
    async fn entry_lines(&mut self, entry_id: i64) -> Result<Vec<JournalLine>, PortError> {
        let fail = self.fail("load journal lines");
        let rows = sqlx::query_as::<_, LineRow>(
            "SELECT account_code, debit, credit FROM journal_lines \
             WHERE entry_id = $1 ORDER BY line_no ASC",
        )
        .bind(entry_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(fail)?;
        Ok(rows.into_iter().map(JournalLine::from).collect())
    }

    async fn with_lines(&mut self, row: Option<EntryRow>) -> Result<Option<JournalEntry>, PortError> {
        match row {
            Some(row) => {
                let lines = self.entry_lines(row.id).await?;
                Ok(Some(row.into_entry(lines)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JournalStore for PgUnitOfWork {
    #[instrument(skip(self, draft), fields(lines = draft.lines.len()))]
    async fn insert_entry(&mut self, draft: EntryDraft) -> Result<JournalEntry, PortError> {
        let fail = self.fail("insert journal entry");
        let sql = format!(
            "INSERT INTO journal_entries (description, created_at, source_ref, reversal_of) \
             VALUES ($1, COALESCE($2, now()), $3, $4) \
             RETURNING {ENTRY_COLUMNS}"
        );
        let header = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&draft.description)
            .bind(draft.created_at)
            .bind(&draft.source_ref)
            .bind(draft.reversal_of.map(|id| id.value()))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(fail)?;

        for (index, line) in draft.lines.iter().enumerate() {
            let fail = self.fail("insert journal line");
            let line_no = i32::try_from(index + 1)
                .map_err(|_| PortError::validation_field("too many lines in one entry", "lines"))?;
            sqlx::query(
                "INSERT INTO journal_lines (entry_id, line_no, account_code, debit, credit) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(header.id)
            .bind(line_no)
            .bind(&line.account_code)
            .bind(line.debit.amount())
            .bind(line.credit.amount())
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        }

        Ok(header.into_entry(draft.lines))
    }

    async fn lock_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
        let fail = self.fail("lock journal entry");
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = $1{}",
            self.lock.targeted_clause()
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(fail)?;
        self.with_lines(row).await
    }

    async fn set_annotations(
        &mut self,
        id: JournalEntryId,
        description: &str,
        void_reason: Option<&str>,
    ) -> Result<(), PortError> {
        let fail = self.fail("annotate journal entry");
        let result = sqlx::query("UPDATE journal_entries SET description = $2, void_reason = $3 WHERE id = $1")
            .bind(id.value())
            .bind(description)
            .bind(void_reason)
            .execute(&mut *self.tx)
            .await
            .map_err(fail)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("journal entry", id));
        }
        Ok(())
    }

    async fn mark_voided(
        &mut self,
        id: JournalEntryId,
        voided_at: DateTime<Utc>,
        voided_by: Option<UserId>,
        reason: &str,
    ) -> Result<(), PortError> {
        let fail = self.fail("void journal entry");
        let result = sqlx::query(
            "UPDATE journal_entries SET voided_at = $2, voided_by = $3, void_reason = $4 WHERE id = $1",
        )
        .bind(id.value())
        .bind(voided_at)
        .bind(voided_by.map(|user| user.value()))
        .bind(reason)
        .execute(&mut *self.tx)
        .await
        .map_err(fail)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("journal entry", id));
        }
        Ok(())
    }

    async fn find_by_source(&mut self, source_ref: &str) -> Result<Option<JournalEntry>, PortError> {
        let fail = self.fail("find journal entry by source");
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries \
             WHERE source_ref = $1 AND voided_at IS NULL \
             ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(source_ref)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(fail)?;
        self.with_lines(row).await
    }

    async fn account_totals(
        &mut self,
        filter: &AccountFilter,
        window: &AggregateWindow,
    ) -> Result<Vec<AccountTotals>, PortError> {
        let fail = self.fail("aggregate account balances");
        let code = match filter {
            AccountFilter::All => None,
            AccountFilter::Code(code) => Some(code.as_str()),
        };
        let sql = format!(
            "SELECT l.account_code, \
                    COALESCE(SUM(l.debit), 0) AS debit, \
                    COALESCE(SUM(l.credit), 0) AS credit \
             {REPORTABLE_LINES} \
               AND ($3::text IS NULL OR l.account_code = $3) \
             GROUP BY l.account_code \
             ORDER BY l.account_code"
        );
        let rows = sqlx::query_as::<_, TotalsRow>(&sql)
            .bind(window.start)
            .bind(window.end)
            .bind(code)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(fail)?;

        Ok(rows
            .into_iter()
            .map(|row| AccountTotals {
                account_code: row.account_code,
                debit: Money::new(row.debit),
                credit: Money::new(row.credit),
            })
            .collect())
    }

    async fn account_activity(
        &mut self,
        account_code: &str,
        window: &AggregateWindow,
    ) -> Result<Vec<PostedLine>, PortError> {
        let fail = self.fail("load account activity");
        let sql = format!(
            "SELECT e.id AS entry_id, e.created_at, e.description, l.debit, l.credit \
             {REPORTABLE_LINES} \
               AND l.account_code = $3 \
             ORDER BY e.created_at ASC, e.id ASC, l.line_no ASC"
        );
        let rows = sqlx::query_as::<_, ActivityRow>(&sql)
            .bind(window.start)
            .bind(window.end)
            .bind(account_code)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(fail)?;

        Ok(rows
            .into_iter()
            .map(|row| PostedLine {
                entry_id: JournalEntryId::new(row.entry_id),
                created_at: row.created_at,
                description: row.description,
                debit: Money::new(row.debit),
                credit: Money::new(row.credit),
            })
            .collect())
    }
}
