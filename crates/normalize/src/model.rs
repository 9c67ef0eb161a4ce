use serde::Serialize;

use crate::config::ColumnMapping;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One account row from the assignment table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub account_id: String,
    pub parent_account_id: Option<String>,
    pub owner: Option<String>,
    /// Every cell of the source row, in header order.
    pub fields: Vec<String>,
}

impl AccountRow {
    /// Row laid out as `account_id, parent_account_id, owner`, matching
    /// `AssignmentTable::from_accounts`.
    pub fn new(account_id: &str, parent_account_id: Option<&str>, owner: Option<&str>) -> Self {
        Self {
            account_id: account_id.to_string(),
            parent_account_id: parent_account_id.map(str::to_string),
            owner: owner.map(str::to_string),
            fields: vec![
                account_id.to_string(),
                parent_account_id.unwrap_or_default().to_string(),
                owner.unwrap_or_default().to_string(),
            ],
        }
    }
}

/// The assignment table: headers plus account rows in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentTable {
    pub headers: Vec<String>,
    /// Index of the owner column in `headers`.
    pub owner_column: usize,
    pub rows: Vec<AccountRow>,
}

impl AssignmentTable {
    /// Table with the default column names, built from `AccountRow::new` rows.
    pub fn from_accounts(rows: Vec<AccountRow>) -> Self {
        let columns = ColumnMapping::default();
        Self {
            headers: vec![columns.account_id, columns.parent_account_id, columns.owner],
            owner_column: 2,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Owner of the given account, if the account exists and is assigned.
    pub fn owner_of(&self, account_id: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.account_id == account_id)
            .and_then(|r| r.owner.as_deref())
    }

    /// Number of accounts currently assigned to `owner`.
    pub fn load_of(&self, owner: &str) -> usize {
        self.rows
            .iter()
            .filter(|r| r.owner.as_deref() == Some(owner))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Working state
// ---------------------------------------------------------------------------

/// Placement state of one account while the normalizer runs.
///
/// `Unassigned` means the account has no owner and never had one during this
/// run. `Pending` means it was evicted and waits for the cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Assigned(usize),
    Unassigned,
    Pending { evicted_from: usize },
}

impl AccountState {
    pub fn owner(&self) -> Option<usize> {
        match self {
            Self::Assigned(owner) => Some(*owner),
            Self::Unassigned | Self::Pending { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// What happened to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Outcome {
    /// Same owner as in the input.
    Unchanged,
    /// Moved directly from one owner to another during family placement.
    Moved { from: String },
    /// Had no owner in the input and received one.
    Placed,
    /// Evicted from `evicted_from`, then re-placed with a different owner
    /// than it started with.
    Reassigned { evicted_from: String },
    /// Ended with no owner: global capacity is exhausted.
    Unplaced {
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_owner: Option<String>,
    },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Moved { .. } => write!(f, "moved"),
            Self::Placed => write!(f, "placed"),
            Self::Reassigned { .. } => write!(f, "reassigned"),
            Self::Unplaced { .. } => write!(f, "unplaced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_account_id: Option<String>,
    pub owner: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerLoad {
    pub owner: String,
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub total_accounts: usize,
    pub owners: usize,
    /// Families with two or more members.
    pub families: usize,
    pub families_consolidated_before: usize,
    pub families_consolidated_after: usize,
    pub unchanged: usize,
    pub moved: usize,
    pub placed: usize,
    pub reassigned: usize,
    /// Accounts evicted that did not end with the owner they started with.
    pub evicted: usize,
    pub unassigned: usize,
    pub owner_loads: Vec<OwnerLoad>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeMeta {
    pub config_name: String,
    pub max_accounts_per_csm: usize,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeResult {
    pub meta: NormalizeMeta,
    pub summary: NormalizeSummary,
    pub rows: Vec<NormalizedRow>,
    /// The input table with the owner column rewritten.
    #[serde(skip)]
    pub table: AssignmentTable,
}

impl NormalizeResult {
    /// True when every account ended with an owner.
    pub fn is_complete(&self) -> bool {
        self.summary.unassigned == 0
    }

    pub fn unassigned_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.owner.is_none())
            .map(|r| r.account_id.as_str())
            .collect()
    }
}
