use std::collections::{BTreeSet, HashMap};

use crate::model::{AccountState, AssignmentTable};

/// Ownership-tracked index over one normalization run.
///
/// Owners are numbered in first-appearance order (table first, then roster).
/// Accounts are numbered by input row. Holdings and per-account state are
/// only mutated together, so an account is held by at most one owner.
#[derive(Debug, Clone)]
pub struct OwnerBook {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
    holdings: Vec<BTreeSet<usize>>,
    states: Vec<AccountState>,
    evicted_from: Vec<Option<usize>>,
    ceiling: usize,
}

impl OwnerBook {
    pub fn from_table(table: &AssignmentTable, roster: &[String], ceiling: usize) -> Self {
        let mut book = Self {
            names: Vec::new(),
            by_name: HashMap::new(),
            holdings: Vec::new(),
            states: vec![AccountState::Unassigned; table.rows.len()],
            evicted_from: vec![None; table.rows.len()],
            ceiling,
        };

        for (account, row) in table.rows.iter().enumerate() {
            if let Some(ref name) = row.owner {
                let owner = book.intern(name);
                book.holdings[owner].insert(account);
                book.states[account] = AccountState::Assigned(owner);
            }
        }
        for name in roster {
            book.intern(name);
        }

        book
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.by_name.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), idx);
        self.holdings.push(BTreeSet::new());
        idx
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn owner_count(&self) -> usize {
        self.names.len()
    }

    pub fn account_count(&self) -> usize {
        self.states.len()
    }

    pub fn name(&self, owner: usize) -> &str {
        &self.names[owner]
    }

    pub fn state(&self, account: usize) -> AccountState {
        self.states[account]
    }

    /// Owner `account` was last evicted from during this run.
    pub fn evicted_from(&self, account: usize) -> Option<usize> {
        self.evicted_from[account]
    }

    pub fn load(&self, owner: usize) -> usize {
        self.holdings[owner].len()
    }

    pub fn has_room(&self, owner: usize) -> bool {
        self.load(owner) < self.ceiling
    }

    pub fn holds(&self, owner: usize, account: usize) -> bool {
        self.states[account] == AccountState::Assigned(owner)
    }

    /// Accounts held by `owner`, in input order.
    pub fn holdings(&self, owner: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.holdings[owner].iter().copied()
    }

    /// Current owner of every account, by input row.
    pub fn owners(&self) -> Vec<Option<usize>> {
        self.states.iter().map(|s| s.owner()).collect()
    }

    /// First owner, in owner order, below the ceiling.
    pub fn first_with_room(&self) -> Option<usize> {
        (0..self.names.len()).find(|&o| self.has_room(o))
    }

    /// Give `account` to `owner`, releasing it from its previous owner.
    pub fn assign(&mut self, account: usize, owner: usize) {
        if let Some(prev) = self.states[account].owner() {
            self.holdings[prev].remove(&account);
        }
        self.holdings[owner].insert(account);
        self.states[account] = AccountState::Assigned(owner);
    }

    /// Take `account` away from its owner and mark it pending reassignment.
    /// No-op for accounts without an owner.
    pub fn evict(&mut self, account: usize) {
        if let AccountState::Assigned(owner) = self.states[account] {
            self.holdings[owner].remove(&account);
            self.states[account] = AccountState::Pending { evicted_from: owner };
            self.evicted_from[account] = Some(owner);
        }
    }
}
