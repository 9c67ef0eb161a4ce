use std::collections::HashMap;

use crate::book::OwnerBook;
use crate::config::NormalizeConfig;
use crate::error::NormalizeError;
use crate::family::{
    candidate_owners, group_families, is_consolidated, members_on, membership, Family,
};
use crate::model::{
    AssignmentTable, NormalizeMeta, NormalizeResult, NormalizedRow, Outcome, OwnerLoad,
};
use crate::summary::{compute_summary, FamilyStats};

/// Normalize an assignment table: consolidate families under one owner
/// where capacity allows, then give every unowned account to the first
/// owner with room.
///
/// Validation happens before any placement. Accounts that cannot be placed
/// because every owner is full come back with no owner; that is reported in
/// the summary, not as an error.
pub fn normalize(
    table: &AssignmentTable,
    config: &NormalizeConfig,
) -> Result<NormalizeResult, NormalizeError> {
    config.validate()?;
    validate_table(table)?;

    let ceiling = config.ceiling();
    let families = group_families(table);
    let member_of = membership(&families, table.len());
    let mut book = OwnerBook::from_table(table, &config.roster, ceiling);

    let loads_before: Vec<usize> = (0..book.owner_count()).map(|o| book.load(o)).collect();
    let consolidated_before = families.iter().filter(|f| is_consolidated(&book, f)).count();

    log::debug!(
        "normalizing {} accounts across {} owners, {} families, ceiling {}",
        table.len(),
        book.owner_count(),
        families.len(),
        ceiling
    );

    let passes = run_to_fixed_point(&mut book, &families, &member_of);
    log::debug!("placement settled after {passes} pass(es)");

    let consolidated_after = families.iter().filter(|f| is_consolidated(&book, f)).count();

    let (rows, out_table) = build_rows(table, &book);
    let owner_loads = (0..book.owner_count())
        .map(|o| OwnerLoad {
            owner: book.name(o).to_string(),
            before: loads_before[o],
            after: book.load(o),
        })
        .collect();
    // Evicted at some point and not back with the owner it started with.
    let evicted = (0..book.account_count())
        .filter(|&a| book.evicted_from(a).is_some() && rows[a].owner != table.rows[a].owner)
        .count();

    let summary = compute_summary(
        &rows,
        owner_loads,
        FamilyStats {
            families: families.len(),
            consolidated_before,
            consolidated_after,
        },
        evicted,
    );

    log::info!(
        "normalized {} accounts: {} moved, {} reassigned, {} placed, {} unassigned; families consolidated {} -> {} of {}",
        summary.total_accounts,
        summary.moved,
        summary.reassigned,
        summary.placed,
        summary.unassigned,
        summary.families_consolidated_before,
        summary.families_consolidated_after,
        summary.families
    );
    if summary.unassigned > 0 {
        log::warn!(
            "{} account(s) left without an owner: capacity {} x {} exhausted",
            summary.unassigned,
            summary.owners,
            ceiling
        );
    }

    Ok(NormalizeResult {
        meta: NormalizeMeta {
            config_name: config.name.clone(),
            max_accounts_per_csm: ceiling,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        rows,
        table: out_table,
    })
}

/// `normalize` with default columns and the given ceiling.
pub fn normalize_assignments(
    table: &AssignmentTable,
    max_accounts_per_csm: i64,
) -> Result<NormalizeResult, NormalizeError> {
    normalize(table, &NormalizeConfig::with_ceiling(max_accounts_per_csm))
}

/// Reject tables the normalizer cannot process. Row numbers are 1-based.
pub fn validate_table(table: &AssignmentTable) -> Result<(), NormalizeError> {
    if table.owner_column >= table.headers.len() {
        return Err(NormalizeError::ConfigValidation(format!(
            "owner column index {} out of range for {} headers",
            table.owner_column,
            table.headers.len()
        )));
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        if row.account_id.trim().is_empty() {
            return Err(NormalizeError::EmptyAccountId { row: row_no });
        }
        if row.fields.len() <= table.owner_column {
            return Err(NormalizeError::RowWidth {
                row: row_no,
                expected: table.owner_column + 1,
                found: row.fields.len(),
            });
        }
        if let Some(&first_row) = seen.get(row.account_id.as_str()) {
            return Err(NormalizeError::DuplicateAccount {
                account_id: row.account_id.clone(),
                first_row,
                row: row_no,
            });
        }
        seen.insert(row.account_id.as_str(), row_no);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Repeat family placement, capacity enforcement and cleanup until a pass
/// changes no owner. Returns the number of passes run.
///
/// After the first pass no owner is above the ceiling, so family members
/// only move through their own family's placement or through cleanup, and
/// each such move raises that family's cohesion (members placed, plus the
/// sum of squared per-owner counts). A pass that changes nothing is final,
/// which makes the result a fixed point: normalizing it again moves nothing.
fn run_to_fixed_point(
    book: &mut OwnerBook,
    families: &[Family],
    member_of: &[Option<usize>],
) -> usize {
    let max_passes = families
        .iter()
        .map(|f| f.members.len() * (f.members.len() + 1))
        .sum::<usize>()
        + 2;

    let mut passes = 0;
    loop {
        passes += 1;
        let before = book.owners();

        for family in families {
            place_family(book, family, member_of);
        }
        enforce_capacity(book, member_of);
        cleanup(book);

        if book.owners() == before {
            return passes;
        }
        if passes >= max_passes {
            log::warn!("placement still changing after {passes} passes, stopping");
            return passes;
        }
    }
}

/// Accounts outside every multi-member family. Only these are evicted to
/// make room for a family.
fn is_loose(member_of: &[Option<usize>], account: usize) -> bool {
    member_of[account].is_none()
}

fn place_family(book: &mut OwnerBook, family: &Family, member_of: &[Option<usize>]) {
    if is_consolidated(book, family) {
        return;
    }
    let candidates = candidate_owners(book, family);

    if family.members.len() <= book.ceiling() {
        let host = candidates
            .iter()
            .copied()
            .find(|&owner| can_host(book, family, owner, member_of));
        if let Some(owner) = host {
            host_family(book, family, owner, member_of);
            log::debug!(
                "family '{}': all {} members with '{}'",
                family.parent_account_id,
                family.members.len(),
                book.name(owner)
            );
            return;
        }
    }

    for &account in &family.members {
        place_member(book, family, account, &candidates, member_of);
    }

    log::debug!(
        "family '{}': {} members, no single owner can take them all",
        family.parent_account_id,
        family.members.len()
    );
}

/// Whether `owner` can hold the whole family once its loose accounts are
/// evicted.
fn can_host(book: &OwnerBook, family: &Family, owner: usize, member_of: &[Option<usize>]) -> bool {
    let others = book.load(owner) - members_on(book, family, owner);
    let loose = book.holdings(owner).filter(|&a| is_loose(member_of, a)).count();
    family.members.len() + others - loose <= book.ceiling()
}

/// Move every member to `owner`, evicting only as many loose accounts as
/// that takes.
fn host_family(book: &mut OwnerBook, family: &Family, owner: usize, member_of: &[Option<usize>]) {
    let others = book.load(owner) - members_on(book, family, owner);
    let excess = (others + family.members.len()).saturating_sub(book.ceiling());
    for victim in loose_victims(book, owner, excess, member_of) {
        book.evict(victim);
    }
    for &account in &family.members {
        if !book.holds(owner, account) {
            book.assign(account, owner);
        }
    }
}

/// Seat one member with the first candidate holding at least as many of its
/// family as its current owner does. A member that stays put sheds loose
/// accounts from an owner above the ceiling.
fn place_member(
    book: &mut OwnerBook,
    family: &Family,
    account: usize,
    candidates: &[usize],
    member_of: &[Option<usize>],
) {
    let current = book.state(account).owner();
    let current_count = current.map_or(0, |o| members_on(book, family, o));

    for &owner in candidates {
        if Some(owner) == current || members_on(book, family, owner) < current_count {
            continue;
        }
        if try_place(book, account, owner, member_of) {
            return;
        }
    }

    if let Some(owner) = current {
        let excess = book.load(owner).saturating_sub(book.ceiling());
        for victim in loose_victims(book, owner, excess, member_of) {
            book.evict(victim);
        }
    } else {
        log::debug!(
            "family '{}': no owner can take row {} even after eviction",
            family.parent_account_id,
            account + 1
        );
    }
}

/// Try to seat `account` with `owner`, evicting loose accounts if that is
/// what it takes. Returns false, leaving the book untouched, when the owner
/// cannot take it.
fn try_place(
    book: &mut OwnerBook,
    account: usize,
    owner: usize,
    member_of: &[Option<usize>],
) -> bool {
    if book.has_room(owner) {
        book.assign(account, owner);
        return true;
    }

    let needed = book.load(owner) + 1 - book.ceiling();
    let victims = loose_victims(book, owner, needed, member_of);
    if victims.len() < needed {
        return false;
    }
    for victim in victims {
        book.evict(victim);
    }
    book.assign(account, owner);
    true
}

/// Up to `n` loose accounts held by `owner`, latest input row first.
fn loose_victims(
    book: &OwnerBook,
    owner: usize,
    n: usize,
    member_of: &[Option<usize>],
) -> Vec<usize> {
    book.holdings(owner)
        .rev()
        .filter(|&a| is_loose(member_of, a))
        .take(n)
        .collect()
}

/// Shed whatever is still above the ceiling: loose accounts first, then
/// family members, latest input row first within each.
fn enforce_capacity(book: &mut OwnerBook, member_of: &[Option<usize>]) {
    for owner in 0..book.owner_count() {
        let excess = book.load(owner).saturating_sub(book.ceiling());
        if excess == 0 {
            continue;
        }

        let held: Vec<usize> = book.holdings(owner).rev().collect();
        let victims: Vec<usize> = held
            .iter()
            .filter(|&&a| is_loose(member_of, a))
            .chain(held.iter().filter(|&&a| !is_loose(member_of, a)))
            .take(excess)
            .copied()
            .collect();

        log::debug!(
            "owner '{}' over capacity by {excess}, shedding {} account(s)",
            book.name(owner),
            victims.len()
        );
        for victim in victims {
            book.evict(victim);
        }
    }
}

/// Give every account without an owner to the first owner with room.
/// No family preference here.
fn cleanup(book: &mut OwnerBook) {
    for account in 0..book.account_count() {
        if book.state(account).owner().is_some() {
            continue;
        }
        match book.first_with_room() {
            Some(owner) => book.assign(account, owner),
            None => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn build_rows(table: &AssignmentTable, book: &OwnerBook) -> (Vec<NormalizedRow>, AssignmentTable) {
    let mut out_table = table.clone();
    let mut rows = Vec::with_capacity(table.len());

    for (account, (row, out_row)) in table.rows.iter().zip(out_table.rows.iter_mut()).enumerate() {
        let owner = book.state(account).owner().map(|o| book.name(o).to_string());

        let outcome = match (&owner, &row.owner) {
            (None, previous) => Outcome::Unplaced {
                previous_owner: previous.clone(),
            },
            (Some(_), None) => Outcome::Placed,
            (Some(new), Some(old)) if new == old => Outcome::Unchanged,
            (Some(_), Some(old)) => match book.evicted_from(account) {
                Some(from) => Outcome::Reassigned {
                    evicted_from: book.name(from).to_string(),
                },
                None => Outcome::Moved { from: old.clone() },
            },
        };

        out_row.fields[table.owner_column] = owner.clone().unwrap_or_default();
        out_row.owner = owner.clone();

        rows.push(NormalizedRow {
            account_id: row.account_id.clone(),
            parent_account_id: row.parent_account_id.clone(),
            owner,
            outcome,
        });
    }

    (rows, out_table)
}
