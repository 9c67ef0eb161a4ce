use std::collections::HashMap;

use crate::book::OwnerBook;
use crate::model::AssignmentTable;

/// Accounts sharing one parent. Only families with two or more members
/// are built; singletons have nothing to consolidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub parent_account_id: String,
    /// Member rows in input order.
    pub members: Vec<usize>,
}

/// Group rows by parent in order of each parent's first appearance.
pub fn group_families(table: &AssignmentTable) -> Vec<Family> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Family> = Vec::new();

    for (account, row) in table.rows.iter().enumerate() {
        let Some(ref parent) = row.parent_account_id else {
            continue;
        };
        match slot.get(parent.as_str()) {
            Some(&i) => groups[i].members.push(account),
            None => {
                slot.insert(parent.as_str(), groups.len());
                groups.push(Family {
                    parent_account_id: parent.clone(),
                    members: vec![account],
                });
            }
        }
    }

    groups.retain(|f| f.members.len() > 1);
    groups
}

/// For each row, the index of its family in `families`, if it has one.
pub fn membership(families: &[Family], accounts: usize) -> Vec<Option<usize>> {
    let mut out = vec![None; accounts];
    for (i, family) in families.iter().enumerate() {
        for &account in &family.members {
            out[account] = Some(i);
        }
    }
    out
}

/// How many members of `family` each owner currently holds, highest count
/// first, ties in owner order. Owners holding none are omitted.
pub fn owner_counts(book: &OwnerBook, family: &Family) -> Vec<(usize, usize)> {
    let mut counts = vec![0usize; book.owner_count()];
    for &account in &family.members {
        if let Some(owner) = book.state(account).owner() {
            counts[owner] += 1;
        }
    }

    let mut ranked: Vec<(usize, usize)> = counts
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| n > 0)
        .collect();
    // Stable sort keeps owner order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Candidate owners for a family: owners already holding members (by
/// `owner_counts`), then every other known owner in owner order.
pub fn candidate_owners(book: &OwnerBook, family: &Family) -> Vec<usize> {
    let ranked = owner_counts(book, family);
    let mut seen = vec![false; book.owner_count()];
    let mut out = Vec::with_capacity(book.owner_count());

    for (owner, _) in ranked {
        seen[owner] = true;
        out.push(owner);
    }
    for owner in 0..book.owner_count() {
        if !seen[owner] {
            out.push(owner);
        }
    }
    out
}

/// How many members of `family` `owner` holds.
pub fn members_on(book: &OwnerBook, family: &Family, owner: usize) -> usize {
    family.members.iter().filter(|&&a| book.holds(owner, a)).count()
}

/// All members held by one owner.
pub fn is_consolidated(book: &OwnerBook, family: &Family) -> bool {
    let mut owners = family.members.iter().map(|&a| book.state(a).owner());
    match owners.next() {
        Some(Some(first)) => owners.all(|o| o == Some(first)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountRow;

    fn table() -> AssignmentTable {
        AssignmentTable::from_accounts(vec![
            AccountRow::new("b1", Some("PB"), Some("Yuri")),
            AccountRow::new("a1", Some("PA"), Some("Xena")),
            AccountRow::new("solo", Some("PS"), Some("Xena")),
            AccountRow::new("a2", Some("PA"), Some("Yuri")),
            AccountRow::new("loose", None, Some("Zoe")),
            AccountRow::new("b2", Some("PB"), None),
            AccountRow::new("a3", Some("PA"), Some("Yuri")),
        ])
    }

    #[test]
    fn families_in_first_appearance_order() {
        let families = group_families(&table());
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].parent_account_id, "PB");
        assert_eq!(families[0].members, vec![0, 5]);
        assert_eq!(families[1].parent_account_id, "PA");
        assert_eq!(families[1].members, vec![1, 3, 6]);
    }

    #[test]
    fn membership_skips_singletons_and_loose_rows() {
        let families = group_families(&table());
        let m = membership(&families, 7);
        assert_eq!(m, vec![Some(0), Some(1), None, Some(1), None, Some(0), Some(1)]);
    }

    #[test]
    fn candidates_rank_by_count_then_owner_order() {
        let t = table();
        let book = OwnerBook::from_table(&t, &[], 10);
        let families = group_families(&t);

        // Owner order: Yuri 0, Xena 1, Zoe 2.
        // PA: Yuri 2, Xena 1.
        let pa = &families[1];
        assert_eq!(owner_counts(&book, pa), vec![(0, 2), (1, 1)]);
        assert_eq!(candidate_owners(&book, pa), vec![0, 1, 2]);

        // PB: only Yuri holds a member (b2 is unassigned).
        let pb = &families[0];
        assert_eq!(owner_counts(&book, pb), vec![(0, 1)]);
        assert_eq!(candidate_owners(&book, pb), vec![0, 1, 2]);
    }

    #[test]
    fn higher_count_beats_owner_order() {
        let t = AssignmentTable::from_accounts(vec![
            AccountRow::new("f1", Some("P"), Some("Xena")),
            AccountRow::new("f2", Some("P"), Some("Yuri")),
            AccountRow::new("f3", Some("P"), Some("Yuri")),
            AccountRow::new("x", None, Some("Zoe")),
        ]);
        let book = OwnerBook::from_table(&t, &[], 10);
        let families = group_families(&t);
        assert_eq!(candidate_owners(&book, &families[0]), vec![1, 0, 2]);
    }

    #[test]
    fn ties_keep_owner_order() {
        let t = AssignmentTable::from_accounts(vec![
            AccountRow::new("x", None, Some("Xena")),
            AccountRow::new("f1", Some("P"), Some("Yuri")),
            AccountRow::new("f2", Some("P"), Some("Xena")),
        ]);
        let book = OwnerBook::from_table(&t, &[], 10);
        let families = group_families(&t);
        assert_eq!(candidate_owners(&book, &families[0]), vec![0, 1]);
    }

    #[test]
    fn consolidation_check() {
        let t = table();
        let mut book = OwnerBook::from_table(&t, &[], 10);
        let families = group_families(&t);
        assert!(!is_consolidated(&book, &families[1]));
        assert_eq!(members_on(&book, &families[1], 0), 2);
        book.assign(1, 0);
        assert_eq!(members_on(&book, &families[1], 0), 3);
        assert_eq!(members_on(&book, &families[1], 1), 0);
        assert!(is_consolidated(&book, &families[1]));
        // Unassigned member never counts as consolidated.
        assert!(!is_consolidated(&book, &families[0]));
    }
}
