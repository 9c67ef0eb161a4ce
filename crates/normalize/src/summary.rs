use crate::model::{NormalizeSummary, NormalizedRow, Outcome, OwnerLoad};

/// Family counts gathered by the engine before and after placement.
#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyStats {
    pub families: usize,
    pub consolidated_before: usize,
    pub consolidated_after: usize,
}

/// Compute summary statistics from normalized rows.
pub fn compute_summary(
    rows: &[NormalizedRow],
    owner_loads: Vec<OwnerLoad>,
    families: FamilyStats,
    evicted: usize,
) -> NormalizeSummary {
    let mut unchanged = 0;
    let mut moved = 0;
    let mut placed = 0;
    let mut reassigned = 0;
    let mut unassigned = 0;

    for r in rows {
        match r.outcome {
            Outcome::Unchanged => unchanged += 1,
            Outcome::Moved { .. } => moved += 1,
            Outcome::Placed => placed += 1,
            Outcome::Reassigned { .. } => reassigned += 1,
            Outcome::Unplaced { .. } => unassigned += 1,
        }
    }

    NormalizeSummary {
        total_accounts: rows.len(),
        owners: owner_loads.len(),
        families: families.families,
        families_consolidated_before: families.consolidated_before,
        families_consolidated_after: families.consolidated_after,
        unchanged,
        moved,
        placed,
        reassigned,
        evicted,
        unassigned,
        owner_loads,
    }
}
