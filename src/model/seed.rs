//! First-use seed content.

use super::{ChecklistItem, ChecklistTier};

/// Conventional id for the traveler representing the signed-in user.
pub const SELF_TRAVELER_ID: &str = "t-me";

pub const DEFAULT_NATIONALITY: &str = "United States";

/// Generic cover image assigned to wizard-created trips.
pub const DEFAULT_COVER_IMAGE: &str =
    "https://images.unsplash.com/photo-1476514525535-07fb3b4ae5f1?q=80&w=1000&auto=format&fit=crop";

/// Default departure checklist for a fresh account.
pub fn default_checklist() -> Vec<ChecklistItem> {
    let entries: &[(&str, ChecklistTier)] = &[
        ("Passport valid for 6+ months", ChecklistTier::Tier1),
        ("Flight tickets booked", ChecklistTier::Tier1),
        ("Travel insurance active", ChecklistTier::Tier1),
        ("Accommodation confirmed", ChecklistTier::Tier1),
        ("Local currency / cards arranged", ChecklistTier::Tier2),
        ("Power adapter packed", ChecklistTier::Tier2),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(i, (item, tier))| ChecklistItem {
            id: format!("chk-{}", i + 1),
            item: (*item).to_string(),
            category: *tier,
            is_confirmed: false,
            notes: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_checklist_ids_unique() {
        let list = default_checklist();
        let mut ids: Vec<_> = list.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), list.len());
        assert!(list.iter().all(|c| !c.is_confirmed));
    }
}
