//! Marketplace records and their client-facing inputs

pub mod application;
pub mod campaign;
pub mod profile;
pub mod store;

pub use application::{Application, ApplicationStatus, ApplicationView, NewApplication};
pub use campaign::{
    Campaign, CampaignDetails, CampaignListParams, CampaignPatch, CampaignSortField,
    CampaignStatus, NewCampaign,
};
pub use profile::{Profile, ProfilePatch, ProfileRole};
pub use store::{
    NewStore, OwnerSummary, Store, StoreDetails, StoreListParams, StorePatch, StoreSortField,
};

/// Trim, treating empty strings as absent
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Patch semantics for optional text: absent keeps, blank clears, anything else replaces
pub(crate) fn merge_field(target: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *target = blank_to_none(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_field() {
        let mut field = Some("old".to_string());
        merge_field(&mut field, None);
        assert_eq!(field.as_deref(), Some("old"));

        merge_field(&mut field, Some(" new ".to_string()));
        assert_eq!(field.as_deref(), Some("new"));

        merge_field(&mut field, Some("  ".to_string()));
        assert_eq!(field, None);
    }
}
