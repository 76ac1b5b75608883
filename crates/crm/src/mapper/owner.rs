//! Owner → Contact field mapping.

use lendarc_domain::{CrmId, Owner};

use super::{crm_date, inverted_tri_state_picklist, tri_state_picklist, FieldMap};

/// Build the Contact payload for a beneficial owner.
///
/// `account_id` is the company's CRM id; the relation field is only set
/// once the account actually exists remotely.
pub fn owner_fields(owner: &Owner, account_id: Option<&CrmId>) -> FieldMap {
    let mut map = FieldMap::new();

    map.set("FirstName", owner.first_name.as_str())
        .set("LastName", owner.last_name.as_str())
        .set_opt("Title", owner.title.as_deref())
        .set_opt("Email", owner.email.as_deref())
        .set_opt("Phone", owner.phone.as_deref())
        .set_opt("Ownership_Percent__c", owner.ownership_percent)
        .set_opt("Birthdate", owner.date_of_birth.map(crm_date))
        .set("Primary_Contact__c", owner.is_primary)
        .set_opt("Veteran__c", tri_state_picklist(owner.veteran))
        .set_opt("Woman_Owned__c", tri_state_picklist(owner.woman_owned))
        .set_opt("Minority_Owned__c", tri_state_picklist(owner.minority_owned))
        // Org schema asks "non-US citizen?", so the flag is inverted.
        .set_opt("Non_US_Citizen__c", inverted_tri_state_picklist(owner.us_citizen))
        .set_opt("AccountId", account_id.map(CrmId::to_string));

    map
}
