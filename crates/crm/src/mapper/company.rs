//! Company → Account field mapping.

use lendarc_domain::Company;

use super::{crm_date, FieldMap};

/// Build the Account payload for a company.
pub fn company_fields(company: &Company) -> FieldMap {
    let mut map = FieldMap::new();

    map.set("Name", company.legal_name.as_str())
        .set_opt("DBA__c", company.dba.as_deref())
        .set_opt("EIN__c", company.ein.as_deref())
        .set_opt("Entity_Type__c", company.entity_type.as_deref())
        .set_opt("NAICS_Code__c", company.naics_code.as_deref())
        .set_opt("Phone", company.phone.as_deref())
        .set_opt("Email__c", company.email.as_deref())
        .set_opt("Website", company.website.as_deref())
        .set_opt("BillingStreet", company.street.as_deref())
        .set_opt("BillingCity", company.city.as_deref())
        .set_opt("BillingState", company.state.as_deref())
        .set_opt("BillingPostalCode", company.postal_code.as_deref())
        .set_opt("AnnualRevenue", company.annual_revenue)
        .set_opt("Business_Start_Date__c", company.founded_on.map(crm_date));

    map
}
