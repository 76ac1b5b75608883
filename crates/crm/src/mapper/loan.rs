//! Loan application → Opportunity field mapping.

use lendarc_domain::{CrmId, LoanApplication};

use super::{crm_date, crm_datetime, FieldMap};

/// Build the Opportunity payload for a loan application.
///
/// Relation fields are conditional: they are only written once the related
/// records exist in the CRM (the account from the company sync, the primary
/// contact from the owner sync).
pub fn loan_fields(
    app: &LoanApplication,
    datetime_hour_offset: i64,
    account_id: Option<&CrmId>,
    primary_contact_id: Option<&CrmId>,
) -> FieldMap {
    let mut map = FieldMap::new();

    map.set("Name", opportunity_name(app))
        .set("Amount", app.amount_requested)
        .set_opt("Term_Months__c", app.term_months)
        .set_opt("Use_of_Funds__c", app.use_of_funds.as_deref())
        .set_opt("Product__c", app.product.as_deref())
        .set_opt("LeadSource", app.source.as_deref())
        .set_opt("Campaign_Name__c", app.campaign.as_deref())
        .set_opt(
            "Application_Submitted_At__c",
            app.submitted_at.map(|at| crm_datetime(at, datetime_hour_offset)),
        )
        .set_opt("Application_Started_On__c", app.started_on.map(crm_date))
        .set_opt("AccountId", account_id.map(|id| id.to_string()))
        .set_opt("Primary_Contact__c", primary_contact_id.map(|id| id.to_string()));

    map
}

fn opportunity_name(app: &LoanApplication) -> String {
    format!("{} - Application {}", app.company.legal_name, app.id)
}
