//! End-to-end adapter scenario against a mock CRM: authenticate, sync a full
//! application (account, contacts, opportunity), then run a paginated query.

use chrono::{NaiveDate, TimeZone, Utc};
use lendarc_crm::{CrmClient, CrmConfig};
use lendarc_domain::{Company, LoanApplication, Owner, TriState};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TRACING: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .init();
});

fn config_for(server: &MockServer) -> CrmConfig {
    Lazy::force(&TRACING);
    CrmConfig {
        base_url: server.uri(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "svc@example.com".to_string(),
        password: "hunter2".to_string(),
        ..CrmConfig::default()
    }
}

fn sample_application() -> LoanApplication {
    LoanApplication {
        id: 42,
        amount_requested: 150_000.0,
        term_months: Some(36),
        use_of_funds: Some("Working capital".to_string()),
        product: Some("Term Loan".to_string()),
        source: Some("Referral".to_string()),
        campaign: None,
        submitted_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 10, 30, 0).unwrap()),
        started_on: NaiveDate::from_ymd_opt(2024, 3, 1),
        company: Company {
            id: 7,
            legal_name: "Acme Widgets LLC".to_string(),
            dba: Some("Acme".to_string()),
            ein: Some("12-3456789".to_string()),
            entity_type: Some("LLC".to_string()),
            naics_code: None,
            phone: None,
            email: None,
            website: None,
            street: None,
            city: None,
            state: None,
            postal_code: None,
            annual_revenue: Some(1_250_000.0),
            founded_on: None,
            crm_id: None,
        },
        owners: vec![Owner {
            id: 3,
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            title: Some("CEO".to_string()),
            email: Some("dana@acme.example.com".to_string()),
            phone: None,
            ownership_percent: Some(60.0),
            date_of_birth: None,
            is_primary: true,
            veteran: Some(TriState::Yes),
            woman_owned: None,
            minority_owned: None,
            us_citizen: Some(TriState::Yes),
            crm_id: None,
        }],
        crm_id: None,
    }
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "instance_url": server.uri(),
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_application_sync_assigns_ids_in_dependency_order() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/services/data/v58.0/sobjects/Account"))
        .and(header("Authorization", "Bearer integration-token"))
        .and(body_partial_json(json!({"Name": "Acme Widgets LLC"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "0015x00000Account",
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The contact create must carry the account id assigned above.
    Mock::given(method("POST"))
        .and(path("/services/data/v58.0/sobjects/Contact"))
        .and(body_partial_json(json!({
            "LastName": "Reyes",
            "AccountId": "0015x00000Account",
            "Non_US_Citizen__c": "No"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "0035x00000Contact",
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    // And the opportunity links both, with the datetime fixup applied.
    Mock::given(method("POST"))
        .and(path("/services/data/v58.0/sobjects/Opportunity"))
        .and(body_partial_json(json!({
            "Name": "Acme Widgets LLC - Application 42",
            "AccountId": "0015x00000Account",
            "Primary_Contact__c": "0035x00000Contact",
            "Application_Submitted_At__c": "2024-03-09T17:30:00Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "0065x00000Oppty",
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrmClient::connect(config_for(&server)).await.expect("client");
    assert!(client.is_authenticated().await);

    let mut app = sample_application();
    let opportunity = client.sync_application(&mut app).await.expect("opportunity id");

    assert_eq!(opportunity.as_str(), "0065x00000Oppty");
    assert_eq!(app.crm_id.as_ref().map(|id| id.as_str()), Some("0065x00000Oppty"));
    assert_eq!(app.company.crm_id.as_ref().map(|id| id.as_str()), Some("0015x00000Account"));
    assert_eq!(app.owners[0].crm_id.as_ref().map(|id| id.as_str()), Some("0035x00000Contact"));
}

#[tokio::test]
async fn resync_patches_existing_records_instead_of_creating() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/services/data/v58.0/sobjects/Account/0015x00000Account"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/services/data/v58.0/sobjects/Contact/0035x00000Contact"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/services/data/v58.0/sobjects/Opportunity/0065x00000Oppty"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrmClient::connect(config_for(&server)).await.expect("client");

    let mut app = sample_application();
    app.crm_id = Some("0065x00000Oppty".to_string().into());
    app.company.crm_id = Some("0015x00000Account".to_string().into());
    app.owners[0].crm_id = Some("0035x00000Contact".to_string().into());

    let opportunity = client.sync_application(&mut app).await.expect("opportunity id");
    assert_eq!(opportunity.as_str(), "0065x00000Oppty");
}

#[tokio::test]
async fn paginated_query_accumulates_every_page() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v58.0/query/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 4,
            "done": false,
            "records": [{"Id": "001A"}, {"Id": "001B"}],
            "nextRecordsUrl": "/services/data/v58.0/query/01g-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v58.0/query/01g-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 4,
            "done": false,
            "records": [{"Id": "001C"}],
            "nextRecordsUrl": "/services/data/v58.0/query/01g-3"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v58.0/query/01g-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 4,
            "done": true,
            "records": [{"Id": "001D"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrmClient::connect(config_for(&server)).await.expect("client");
    let records = client.query_all("SELECT Id FROM Account ORDER BY Name").await;

    let ids: Vec<&str> =
        records.iter().filter_map(|r| r.get("Id").and_then(Value::as_str)).collect();
    assert_eq!(ids, vec!["001A", "001B", "001C", "001D"]);
}

#[tokio::test]
async fn remote_outage_degrades_to_empty_results() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/services/data/v58.0/sobjects/Account"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v58.0/query/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = CrmClient::connect(config_for(&server)).await.expect("client");

    let mut app = sample_application();
    // The whole sync degrades; no ids get assigned anywhere.
    assert_eq!(client.sync_application(&mut app).await, None);
    assert_eq!(app.company.crm_id, None);
    assert_eq!(app.owners[0].crm_id, None);
    assert_eq!(app.crm_id, None);

    assert!(client.query_all("SELECT Id FROM Account").await.is_empty());
}
