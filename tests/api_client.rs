use temple_admin::api::{ApiClient, DonationQuery};
use temple_admin::auth::{AuthContext, LoginOutcome, Session, SessionStore, SESSION_KEYS};
use temple_admin::config::AppConfig;
use temple_admin::error::ApiError;
use temple_admin::forms::{lookup_donor, record_donation, DonationForm, DonorForm};
use temple_admin::listing::{DonationListState, SortColumn, SortDir};
use temple_admin::model::{QuickDonation, QuickDonationDetails, QuickDonor};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, auth: AuthContext) -> ApiClient {
    ApiClient::new(&AppConfig::for_base_url(&server.uri()), auth).unwrap()
}

fn session() -> Session {
    Session {
        token: "tok-123".into(),
        email: "admin@temple.org".into(),
        name: "Admin".into(),
        role: "Admin".into(),
    }
}

fn donation(id: i64) -> serde_json::Value {
    serde_json::json!({
        "donorReceiptDetailId": id,
        "dateOfDonation": "2024-04-14T00:00:00Z",
        "donorFirstName": "Lakshmi",
        "donorLastName": "Rao",
        "donationAmt": 108.0,
        "donationType": "General",
        "paymentMode": "Cash"
    })
}

#[tokio::test]
async fn list_request_carries_exact_page_and_replaces_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donorreceipts"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [donation(31), donation(32)],
            "totalCount": 27
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    let mut state = DonationListState::new(2024);
    state.items = vec![Default::default(); 5];
    state.total_count = 999;
    state.change_page(2);
    state.load(&client).await;

    assert_eq!(state.error, None);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.items[0].donor_receipt_detail_id, 31);
    assert_eq!(state.total_count, 27);
    assert_eq!(state.total_pages(), 2);

    let requests = server.received_requests().await.unwrap();
    let pairs: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let expected: Vec<(String, String)> = [
        ("year", "2024"),
        ("page", "2"),
        ("pageSize", "25"),
        ("sort", "date"),
        ("dir", "desc"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(pairs, expected);
}

#[tokio::test]
async fn list_with_search_and_sort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donorreceipts"))
        .and(query_param("search", "rao"))
        .and(query_param("sort", "amount"))
        .and(query_param("dir", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [], "totalCount": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());
    let page = client
        .list_donations(&DonationQuery {
            year: 2023,
            page: 1,
            page_size: 10,
            search: Some("rao".into()),
            sort: SortColumn::Amount,
            dir: SortDir::Asc,
        })
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn list_failure_keeps_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donorreceipts"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());
    let mut state = DonationListState::new(2024);
    state.load(&client).await;
    assert_eq!(state.error.as_deref(), Some("Failed to load donations."));
}

#[tokio::test]
async fn empty_lookup_makes_no_request() {
    let server = MockServer::start().await;
    let client = client_for(&server, AuthContext::with_session(session()));

    let err = lookup_donor(&client, " ", "", "").await.unwrap_err();
    match err {
        ApiError::Form(fields) => assert_eq!(
            fields.get("donorSearch"),
            Some("Enter donor ID or phone or email to search.")
        ),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn lookup_returns_first_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donors/search"))
        .and(query_param("phone", "555-0100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"donorId": 7, "firstName": "Ravi", "lastName": "Kumar"},
            {"donorId": 9, "firstName": "Ravi", "lastName": "K"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());
    let donor = lookup_donor(&client, "", " 555-0100 ", "").await.unwrap();
    assert_eq!(donor.donor_id, 7);
    assert_eq!(donor.full_name(), "Ravi Kumar");
}

#[tokio::test]
async fn lookup_with_no_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donors/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());
    let err = lookup_donor(&client, "12", "", "").await.unwrap_err();
    assert!(err.to_string().contains("No matching active donor found."));
}

#[tokio::test]
async fn logout_clears_store_and_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let auth = AuthContext::new();
    let client = client_for(&server, auth.clone());

    auth.sign_in(session(), &store).unwrap();
    for key in SESSION_KEYS {
        assert!(store.get(key).unwrap().is_some(), "{key} written");
    }
    client.list_donors().await.unwrap();

    auth.sign_out(&store).unwrap();
    for key in SESSION_KEYS {
        assert_eq!(store.get(key).unwrap(), None, "{key} removed");
    }
    client.list_donors().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer tok-123")
    );
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn login_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "requiresTwoFactor": true,
            "tempToken": "tmp-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-2fa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "appToken": "final", "email": "c@temple.org", "displayName": "Collector One",
            "role": "Collector", "isActive": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "email": "new@temple.org", "displayName": "New Person", "isActive": false
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());

    let first = LoginOutcome::from_payload(client.login("c@temple.org", "pw").await.unwrap());
    assert_eq!(first, LoginOutcome::TwoFactorRequired { temp_token: "tmp-1".into() });

    match LoginOutcome::from_payload(client.verify_two_factor("tmp-1", "123456").await.unwrap()) {
        LoginOutcome::SignedIn(s) => {
            assert_eq!(s.token, "final");
            assert_eq!(s.role, "Collector");
        }
        other => panic!("unexpected: {other:?}"),
    }

    let pending = LoginOutcome::from_payload(client.exchange("google", "id-token").await.unwrap());
    assert_eq!(
        pending,
        LoginOutcome::PendingApproval { display_name: "New Person".into() }
    );
}

#[tokio::test]
async fn server_validation_errors_map_to_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donors"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "title": "One or more validation errors occurred.",
            "errors": { "Email": ["The Email field is not a valid e-mail address."] }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    let donor = DonorForm {
        first_name: "Sita".into(),
        last_name: "Devi".into(),
        email: "not-an-email".into(),
        ..Default::default()
    }
    .validate()
    .unwrap();

    match client.create_donor(&donor).await.unwrap_err() {
        ApiError::Validation(fields) => assert_eq!(
            fields.get("email"),
            Some("The Email field is not a valid e-mail address.")
        ),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn record_donation_resolves_donor_by_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donors/search"))
        .and(query_param("email", "sita@example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"donorId": 44, "firstName": "Sita", "lastName": "Devi"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/donorreceipts"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "donorReceiptDetailId": 901
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    let form = DonationForm {
        email: "sita@example.org".into(),
        amount: Some(251.0),
        donation_type: "General".into(),
        payment_method: "Check".into(),
        date_of_donation: "2024-05-01".into(),
        ..Default::default()
    };
    let (donor_id, created) = record_donation(&client, &form).await.unwrap();
    assert_eq!(donor_id, 44);
    assert_eq!(created.donor_receipt_detail_id, 901);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(body["donorId"], 44);
    assert_eq!(body["dateOfDonation"], "2024-05-01T00:00:00Z");
    assert_eq!(body["currency"], "USD");
}

#[tokio::test]
async fn quick_donation_reads_pdf_and_id_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donorreceipts/quick-with-receipt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .insert_header("content-disposition", "attachment; filename=\"Receipt_77.pdf\"")
                .insert_header("x-donor-id", "12")
                .insert_header("x-donor-receipt-detail-id", "77")
                .set_body_bytes(b"%PDF-1.7 test".to_vec()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    let quick = QuickDonation {
        donor: QuickDonor {
            first_name: "Gopal".into(),
            last_name: "Iyer".into(),
            donor_type: "Individual".into(),
            ..Default::default()
        },
        donation: QuickDonationDetails {
            donation_amt: 11.0,
            donation_type: "General".into(),
            date_of_donation: "2024-06-01".into(),
            ..Default::default()
        },
    };
    let receipt = client.quick_donation(&quick).await.unwrap();
    assert_eq!(receipt.file_name, "Receipt_77.pdf");
    assert_eq!(&receipt.pdf[..], b"%PDF-1.7 test");
    assert_eq!(receipt.donor_id.as_deref(), Some("12"));
    assert_eq!(receipt.receipt_id.as_deref(), Some("77"));
}

#[tokio::test]
async fn export_csv_is_saved_byte_for_byte() {
    let server = MockServer::start().await;
    let csv = "ReceiptId,Donor\r\n1,\"Rao, L\"\r\n";
    Mock::given(method("GET"))
        .and(path("/api/donorreceipts/export"))
        .and(query_param("year", "2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    let blob = client.export_donations(2024).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let saved = temple_admin::export::save_bytes(
        dir.path(),
        &temple_admin::export::donations_export_file_name(2024),
        &blob.bytes,
    )
    .unwrap();
    assert!(saved.ends_with("RAMA-Donations-2024.csv"));
    assert_eq!(std::fs::read_to_string(saved).unwrap(), csv);
}

#[tokio::test]
async fn admin_user_calls_use_expected_routes() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/users/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/users/5/2fa/reset"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::with_session(session()));
    client.deactivate_user(5).await.unwrap();
    let setup = client
        .user_two_factor(5, temple_admin::api::TwoFactorAction::Reset)
        .await
        .unwrap();
    assert!(setup.backup_codes.is_empty());
}

#[tokio::test]
async fn forbidden_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "Admins only"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, AuthContext::new());
    match client.list_users().await.unwrap_err() {
        ApiError::Unauthorized { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Admins only");
        }
        other => panic!("unexpected: {other:?}"),
    }
}
