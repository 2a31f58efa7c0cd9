use std::sync::Arc;
use std::time::Duration;
use temple_admin::api::ApiClient;
use temple_admin::auth::{AuthContext, Session};
use temple_admin::config::AppConfig;
use temple_admin::import::{
    ImportError, ImportRequest, ImportSession, PollState, StopReason, UploadFile,
};
use temple_admin::model::ImportMode;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Arc<ApiClient> {
    let auth = AuthContext::with_session(Session {
        token: "tok".into(),
        email: "c@temple.org".into(),
        name: "Collector".into(),
        role: "Collector".into(),
    });
    Arc::new(ApiClient::new(&AppConfig::for_base_url(&server.uri()), auth).unwrap())
}

fn request(mode: ImportMode) -> ImportRequest {
    ImportRequest {
        mode,
        year: Some(2024),
        file: Some(UploadFile::new(
            "donations-2024.csv",
            "FullName,DonationAmount,Email,Phone,Date\nAsha Rao,101,asha@example.org,,2024-01-14\n",
        )),
    }
}

async fn status_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().starts_with("/api/donationimport/status/"))
        .count()
}

#[tokio::test]
async fn dry_run_waits_one_interval_before_first_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donationimport/dryrun"))
        .and(query_param("year", "2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "abc123",
            "donorsCreated": 1,
            "emailStatuses": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/donationimport/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "abc123",
            "emailStatuses": [{"donorId": "1", "email": "asha@example.org", "status": "Pending (dry run)", "attempts": 0}]
        })))
        .mount(&server)
        .await;

    let mut session = ImportSession::new(client_for(&server), Duration::from_millis(1000));
    let summary = session.run(&request(ImportMode::DryRun)).await.unwrap();
    assert_eq!(summary.job_id.as_deref(), Some("abc123"));
    assert_eq!(session.poll_state(), PollState::Polling);

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(status_requests(&server).await, 0, "no poll before one interval");

    let mut waited = Duration::ZERO;
    while status_requests(&server).await == 0 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    assert!(status_requests(&server).await >= 1);

    // Dry-run emails never leave "Pending (dry run)"; the poller keeps going.
    assert_eq!(session.poll_state(), PollState::Polling);
    session.cancel();
    assert_eq!(session.poll_state(), PollState::Stopped(StopReason::Cancelled));

    let upload = &server.received_requests().await.unwrap()[0];
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"donations-2024.csv\""));
}

#[tokio::test]
async fn commit_polls_until_delivery_settles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donationimport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": 77,
            "donationsImported": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/donationimport/status/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": 77,
            "donationsImported": 2,
            "emailsSent": 1,
            "emailsFailed": 1,
            "emailStatuses": [
                {"donorId": 1, "email": "a@x.org", "status": "Sent", "attempts": 1},
                {"donorId": 2, "email": "b@x.org", "status": "Failed", "attempts": 3, "errorMessage": "bounced"}
            ]
        })))
        .mount(&server)
        .await;

    let mut session = ImportSession::new(client_for(&server), Duration::from_millis(100));
    session.run(&request(ImportMode::Commit)).await.unwrap();

    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .unwrap();
    assert_eq!(state, PollState::Stopped(StopReason::Completed));
    assert_eq!(status_requests(&server).await, 1);

    let summary = session.summary().unwrap();
    assert_eq!(summary.email_statuses.len(), 2);
    assert!(summary.is_email_delivery_complete());
    assert_eq!(session.job_id().as_deref(), Some("77"));
}

#[tokio::test]
async fn status_error_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donationimport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"jobId": "j9"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/donationimport/status/j9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("job not found"))
        .mount(&server)
        .await;

    let mut session = ImportSession::new(client_for(&server), Duration::from_millis(100));
    session.run(&request(ImportMode::Commit)).await.unwrap();
    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .unwrap();
    assert!(matches!(state, PollState::Stopped(StopReason::Failed(_))));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(status_requests(&server).await, 1);
}

#[tokio::test]
async fn server_failure_shows_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/donationimport/dryrun"))
        .respond_with(ResponseTemplate::new(500).set_body_string("System.InvalidOperationException"))
        .mount(&server)
        .await;

    let mut session = ImportSession::new(client_for(&server), Duration::from_millis(100));
    let err = session.run(&request(ImportMode::DryRun)).await.unwrap_err();
    assert!(matches!(err, ImportError::Failed(_)));
    assert_eq!(
        session.error(),
        Some("Error running import. Please check the server logs.")
    );
    assert!(session.summary().is_none());
}

#[tokio::test]
async fn receipts_zip_download() {
    let server = MockServer::start().await;
    let zip = b"PK\x03\x04fake-zip".to_vec();
    Mock::given(method("GET"))
        .and(path("/api/donationimport/receipts/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/zip")
                .set_body_bytes(zip.clone()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let blob = client.import_receipts("abc123").await.unwrap();
    assert_eq!(blob.header("content-type"), Some("application/zip"));

    let dir = tempfile::tempdir().unwrap();
    let name = temple_admin::export::receipts_zip_file_name(Some(2024), "abc123");
    let path = temple_admin::export::save_bytes(dir.path(), &name, &blob.bytes).unwrap();
    assert!(path.ends_with("receipts_2024_abc123.zip"));
    assert_eq!(std::fs::read(path).unwrap(), zip);
}

#[tokio::test]
async fn job_id_is_escaped_in_the_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/donationimport/status/2024%2Fa%3Fb%23c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "2024/a?b#c",
            "emailStatuses": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/donationimport/receipts/2024%2Fa%3Fb%23c"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let summary = client.import_status("2024/a?b#c").await.unwrap();
    assert_eq!(summary.job_id.as_deref(), Some("2024/a?b#c"));
    assert_eq!(&client.import_receipts("2024/a?b#c").await.unwrap().bytes[..], b"PK");
}
