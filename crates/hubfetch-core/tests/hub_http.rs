use futures::StreamExt;
use hubfetch_core::{
    AnalysisId, ArtifactFetcher, ConnectionKind, ConnectionOptions, HubAddress, HubError,
    HubSession, ProjectId, SignInOutcome,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn password_options(dir: &tempfile::TempDir, password: &str) -> ConnectionOptions {
    let pwfile = dir.path().join("hubpw");
    std::fs::write(&pwfile, format!("{}\n", password)).unwrap();
    ConnectionOptions {
        username: Some("alice".into()),
        password_file: Some(pwfile),
        ..Default::default()
    }
}

async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sign_in.html"))
        .and(body_string_contains("sif_username=alice"))
        .and(body_string_contains("sif_password=s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sessionid=abc123; Path=/; HttpOnly")
                .set_body_string("Signed in as alice"),
        )
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sign_in.html"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Incorrect password"))
        .mount(server)
        .await;
}

async fn signed_in_session(server: &MockServer, dir: &tempfile::TempDir) -> HubSession {
    let address: HubAddress = server.uri().parse().unwrap();
    let mut session = HubSession::connect(address, &password_options(dir, "s3cret")).unwrap();
    assert_eq!(session.sign_in().await.unwrap(), SignInOutcome::Authenticated);
    session
}

#[tokio::test]
async fn test_sign_in_and_list_projects() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects.json"))
        .and(query_param("name", "firmware"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id": 12, "name": "firmware", "path": "/embedded/firmware"}]"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(&server, &dir).await;
    let projects = ArtifactFetcher::new(&session)
        .fetch_project_info(Some("firmware"))
        .await
        .unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, ProjectId::from(12));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let address: HubAddress = server.uri().parse().unwrap();
    let mut session = HubSession::connect(address, &password_options(&dir, "wrong")).unwrap();

    let outcome = session.sign_in().await.unwrap();
    assert_eq!(
        outcome,
        SignInOutcome::Rejected {
            reason: "Incorrect password".into()
        }
    );
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/project/99/analyses.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(&server, &dir).await;
    let err = ArtifactFetcher::new(&session)
        .fetch_analysis_info(ProjectId::from(99))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::NotFound(_)));
}

#[tokio::test]
async fn test_large_sarif_streams_in_bounded_chunks() {
    const BODY_SIZE: usize = 32 * 1024 * 1024;
    const MAX_CHUNK: usize = 1024 * 1024;

    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/analysis/318-allwarnings.sarif"))
        .and(query_param("baseline", "301"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; BODY_SIZE]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(&server, &dir).await;
    let mut stream = ArtifactFetcher::new(&session)
        .fetch_sarif_analysis_difference_stream(AnalysisId::from(318), Some(AnalysisId::from(301)))
        .await
        .unwrap();

    let mut total = 0;
    let mut chunks = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= MAX_CHUNK, "chunk of {} bytes", chunk.len());
        total += chunk.len();
        chunks += 1;
    }
    assert_eq!(total, BODY_SIZE);
    assert!(chunks > 1);
}

#[tokio::test]
async fn test_copy_sarif_to_file() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    let sarif = r#"{"version":"2.1.0","runs":[]}"#;
    Mock::given(method("GET"))
        .and(path("/analysis/7-allwarnings.sarif"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sarif))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(&server, &dir).await;
    let stream = ArtifactFetcher::new(&session)
        .fetch_sarif_analysis_stream(AnalysisId::from(7))
        .await
        .unwrap();

    let out_path = dir.path().join("out.sarif");
    let mut file = tokio::fs::File::create(&out_path).await.unwrap();
    let written = hubfetch_core::copy_stream(stream, &mut file).await.unwrap();
    assert_eq!(written, sarif.len() as u64);
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), sarif);
}

#[tokio::test]
async fn test_refused_connection_is_a_connection_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let address: HubAddress = format!("http://127.0.0.1:{}", port).parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = HubSession::connect(address, &password_options(&dir, "s3cret")).unwrap();

    let err = session.sign_in().await.unwrap_err();
    assert!(
        matches!(
            err,
            HubError::Connection {
                kind: ConnectionKind::Refused,
                ..
            }
        ),
        "unexpected error {:?}",
        err
    );
}

#[tokio::test]
async fn test_unknown_host_is_a_dns_error() {
    let address: HubAddress = "https://no-such-hub.invalid:7340".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = HubSession::connect(address, &password_options(&dir, "s3cret")).unwrap();

    let err = session.sign_in().await.unwrap_err();
    assert!(
        matches!(
            err,
            HubError::Connection {
                kind: ConnectionKind::Dns,
                ..
            }
        ),
        "unexpected error {:?}",
        err
    );
}

#[tokio::test]
async fn test_https_against_plain_http_is_a_tls_error() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    let port = server.address().port();
    let address: HubAddress = format!("https://127.0.0.1:{}", port).parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = HubSession::connect(address, &password_options(&dir, "s3cret")).unwrap();

    let err = session.sign_in().await.unwrap_err();
    assert!(
        matches!(
            err,
            HubError::Connection {
                kind: ConnectionKind::Tls,
                ..
            }
        ),
        "unexpected error {:?}",
        err
    );
    assert!(!session.is_authenticated());
}
