//! End-to-end runs against the mock DX Suite server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through `ReqwestTransport`.

use std::io::{Read, Write};

use dxsuite_core::{
    AccountId, ApiError, BlockingClient, Credential, DxSuiteClient, ReqwestTransport, UnitSearch,
    UnitUpload, WorkflowRef,
};

const INVOICES: &str = "b3cc8d27-6fdc-4509-944b-686bec461974";

/// Start the mock server on a background thread and return its address.
fn start_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn credential(key: &str) -> Credential {
    Credential {
        id: AccountId::Number(1),
        key: key.to_string(),
        domain: "acme".to_string(),
        register_date: Some("2023-04-01".to_string()),
        expiration_date: Some("2099-03-31".to_string()),
    }
}

fn client_for(addr: std::net::SocketAddr, key: &str) -> BlockingClient {
    let base = format!("http://{addr}{}", dxsuite_core::config::API_PATH);
    BlockingClient::with_transport(
        DxSuiteClient::with_base_url(&credential(key), &base),
        ReqwestTransport::new().unwrap(),
    )
}

fn complete_unit(addr: std::net::SocketAddr, unit_id: &str) {
    let response = ureq::post(&format!("http://{addr}/_mock/units/{unit_id}/complete"))
        .send_empty()
        .expect("mock completion failed");
    assert_eq!(response.status().as_u16(), 200);
}

#[test]
fn unit_lifecycle() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::DEFAULT_API_KEY);

    // Step 1: workflow lookup.
    let workflows = client.search_workflows("folder-1", "請求書").unwrap();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].workflow_id, INVOICES);

    let config = client
        .get_workflow_configuration(&WorkflowRef::new(INVOICES, 1).unwrap())
        .unwrap();
    assert_eq!(config.workflow_id, INVOICES);
    assert_eq!(config.revision, 1);

    // Step 2: register a unit with one file.
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("a.png");
    std::fs::write(&scan, b"\x89PNG fake image").unwrap();
    let upload = UnitUpload::new(&scan).unit_name("march").department_id("d-1");
    let registered = client.register_unit(INVOICES, &[upload]).unwrap();
    assert_eq!(registered.unit_name.as_deref(), Some("march"));

    // Step 3: the unit is visible by id with the submitted name and workflow.
    let search = UnitSearch {
        unit_id: Some(registered.unit_id.clone()),
        ..Default::default()
    };
    let units = client.search_units(&search).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].unit_name.as_deref(), Some("march"));
    assert_eq!(units[0].workflow_id.as_deref(), Some(INVOICES));

    // Step 4: CSV is refused until processing finishes.
    let err = client.download_csv(&registered.unit_id).unwrap_err();
    assert!(matches!(err, ApiError::Remote { status: 409, code: Some(ref c), .. } if c == "E40900"));

    complete_unit(addr, &registered.unit_id);

    let csv = client.download_csv(&registered.unit_id).unwrap();
    assert_eq!(
        String::from_utf8(csv).unwrap(),
        "fileName,unitName,departmentId\na.png,march,d-1\n"
    );

    // Step 5: unfiltered search returns everything registered so far.
    let all = client.search_units(&UnitSearch::default()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].csv_file_name.as_deref(), Some(format!("{}.csv", registered.unit_id).as_str()));
}

#[test]
fn metadata_follows_each_file() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::DEFAULT_API_KEY);

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.jpg");
    std::fs::write(&first, b"\x89PNG first").unwrap();
    std::fs::write(&second, b"\xff\xd8 second").unwrap();

    let uploads = [
        UnitUpload::new(&first).unit_name("april"),
        UnitUpload::new(&second).department_id("d-2"),
    ];
    let registered = client.register_unit(INVOICES, &uploads).unwrap();
    assert_eq!(registered.unit_name.as_deref(), Some("april"));

    complete_unit(addr, &registered.unit_id);
    let csv = client.download_csv(&registered.unit_id).unwrap();
    assert_eq!(
        String::from_utf8(csv).unwrap(),
        "fileName,unitName,departmentId\na.png,april,\nb.jpg,april,d-2\n"
    );
}

/// Serves exactly one canned response on a background thread.
fn serve_once(status_line: &str, content_type: &str, body: Vec<u8>) -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let head = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });
    addr
}

#[test]
fn large_csv_is_returned_whole() {
    let size = 11 * 1024 * 1024;
    let body: Vec<u8> = (0..size).map(|i| b'a' + (i % 26) as u8).collect();
    let addr = serve_once("HTTP/1.1 200 OK", "text/csv", body.clone());

    let client = client_for(addr, mock_server::DEFAULT_API_KEY);
    let csv = client.download_csv("u1").unwrap();
    assert_eq!(csv.len(), size);
    assert!(csv == body);
}

#[test]
fn wrong_key_is_a_remote_error() {
    let addr = start_mock_server();
    let client = client_for(addr, "not-the-key");

    let err = client.search_units(&UnitSearch::default()).unwrap_err();
    match err {
        ApiError::Remote {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("E40100"));
            assert!(message.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_revision_is_a_remote_error() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::DEFAULT_API_KEY);

    let err = client
        .get_workflow_configuration(&WorkflowRef::new(INVOICES, 5).unwrap())
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[test]
fn missing_upload_file_fails_before_sending() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::DEFAULT_API_KEY);

    let err = client
        .register_unit(INVOICES, &[UnitUpload::new("./no/such/scan.png")])
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingFile(_)));

    let units = client.search_units(&UnitSearch::default()).unwrap();
    assert!(units.is_empty(), "nothing should have been registered");
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, mock_server::DEFAULT_API_KEY);
    let err = client.download_csv("u1").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
