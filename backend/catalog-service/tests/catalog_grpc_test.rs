// Integration tests for the catalog gRPC API
//
// Each test starts a real server on 127.0.0.1:0 with in-memory stores and
// a temporary image folder, then talks to it through the generated clients.

mod common;

use catalog_service::client::CatalogSession;
use catalog_service::config::ClientSettings;
use catalog_service::grpc::{
    AuthServiceClient, CreateRecordRequest, Filter, LoginRequest, Memory, MemoryUnit,
    RateRecordRequest, RecordServiceClient, SearchRecordsRequest, UploadImageRequest,
};
use common::{record, TestServer};
use futures::StreamExt;
use std::time::Duration;
use tonic::{Code, Request};

async fn create(session: &mut CatalogSession, price: f64, cores: u32, ghz: f64, ram: u64) -> String {
    session
        .create_record(record(price, cores, ghz, ram))
        .await
        .unwrap()
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_with_seeded_users() {
    let server = TestServer::start().await;
    let mut auth = AuthServiceClient::new(server.channel().await);

    for username in ["admin", "user1"] {
        let token = auth
            .login(LoginRequest {
                username: username.to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap()
            .into_inner()
            .access_token;

        let claims = server.state.jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, username);
    }

    let status = auth
        .login(LoginRequest {
            username: "admin".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn test_session_fails_with_bad_credentials() {
    let server = TestServer::start().await;

    let settings = ClientSettings::new(server.url.clone(), "admin", "wrong");
    let result = catalog_service::client::connect_with_channel(server.channel().await, &settings).await;
    assert!(result.is_err());

    server.stop().await;
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_protected_call_without_token() {
    let server = TestServer::start().await;
    let mut client = RecordServiceClient::new(server.channel().await);

    let status = client
        .create_record(CreateRecordRequest {
            record: Some(record(1000.0, 4, 2.5, 8)),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    // Search is public
    let stream = client
        .search_records(SearchRecordsRequest { filter: None })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(stream.count().await, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_forged_token_rejected() {
    let server = TestServer::start().await;
    let mut client = RecordServiceClient::new(server.channel().await);

    let mut request = Request::new(CreateRecordRequest {
        record: Some(record(1000.0, 4, 2.5, 8)),
    });
    request
        .metadata_mut()
        .insert("authorization", "not.a.token".parse().unwrap());

    let status = client.create_record(request).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    server.stop().await;
}

#[tokio::test]
async fn test_user_role_cannot_create_or_upload() {
    let server = TestServer::start().await;
    let mut user = server.session("user1", "secret").await;

    let status = user
        .client
        .create_record(CreateRecordRequest {
            record: Some(record(1000.0, 4, 2.5, 8)),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::PermissionDenied);

    let upload = tokio_stream::iter(vec![UploadImageRequest::info("any", ".png")]);
    let status = user.client.upload_image(upload).await.unwrap_err();
    assert_eq!(status.code(), Code::PermissionDenied);

    user.shutdown().await;
    server.stop().await;
}

// ============================================================================
// CreateRecord + SearchRecords
// ============================================================================

#[tokio::test]
async fn test_create_then_search() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;

    let cheap = create(&mut admin, 900.0, 4, 2.5, 8).await;
    let _pricey = create(&mut admin, 3000.0, 8, 3.5, 32).await;
    let _weak = create(&mut admin, 1200.0, 2, 2.0, 4).await;
    let good = create(&mut admin, 1800.0, 6, 3.0, 16).await;

    let filter = Filter {
        max_price_usd: 2000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.5,
        min_ram: Some(Memory::new(8, MemoryUnit::Gigabyte)),
    };
    let mut ids: Vec<String> = admin
        .search_records(filter)
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    ids.sort();

    let mut expected = vec![cheap, good];
    expected.sort();
    assert_eq!(ids, expected);

    admin.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_create_rejects_bad_and_duplicate_ids() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;

    let mut bad = record(1000.0, 4, 2.5, 8);
    bad.id = "not-a-uuid".to_string();
    let status = admin
        .client
        .create_record(CreateRecordRequest { record: Some(bad) })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let id = create(&mut admin, 1000.0, 4, 2.5, 8).await;
    let mut duplicate = record(1000.0, 4, 2.5, 8);
    duplicate.id = id;
    let status = admin
        .client
        .create_record(CreateRecordRequest {
            record: Some(duplicate),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    admin.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_search_past_deadline_is_not_ok() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;
    for _ in 0..20 {
        create(&mut admin, 1000.0, 4, 2.5, 8).await;
    }

    let mut request = Request::new(SearchRecordsRequest { filter: None });
    request.set_timeout(Duration::from_nanos(1));

    match admin.client.search_records(request).await {
        Err(status) => assert_ne!(status.code(), Code::Ok),
        Ok(response) => {
            let items: Vec<_> = response.into_inner().collect().await;
            assert!(items.iter().any(|item| item.is_err()));
        }
    }

    admin.shutdown().await;
    server.stop().await;
}

// ============================================================================
// RateRecords
// ============================================================================

#[tokio::test]
async fn test_rate_records_stream() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;
    let first = create(&mut admin, 1000.0, 4, 2.5, 8).await;
    let second = create(&mut admin, 1500.0, 8, 3.0, 16).await;

    let mut user = server.session("user1", "secret").await;
    let responses = user
        .rate_records(
            &[first.clone(), second.clone(), first.clone()],
            &[8.0, 4.0, 10.0],
        )
        .await
        .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].record_id, first);
    assert_eq!(responses[0].rated_count, 1);
    assert_eq!(responses[1].record_id, second);
    assert_eq!(responses[1].average_score, 4.0);
    assert_eq!(responses[2].rated_count, 2);
    assert!((responses[2].average_score - 9.0).abs() < f64::EPSILON);

    user.shutdown().await;
    admin.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_rate_unknown_record() {
    let server = TestServer::start().await;
    let mut user = server.session("user1", "secret").await;

    let requests = vec![RateRecordRequest {
        record_id: "missing".to_string(),
        score: 5.0,
    }];
    let items: Vec<_> = user
        .client
        .rate_records(tokio_stream::iter(requests))
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().code(), Code::NotFound);

    user.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_rate_records_requires_matching_scores() {
    let server = TestServer::start().await;
    let mut user = server.session("user1", "secret").await;

    let result = user.rate_records(&["a".to_string(), "b".to_string()], &[1.0]).await;
    assert!(result.is_err());

    user.shutdown().await;
    server.stop().await;
}

// ============================================================================
// UploadImage
// ============================================================================

#[tokio::test]
async fn test_upload_image_in_chunks() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;
    let owner = create(&mut admin, 1000.0, 4, 2.5, 8).await;

    let image: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let source = tempfile::tempdir().unwrap();
    let file = source.path().join("front.jpg");
    tokio::fs::write(&file, &image).await.unwrap();

    let response = admin.upload_image_file(&owner, &file).await.unwrap();

    assert_eq!(response.size, 3000);
    let path = server.image_folder().join(format!("{}.jpg", response.id));
    assert_eq!(tokio::fs::read(path).await.unwrap(), image);

    admin.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_upload_rejections() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;
    let owner = create(&mut admin, 1000.0, 4, 2.5, 8).await;

    // Unknown owner
    let messages = vec![
        UploadImageRequest::info("00000000-0000-0000-0000-000000000000", ".jpg"),
        UploadImageRequest::chunk(vec![1, 2, 3]),
    ];
    let status = admin
        .client
        .upload_image(tokio_stream::iter(messages))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    // One byte over the cap
    let messages = vec![
        UploadImageRequest::info(owner, ".jpg"),
        UploadImageRequest::chunk(vec![0; 512 * 1024]),
        UploadImageRequest::chunk(vec![0; 512 * 1024]),
        UploadImageRequest::chunk(vec![0; 1]),
    ];
    let status = admin
        .client
        .upload_image(tokio_stream::iter(messages))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let mut entries = tokio::fs::read_dir(server.image_folder()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());

    admin.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_upload_file_too_large() {
    let server = TestServer::start().await;
    let mut admin = server.session("admin", "secret").await;
    let owner = create(&mut admin, 1000.0, 4, 2.5, 8).await;

    let source = tempfile::tempdir().unwrap();
    let file = source.path().join("huge.png");
    tokio::fs::write(&file, vec![7u8; (1 << 20) + 1]).await.unwrap();

    let err = admin.upload_image_file(&owner, &file).await.unwrap_err();
    let status = err.downcast_ref::<tonic::Status>().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);

    // No extension, no upload
    let bare = source.path().join("image");
    tokio::fs::write(&bare, [1u8, 2, 3]).await.unwrap();
    assert!(admin.upload_image_file(&owner, &bare).await.is_err());

    admin.shutdown().await;
    server.stop().await;
}

// ============================================================================
// Token refresh
// ============================================================================

#[tokio::test]
async fn test_refreshed_token_keeps_working() {
    let server = TestServer::start().await;

    let mut settings = ClientSettings::new(server.url.clone(), "admin", "secret");
    settings.refresh_interval = Duration::from_millis(1100);
    let mut admin = catalog_service::client::connect_with_channel(server.channel().await, &settings)
        .await
        .unwrap();

    let before = admin.current_token();
    tokio::time::sleep(Duration::from_millis(1600)).await;
    let after = admin.current_token();
    assert_ne!(before, after);

    create(&mut admin, 1000.0, 4, 2.5, 8).await;

    admin.shutdown().await;
    server.stop().await;
}
