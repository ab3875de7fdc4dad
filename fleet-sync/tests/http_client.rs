use fleet::{
    api::{
        credentials::Credentials,
        http_client::{FleetApi, FleetClient},
        models::{
            ConfigMapKeysSyncRequest, DifferenceType, Id, Service, ServiceFilters, SyncRequest,
            SyncStatus,
        },
    },
    common::errors::Error,
    compare::classification::{classify, ComparisonStatus},
};
use serde_json::json;
use std::{collections::BTreeMap, time::Duration};
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn client(server: &MockServer, credentials: Credentials) -> FleetClient {
    FleetClient::new(&server.uri(), Duration::from_secs(5), credentials).unwrap()
}

#[tokio::test]
async fn comparison_is_fetched_with_the_instance_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/services/compare/by-instance"))
        .and(query_param("source", "10"))
        .and(query_param("target", "20"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": {"totalServices": 1, "identical": 0, "different": 0,
                        "missingInSource": 1, "missingInTarget": 0},
            "comparisons": [{
                "name": "billing",
                "source": null,
                "target": {"id": 4, "name": "billing", "appInstanceId": 20,
                           "imageTag": "billing:2.1.0"},
                "differenceType": "missing_in_source"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::in_memory(Some("secret".to_string()))).await;
    let report = client.compare_services(&Id::from(10), &Id::from(20)).await.unwrap();
    let record = &report.comparisons[0];
    assert_eq!(record.difference_type, Some(DifferenceType::MissingInSource));
    assert_eq!(classify(record), ComparisonStatus::MissingInSource);
    assert_eq!(
        record.target.as_ref().map(|s: &Service| s.image_tag.as_str()),
        Some("billing:2.1.0")
    );
}

#[tokio::test]
async fn service_filters_are_sent_as_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/services"))
        .and(query_param("env", "3"))
        .and(query_param("type", "statefulset"))
        .and(query_param("search", "db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    let filters = ServiceFilters {
        workload_type: Some("statefulset".to_string()),
        search: Some("db".to_string()),
    };
    assert!(client.list_services(&Id::from(3), &filters).await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_posts_parallel_arrays() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/sync"))
        .and(body_json(json!({
            "sourceEnvironmentId": 1,
            "targetEnvironmentId": 2,
            "serviceIds": [7, 8],
            "targetAppInstanceIds": [20, 21]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55,
            "sourceEnvironmentId": 1,
            "targetEnvironmentId": 2,
            "serviceIds": [7, 8],
            "status": "partial",
            "startTime": "2024-05-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    let operation = client
        .sync_services(&SyncRequest {
            source_environment_id: Id::from(1),
            target_environment_id: Id::from(2),
            service_ids: vec![Id::from(7), Id::from(8)],
            target_app_instance_ids: vec![Id::from(20), Id::from(21)],
        })
        .await
        .unwrap();
    assert_eq!(operation.id, Id::from(55));
    assert_eq!(operation.status, SyncStatus::Partial);
}

#[tokio::test]
async fn failed_sync_is_not_retried_and_keeps_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/sync"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "Sync engine busy"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    let error = client
        .sync_services(&SyncRequest {
            source_environment_id: Id::from(1),
            target_environment_id: Id::from(2),
            service_ids: vec![Id::from(7)],
            target_app_instance_ids: vec![Id::from(20)],
        })
        .await
        .unwrap_err();
    assert!(matches!(error, Error::HttpStatus { status: 503, .. }));
    assert_eq!(error.user_message(), "Sync engine busy");
}

#[tokio::test]
async fn unauthorized_response_clears_the_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/environments"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token.json");
    let credentials = Credentials::load(&token_file, None).unwrap();
    credentials.store("expired".to_string()).unwrap();

    let client = client(&server, credentials).await;
    let error = client.list_environments().await.unwrap_err();
    assert!(matches!(error, Error::Unauthorized { .. }));
    assert_eq!(client.credentials().token(), None);
    assert!(!token_file.exists());
}

#[tokio::test]
async fn configmap_names_are_encoded_in_the_details_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configmaps/app%20config/details"))
        .and(query_param("source", "1"))
        .and(query_param("target", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "app config",
            "keys": [{"key": "A", "sourceValue": "1", "targetValue": null,
                      "missingInTarget": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    let details = client.configmap_details("app config", &Id::from(1), &Id::from(2)).await.unwrap();
    assert_eq!(details.keys.len(), 1);
    assert!(details.keys[0].missing_in_target);
}

#[tokio::test]
async fn multi_key_sync_sends_the_key_map() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/configmaps/sync-keys"))
        .and(body_json(json!({
            "sourceAppInstanceId": 1,
            "targetAppInstanceId": 2,
            "configMapName": "app-config",
            "keys": {"A": "1", "B": "2"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    let ack = client
        .sync_configmap_keys(&ConfigMapKeysSyncRequest {
            source_app_instance_id: Id::from(1),
            target_app_instance_id: Id::from(2),
            config_map_name: "app-config".to_string(),
            keys: BTreeMap::from([
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
            ]),
        })
        .await
        .unwrap();
    assert!(ack.success);
}

#[tokio::test]
async fn endpoint_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fleet/api/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    for endpoint in [format!("{}/fleet/", server.uri()), format!("{}/fleet", server.uri())] {
        let client =
            FleetClient::new(&endpoint, Duration::from_secs(5), Credentials::default()).unwrap();
        assert!(client.list_sites().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn string_ids_are_encoded_in_paths() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/environments/qa%20east"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/services/compare/by-instance"))
        .and(query_param("source", "6f1d"))
        .and(query_param("target", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"comparisons": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Credentials::default()).await;
    client.delete_environment(&Id::from("qa east")).await.unwrap();
    let report = client
        .compare_services(&Id::from("6f1d"), &Id::from(20))
        .await
        .unwrap();
    assert!(report.comparisons.is_empty());
}
