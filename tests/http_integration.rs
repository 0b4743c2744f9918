//! Integration tests for the HTTP resource interface using wiremock
//!
//! These tests verify the request shapes sent for each verb and the handling
//! of error responses and edge cases.

use cloudctl::api::{ApiChoiceSource, ApiClient, ResourceFactory, ResourceInterface};
use cloudctl::config::SessionContext;
use cloudctl::error::CliError;
use cloudctl::options::{ChoiceProvider, ValueMap};
use cloudctl::resource::get_resource;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let session = SessionContext::new(&server.uri(), Some("test-token".to_string()))
        .expect("session should build");
    ApiClient::new(session).expect("client should build")
}

mod resource_tests {
    use super::*;

    /// List sends the bearer token, request id and query string
    #[tokio::test]
    async fn test_list_sends_credentials_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/load-balancers"))
            .and(bearer_token("test-token"))
            .and(header_exists("x-request-id"))
            .and(query_param("max", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadBalancers": [{"id": 1, "name": "edge"}],
                "meta": {"size": 1, "total": 1, "offset": 0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("load-balancers").unwrap();
        let response = client
            .resource(descriptor)
            .list(None, &vec![("max".to_string(), "25".to_string())])
            .await
            .expect("list should succeed");

        assert_eq!(response["loadBalancers"][0]["name"], "edge");
    }

    /// Scoped resources put the parent id in the path
    #[tokio::test]
    async fn test_create_virtual_server_under_parent() {
        let server = MockServer::start().await;
        let payload = json!({"loadBalancerInstance": {"vipName": "web", "vipPort": 443}});

        Mock::given(method("POST"))
            .and(path("/api/load-balancers/12/virtual-servers"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "loadBalancerInstance": {"id": 30, "vipName": "web"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("load-balancer-virtual-servers").unwrap();
        let response = client
            .resource(descriptor)
            .create(Some("12"), &payload)
            .await
            .expect("create should succeed");

        assert_eq!(response["loadBalancerInstance"]["id"], 30);
    }

    /// A 4xx response becomes a RestError carrying the server's message
    #[tokio::test]
    async fn test_error_response_keeps_server_message() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/groups/7"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "msg": "Name must be unique",
                "errors": {"name": "taken"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("groups").unwrap();
        let error = client
            .resource(descriptor)
            .update(None, "7", &json!({"group": {"name": "dup"}}))
            .await
            .expect_err("update should fail");

        match error {
            CliError::RestError { status, message, body } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Name must be unique");
                assert_eq!(body.unwrap()["errors"]["name"], "taken");
            }
            other => panic!("expected RestError, got {:?}", other),
        }
    }

    /// A 404 with a non-JSON body still yields a RestError
    #[tokio::test]
    async fn test_not_found_with_plain_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/zones/99"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("clouds").unwrap();
        let error = client
            .resource(descriptor)
            .get(None, "99", &Vec::new())
            .await
            .expect_err("get should fail");

        assert_eq!(error.status(), Some(404));
        assert_eq!(error.exit_code(), 1);
    }

    /// Delete with an empty 200 body returns an empty object
    #[tokio::test]
    async fn test_destroy_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/groups/7"))
            .and(query_param("force", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("groups").unwrap();
        let response = client
            .resource(descriptor)
            .destroy(None, "7", &vec![("force".to_string(), "true".to_string())])
            .await
            .expect("destroy should succeed");

        assert_eq!(response, json!({}));
    }

    /// Refresh posts to the member's refresh endpoint
    #[tokio::test]
    async fn test_refresh_posts_to_member() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/zones/5/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("clouds").unwrap();
        let response = client
            .resource(descriptor)
            .refresh(None, "5", &json!({}))
            .await
            .expect("refresh should succeed");

        assert_eq!(response["success"], true);
    }

    /// Refresh on a resource without the verb never reaches the server
    #[tokio::test]
    async fn test_refresh_unsupported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let descriptor = get_resource("groups").unwrap();
        let error = client
            .resource(descriptor)
            .refresh(None, "5", &json!({}))
            .await
            .expect_err("refresh should be rejected");

        assert!(matches!(error, CliError::Unsupported { .. }));
    }
}

mod choice_source_tests {
    use super::*;

    /// Named option sources go through /api/options with params as query
    #[tokio::test]
    async fn test_option_source_lookup() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/options/loadBalancerTypes"))
            .and(query_param("zoneId", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"name": "F5 BigIP", "value": "f5"},
                    {"name": "NSX-T", "value": "nsx-t"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let source = ApiChoiceSource::new(&client);
        let mut params = ValueMap::new();
        params.insert("zoneId".to_string(), json!(4));

        let choices = source
            .resolve("loadBalancerTypes", &params)
            .await
            .expect("lookup should succeed");

        assert_eq!(choices.len(), 2);
        assert_eq!(choices[1].label, "NSX-T");
        assert_eq!(choices[1].value, json!("nsx-t"));
    }

    /// Failed lookups propagate as RestError
    #[tokio::test]
    async fn test_option_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/options/clouds"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"msg": "Forbidden"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let source = ApiChoiceSource::new(&client);
        let error = source
            .resolve("clouds", &ValueMap::new())
            .await
            .expect_err("lookup should fail");

        assert_eq!(error.status(), Some(403));
        assert_eq!(error.to_string(), "Forbidden (HTTP 403)");
    }
}
