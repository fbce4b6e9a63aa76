//! Service namespaces exercised against a mock server.

mod common;

use common::*;
use integrations_github_rest::pagination::PaginationParams;
use integrations_github_rest::resilience::RetryExecutor;
use integrations_github_rest::services::SearchOptions;
use integrations_github_rest::{
    Assignee, CustomPropertyValue, GitHubErrorKind, PropertyValue, RateLimitCategory,
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_copilot_seats_with_mixed_assignees() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    authenticated("GET", "/orgs/acme/copilot/billing/seats")
        .and(query_param("per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_seats": 3,
            "seats": [
                {
                    "created_at": "2021-08-03T18:00:00-06:00",
                    "last_activity_at": "2021-10-14T00:53:32-06:00",
                    "last_activity_editor": "vscode/1.77.3/copilot/1.86.82",
                    "assignee": {"login": "octocat", "id": 1, "type": "User", "site_admin": false}
                },
                {
                    "created_at": "2021-09-23T18:00:00-06:00",
                    "assignee": {"id": 7, "name": "Justice League", "slug": "justice-league", "type": "Team"}
                },
                {
                    "created_at": 1632441600,
                    "assignee": {"login": "acme", "id": 9, "type": "Organization"}
                }
            ]
        })))
        .mount(&server)
        .await;

    let seats = client_for(&server)
        .copilot()
        .list_seats("acme", &PaginationParams::new().per_page(50))
        .await?;

    assert_eq!(seats.total_seats, 3);
    let kinds: Vec<_> = seats.seats.iter().map(|s| s.assignee.type_name()).collect();
    assert_eq!(kinds, vec!["User", "Team", "Organization"]);
    assert_eq!(seats.seats[0].user().unwrap().login, "octocat");
    assert!(matches!(seats.seats[1].assignee, Assignee::Team(ref t) if t.id == 7));
    assert_eq!(seats.seats[2].created_at.timestamp(), 1632441600);
    Ok(())
}

#[tokio::test]
async fn test_copilot_unknown_assignee_is_decode_error() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/members/robot/copilot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created_at": "2021-08-03T18:00:00-06:00",
            "assignee": {"login": "robot", "id": 3, "type": "Bot"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .copilot()
        .seat_details("acme", "robot")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::Decode);
    assert!(err.message().contains("unsupported assignee type Bot"));
    assert_eq!(err.response().map(|m| m.status()), Some(StatusCode::OK));
    Ok(())
}

#[tokio::test]
async fn test_copilot_seat_changes() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/copilot/billing/selected_teams"))
        .and(body_json(json!({"selected_teams": ["platform", "infra"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"seats_created": 12})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/orgs/acme/copilot/billing/selected_users"))
        .and(body_json(json!({"selected_usernames": ["octocat"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"seats_cancelled": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let added = client
        .copilot()
        .add_teams("acme", &["platform".to_string(), "infra".to_string()])
        .await?;
    let removed = client
        .copilot()
        .remove_users("acme", &["octocat".to_string()])
        .await?;

    assert_eq!(added.seats_created, 12);
    assert_eq!(removed.seats_cancelled, 1);
    Ok(())
}

#[tokio::test]
async fn test_blocking() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/blocks/spammer"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/blocks/friend"))
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/user/blocks/friend"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let users = client.users();

    assert!(users.is_blocked("spammer").await?);
    assert!(!users.is_blocked("friend").await?);
    assert_eq!(users.block("friend").await?.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_search_with_text_match() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", "windows label:bug"))
        .and(query_param("sort", "created"))
        .and(header("accept", "application/vnd.github.text-match+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [{
                "id": 1,
                "number": 1347,
                "title": "Crash on windows",
                "state": "open",
                "comments": 0,
                "text_matches": [{
                    "object_type": "Issue",
                    "property": "title",
                    "fragment": "Crash on windows",
                    "matches": [{"text": "windows", "indices": [9, 16]}]
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = SearchOptions {
        sort: Some("created".into()),
        text_match: true,
        ..Default::default()
    };
    let results = client_for(&server)
        .search()
        .issues("windows label:bug", &options)
        .await?;

    assert_eq!(results.total_count, 1);
    let matches = &results.items[0].text_matches[0].matches[0];
    assert_eq!(matches.text, "windows");
    assert_eq!(matches.indices, vec![9, 16]);
    Ok(())
}

#[tokio::test]
async fn test_custom_property_values() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/properties/values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"property_name": "environment", "value": "production"},
            {"property_name": "service", "value": ["web", "worker"]},
            {"property_name": "team", "value": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/o/r/properties/values"))
        .and(body_json(json!({
            "properties": [
                {"property_name": "environment", "value": "staging"},
                {"property_name": "team", "value": null}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let values = client.repositories().custom_property_values("o", "r").await?;
    assert_eq!(values[0].value, Some(PropertyValue::Single("production".into())));
    assert_eq!(
        values[1].value,
        Some(PropertyValue::Multiple(vec!["web".into(), "worker".into()]))
    );
    assert_eq!(values[2].value, None);

    let meta = client
        .repositories()
        .set_custom_property_values(
            "o",
            "r",
            &[
                CustomPropertyValue::single("environment", "staging"),
                CustomPropertyValue::unset("team"),
            ],
        )
        .await?;
    assert_eq!(meta.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_endpoint_seeds_tracker() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {
                "core": {"limit": 5000, "remaining": 4999, "reset": 1691591363, "used": 1},
                "search": {"limit": 30, "remaining": 18, "reset": 1691591091, "used": 12},
                "code_search": {"limit": 10, "remaining": 10, "reset": 1691591091, "used": 0}
            },
            "rate": {"limit": 5000, "remaining": 4999, "reset": 1691591363, "used": 1}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let limits = client.rate_limit().get().await?;

    assert_eq!(limits.core().map(|r| r.remaining), Some(4999));
    let search = client
        .rate_limit_tracker()
        .snapshot(&RateLimitCategory::Search)
        .unwrap();
    assert_eq!((search.limit, search.remaining), (30, 18));
    assert!(client
        .rate_limit_tracker()
        .snapshot(&RateLimitCategory::CodeSearch)
        .is_some());
    Ok(())
}

#[tokio::test]
async fn test_retry_policy_wraps_single_attempts() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("o", "r", 1)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let retry = RetryExecutor::new(3, Duration::from_millis(1), Duration::from_millis(10), 2.0, 0.0)
        .with_metrics(client.metrics().clone());

    let repositories = client.repositories();
    let repo = retry.execute(|| repositories.get("o", "r")).await?;

    assert_eq!(repo.full_name, "o/r");
    assert_eq!(client.metrics().total_requests(), 2);
    assert_eq!(client.metrics().retried_requests(), 1);
    Ok(())
}
