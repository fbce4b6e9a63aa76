//! Following `Link` header cursors through the client.

mod common;

use common::*;
use integrations_github_rest::pagination::{CursorParams, PaginationParams};
use integrations_github_rest::services::ListOrgReposOptions;
use integrations_github_rest::{GitHubErrorKind, Repository, User};
use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn link(uri: &str, path: &str, query: &str, rel: &str) -> String {
    format!(r#"<{}{}?{}>; rel="{}""#, uri, path, query, rel)
}

#[tokio::test]
async fn test_page_links_exposed() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let uri = server.uri();
    let links = [
        link(&uri, "/orgs/acme/repos", "page=2", "next"),
        link(&uri, "/orgs/acme/repos", "page=1", "prev"),
    ]
    .join(", ");
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo_json("acme", "one", 1)]))
                .insert_header("link", links.as_str()),
        )
        .mount(&server)
        .await;

    let page = client_for(&server)
        .repositories()
        .list_for_org("acme", &ListOrgReposOptions::default())
        .await?;

    assert_eq!(page.links.next_page(), Some(2));
    assert_eq!(page.links.prev_page(), Some(1));
    assert_eq!(page.links.first_page(), None);
    assert_eq!(page.links.last_page(), None);
    assert_eq!(page.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_link_header_means_no_cursors() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .get::<Vec<User>>("user/blocks")
        .await?;

    let links = response.meta.links();
    assert!(links.is_empty());
    assert_eq!(links.next_page(), None);
    assert_eq!(links.next_cursor(), None);
    Ok(())
}

#[tokio::test]
async fn test_list_all_preserves_caller_options() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "2"))
        .and(query_param("sort", "updated"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo_json("acme", "two", 2)]))
                .insert_header(
                    "link",
                    link(&uri, "/orgs/acme/repos", "per_page=1&page=3", "next").as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "3"))
        .and(query_param("sort", "updated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json("acme", "three", 3)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo_json("acme", "one", 1)]))
                .insert_header(
                    "link",
                    link(&uri, "/orgs/acme/repos", "per_page=1&page=2", "next").as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let options = ListOrgReposOptions {
        sort: Some("updated".into()),
        per_page: Some(1),
        ..Default::default()
    };
    let repos = client_for(&server)
        .repositories()
        .list_all_for_org("acme", &options)
        .await?;

    let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two", "three"]);
    Ok(())
}

#[tokio::test]
async fn test_cursor_pagination() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/audit-log"))
        .and(query_param("after", "MS42OTQ"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"action": "repo.create"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/audit-log"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"action": "team.create"}, {"action": "org.invite"}]))
                .insert_header(
                    "link",
                    link(&uri, "/orgs/acme/audit-log", "per_page=2&after=MS42OTQ", "next").as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = CursorParams {
        per_page: Some(2),
        ..Default::default()
    };
    let mut pages = client.pages::<serde_json::Value, _>("orgs/acme/audit-log", &options)?;

    let first = pages.next_page().await?.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first.links.next_cursor().as_deref(), Some("MS42OTQ"));
    assert!(pages.has_more());

    let second = pages.next_page().await?.unwrap();
    assert_eq!(second.len(), 1);
    assert!(!pages.has_more());
    assert!(pages.next_page().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_error_mid_pagination_stops_iteration() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "2"))
        .respond_with(error_response(500, "Something went wrong"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo_json("acme", "one", 1)]))
                .insert_header("link", link(&uri, "/orgs/acme/repos", "page=2", "next").as_str()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut pages = client.pages::<Repository, _>("orgs/acme/repos", &PaginationParams::new())?;

    assert!(pages.next_page().await?.is_some());
    let err = pages.next_page().await.unwrap_err();
    assert_eq!(err.kind(), GitHubErrorKind::Api);
    assert!(!pages.has_more());
    Ok(())
}

#[tokio::test]
async fn test_page_number_reported() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let uri = server.uri();
    let links = [
        link(&uri, "/orgs/acme/repos", "page=4", "next"),
        link(&uri, "/orgs/acme/repos", "page=2", "prev"),
        link(&uri, "/orgs/acme/repos", "page=1", "first"),
        link(&uri, "/orgs/acme/repos", "page=9", "last"),
    ]
    .join(", ");
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("link", links.as_str()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = client
        .request(Method::GET, "orgs/acme/repos")
        .query(&PaginationParams::new().page(3))
        .build()?;
    let page = client.get_page::<Repository>(request).await?;

    assert_eq!(page.page, Some(3));
    assert_eq!(page.links.total_pages(), Some(9));
    Ok(())
}
