mod support;

use std::sync::Arc;

use eve_api::{
    Endpoint, EndpointError, Headers, HttpBackendConfig, HttpEndpoint, HttpMethod, IF_MATCH,
    MockTransport, QueryResult, UrlResolver, strip_reserved,
};
use serde_json::{Value, json};
use support::{ROOT_URL, WIDGETS_URL, item, persisted_widget, transport_with_root};

const WIDGET_URL: &str = "http://eve.test/api/widgets/42";

fn widgets(transport: &Arc<MockTransport>, rel: &str) -> HttpEndpoint {
    let headers = Headers::from([("Accept".to_string(), "application/json".to_string())]);
    let resolver = Arc::new(UrlResolver::new(ROOT_URL, transport.clone()));
    HttpEndpoint::new(
        "widgets",
        HttpBackendConfig {
            rel: Some(rel.to_string()),
            headers,
        },
        resolver,
        transport.clone(),
    )
}

#[tokio::test(flavor = "current_thread")]
async fn query_sends_params_and_default_headers_and_returns_raw_document() {
    let transport = transport_with_root();
    let document = json!({"_items": [{"_id": "1"}], "_meta": {"total": 1}});
    transport.respond(HttpMethod::Get, WIDGETS_URL, 200, Some(document.clone()));
    let endpoint = widgets(&transport, "widgets");

    let result = endpoint
        .query(&item(json!({"where": {"name": "a"}, "page": 2})))
        .await
        .expect("query should succeed");

    assert_eq!(result, QueryResult::Document(document));
    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, WIDGETS_URL);
    assert!(request
        .params
        .contains(&("where".to_string(), r#"{"name":"a"}"#.to_string())));
    assert!(request.params.contains(&("page".to_string(), "2".to_string())));
    assert_eq!(
        request.headers.get("Accept").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test(flavor = "current_thread")]
async fn get_by_id_strips_trailing_slash_from_resource_url() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Get, WIDGET_URL, 200, Some(json!({"_id": "42"})));
    let endpoint = widgets(&transport, "widgets");

    let found = endpoint.find(&json!("42")).await.expect("find should succeed");

    assert_eq!(found.get("_id"), Some(&json!("42")));
    assert_eq!(
        transport.last_request().map(|request| request.url),
        Some(WIDGET_URL.to_string())
    );
}

#[tokio::test(flavor = "current_thread")]
async fn get_by_id_encodes_params_and_sends_no_default_headers() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Get, WIDGET_URL, 200, Some(json!({"_id": "42"})));
    let endpoint = widgets(&transport, "widgets");

    let document = endpoint
        .get_by_id("42", &item(json!({"embedded": {"user": 1}})))
        .await
        .expect("get_by_id should succeed");

    assert_eq!(document, json!({"_id": "42"}));
    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, WIDGET_URL);
    assert_eq!(
        request.params,
        vec![("embedded".to_string(), r#"{"user":1}"#.to_string())]
    );
    assert!(request.headers.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn get_by_url_skips_link_discovery() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(HttpMethod::Get, WIDGET_URL, 200, Some(json!({"_id": "42"})));
    let endpoint = widgets(&transport, "widgets");

    let document = endpoint
        .get_by_url(WIDGET_URL)
        .await
        .expect("get_by_url should succeed");

    assert_eq!(document, json!({"_id": "42"}));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_rel_rejects_with_resource_name() {
    let transport = transport_with_root();
    let endpoint = widgets(&transport, "gizmos");

    let error = endpoint.get_url().await.expect_err("gizmos is not advertised");

    assert!(matches!(error, EndpointError::ResourceNotFound(name) if name == "gizmos"));
}

#[tokio::test(flavor = "current_thread")]
async fn update_without_diff_sends_item_minus_reserved_fields() {
    let transport = transport_with_root();
    transport.respond(
        HttpMethod::Patch,
        WIDGET_URL,
        200,
        Some(json!({"_etag": "etag-2", "_status": "OK"})),
    );
    let endpoint = widgets(&transport, "widgets");

    let mut implicit = persisted_widget();
    endpoint
        .update(&mut implicit, None)
        .await
        .expect("update should succeed");
    let implicit_body = transport.last_request().and_then(|request| request.body);

    let mut explicit = persisted_widget();
    let diff = strip_reserved(&explicit);
    endpoint
        .update(&mut explicit, Some(&diff))
        .await
        .expect("update should succeed");
    let explicit_body = transport.last_request().and_then(|request| request.body);

    assert_eq!(implicit_body, Some(json!({"name": "sprocket", "size": 3})));
    assert_eq!(implicit_body, explicit_body);
}

#[tokio::test(flavor = "current_thread")]
async fn update_sends_if_match_and_merges_response_in_place() {
    let transport = transport_with_root();
    transport.respond(
        HttpMethod::Patch,
        WIDGET_URL,
        200,
        Some(json!({"_etag": "etag-2", "_updated": "later"})),
    );
    let endpoint = widgets(&transport, "widgets");
    let mut widget = persisted_widget();

    let returned = endpoint
        .update(&mut widget, Some(&item(json!({"size": 4}))))
        .await
        .expect("update should succeed");

    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("etag-1"));
    assert_eq!(request.body, Some(json!({"size": 4})));
    assert_eq!(widget.get("_etag"), Some(&json!("etag-2")));
    assert_eq!(widget.get("_updated"), Some(&json!("later")));
    assert_eq!(returned, widget);
}

#[tokio::test(flavor = "current_thread")]
async fn update_without_self_link_fails_before_any_request() {
    let transport = transport_with_root();
    let endpoint = widgets(&transport, "widgets");
    let mut widget = item(json!({"_id": "42", "name": "orphan"}));

    let error = endpoint
        .update(&mut widget, None)
        .await
        .expect_err("update should fail");

    assert!(matches!(error, EndpointError::InvalidItem(_)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn save_without_id_posts_item_merged_with_diff() {
    let transport = transport_with_root();
    transport.respond(
        HttpMethod::Post,
        WIDGETS_URL,
        201,
        Some(json!({"_id": "43", "_etag": "etag-new", "_status": "OK"})),
    );
    let endpoint = widgets(&transport, "widgets");
    let mut widget = item(json!({"_id": null, "name": "new"}));

    endpoint
        .save(&mut widget, Some(&item(json!({"size": 1}))))
        .await
        .expect("save should succeed");

    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, WIDGETS_URL);
    assert_eq!(
        request.body,
        Some(json!({"_id": null, "name": "new", "size": 1}))
    );
    assert!(!request.headers.contains_key(IF_MATCH));
    assert_eq!(widget.get("_id"), Some(&json!("43")));
    assert_eq!(widget.get("size"), Some(&json!(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn save_with_id_patches_only_the_diff() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Patch, WIDGET_URL, 200, Some(json!({"_etag": "etag-2"})));
    let endpoint = widgets(&transport, "widgets");
    let mut widget = persisted_widget();

    endpoint
        .save(&mut widget, Some(&item(json!({"name": "renamed"}))))
        .await
        .expect("save should succeed");

    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.body, Some(json!({"name": "renamed"})));
    // The diff is sent, not merged locally; only the server response lands in the item.
    assert_eq!(widget.get("name"), Some(&json!("sprocket")));
    assert_eq!(widget.get("_etag"), Some(&json!("etag-2")));
}

#[tokio::test(flavor = "current_thread")]
async fn create_with_error_envelope_rejects_and_leaves_item_untouched() {
    let transport = transport_with_root();
    let envelope = json!({"_status": "ERR", "_issues": {"name": "required"}});
    transport.respond(HttpMethod::Post, WIDGETS_URL, 201, Some(envelope.clone()));
    let endpoint = widgets(&transport, "widgets");
    let mut widget = item(json!({"size": 1}));

    let error = endpoint
        .create(&mut widget)
        .await
        .expect_err("create should fail");

    let response = error.response().expect("response attached");
    assert!(matches!(error, EndpointError::Application(_)));
    assert_eq!(response.status, 201);
    assert_eq!(response.body, Some(envelope));
    assert_eq!(widget, item(json!({"size": 1})));
}

#[tokio::test(flavor = "current_thread")]
async fn replace_puts_full_item_with_if_match() {
    let transport = transport_with_root();
    let destination = "http://eve.test/api/widgets/99";
    transport.respond(HttpMethod::Put, destination, 200, Some(json!({"_etag": "etag-9"})));
    let endpoint = widgets(&transport, "widgets");
    let mut widget = persisted_widget();
    let original = Value::Object(widget.clone());

    endpoint
        .replace(destination, &mut widget)
        .await
        .expect("replace should succeed");

    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.body, Some(original));
    assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("etag-1"));
    assert_eq!(widget.get("_etag"), Some(&json!("etag-9")));
}

#[tokio::test(flavor = "current_thread")]
async fn remove_treats_404_as_success() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Delete, WIDGET_URL, 404, None);
    let endpoint = widgets(&transport, "widgets");
    let widget = persisted_widget();

    let response = endpoint.delete(&widget).await.expect("404 delete is success");
    let removed = endpoint.remove(&widget).await.expect("404 remove is success");

    assert_eq!(response.status, 404);
    assert_eq!(removed, widget);
    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.headers.get(IF_MATCH).map(String::as_str), Some("etag-1"));
}

#[tokio::test(flavor = "current_thread")]
async fn remove_rejects_other_failures_with_response() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Delete, WIDGET_URL, 500, Some(json!({"error": "boom"})));
    let endpoint = widgets(&transport, "widgets");

    let error = endpoint
        .remove(&persisted_widget())
        .await
        .expect_err("500 should reject");

    assert!(matches!(error, EndpointError::Status(ref response) if response.status == 500));
    assert_eq!(
        error.response().and_then(|response| response.body.clone()),
        Some(json!({"error": "boom"}))
    );
}

#[tokio::test(flavor = "current_thread")]
async fn headers_for_item_without_etag_has_no_if_match() {
    let transport = transport_with_root();
    let endpoint = widgets(&transport, "widgets");

    let headers = endpoint.headers_for(Some(&item(json!({"_etag": null}))));

    assert!(!headers.contains_key(IF_MATCH));
    assert_eq!(headers, endpoint.get_headers());
}

#[tokio::test(flavor = "current_thread")]
async fn resource_url_is_discovered_once_across_operations() {
    let transport = transport_with_root();
    transport.respond(HttpMethod::Get, WIDGETS_URL, 200, Some(json!({"_items": []})));
    let endpoint = widgets(&transport, "widgets");

    endpoint.query(&item(json!({}))).await.expect("first query");
    endpoint.query(&item(json!({}))).await.expect("second query");
    assert_eq!(
        endpoint.get_url().await.expect("get_url should succeed"),
        Some(WIDGETS_URL.to_string())
    );

    let root_fetches = transport
        .requests()
        .iter()
        .filter(|request| request.url == ROOT_URL)
        .count();
    assert_eq!(root_fetches, 1);
}
