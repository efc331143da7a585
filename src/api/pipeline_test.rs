use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tracing_test::traced_test;

use super::CallArgs;
use super::EndpointDefinition;
use super::MockTransport;
use super::TransportResponse;
use crate::reactive::WatchSpec;
use crate::test_utils::record_value;
use crate::test_utils::recorded;
use crate::test_utils::recorder;
use crate::test_utils::MockBuilder;
use crate::test_utils::PendingTransport;
use crate::validators;
use crate::Atom;
use crate::AtomConfig;
use crate::Definition;
use crate::Error;
use crate::RegistrationError;
use crate::TransportError;

fn settings() -> AtomConfig {
    let mut settings = AtomConfig::default();
    settings.api.base_url = "https://api.test".to_string();
    settings
}

fn transport_returning(
    times: usize,
    status: u16,
    body: Value,
) -> MockTransport {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .times(times)
        .returning(move |_, _| Ok(TransportResponse::json(status, &body)));
    transport
}

fn atom_with(transport: MockTransport) -> Atom {
    MockBuilder::new()
        .with_settings(settings())
        .with_transport(transport)
        .build_atom()
}

fn create_api(
    atom: &Atom,
    name: &str,
    endpoint: EndpointDefinition,
) {
    atom.create(name, Definition::Api(endpoint)).unwrap();
}

fn envelope(
    atom: &Atom,
    id: &str,
) -> Value {
    atom.get(&format!("api.__requests.{}.response", id))
        .unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_second_identical_get_is_served_from_cache() {
    let atom = atom_with(transport_returning(1, 200, json!({"v": 1})));
    create_api(
        &atom,
        "thing",
        EndpointDefinition::get("/x").map("onCode200", "thing.data", |res| res.raw.body["v"].clone()),
    );

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();
    atom.set("thing.data", Value::Null).unwrap();

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(atom.get("thing.data"), Some(json!(1)));
    assert_eq!(envelope(&atom, "api1"), envelope(&atom, "api2"));
    assert_eq!(envelope(&atom, "api2")["raw"]["status"], json!(200));
}

#[tokio::test]
async fn test_cache_can_be_disabled() {
    let mut settings = settings();
    settings.api.cache_enabled = false;
    let atom = MockBuilder::new()
        .with_settings(settings)
        .with_transport(transport_returning(2, 200, json!({})))
        .build_atom();
    create_api(&atom, "thing", EndpointDefinition::get("/x"));

    for _ in 0..2 {
        atom.send("thing", CallArgs::default()).unwrap();
        atom.run_until_idle().await.unwrap();
    }
    assert_eq!(atom.inner.cache.len(), 0);
}

#[tokio::test]
async fn test_same_request_enqueued_twice_is_sent_once() {
    let atom = atom_with(transport_returning(1, 200, json!({})));
    create_api(&atom, "thing", EndpointDefinition::post("/x"));

    let request = atom.new_request("thing", CallArgs::default()).unwrap();
    assert!(atom.enqueue(request.clone()));
    assert!(!atom.enqueue(request));
    atom.run_until_idle().await.unwrap();

    assert_eq!(envelope(&atom, "api1")["raw"]["status"], json!(200));
    assert!(atom.inner.queue.lock().is_empty());
}

#[tokio::test]
async fn test_requests_are_sent_one_after_another() {
    let order = recorder();
    let mut transport = MockTransport::new();
    let seen = order.clone();
    transport.expect_fetch().times(2).returning(move |url, _| {
        seen.lock().push(url.to_string());
        Ok(TransportResponse::json(200, &json!({})))
    });
    let atom = atom_with(transport);
    create_api(&atom, "a", EndpointDefinition::post("/a"));
    create_api(&atom, "b", EndpointDefinition::post("/b"));

    atom.send("a", CallArgs::default()).unwrap();
    atom.send("b", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(recorded(&order), vec!["https://api.test/a", "https://api.test/b"]);
}

#[tokio::test]
async fn test_transport_failure_becomes_on_error_response() {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .times(1)
        .returning(|_, _| Err(TransportError::Network("connection refused".into())));
    let atom = atom_with(transport);
    create_api(
        &atom,
        "thing",
        EndpointDefinition::get("/x")
            .map("onError", "thing.error", |res| json!(res.error_message))
            .flag("sending", "thing.loading"),
    );

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    let response = envelope(&atom, "api1");
    assert_eq!(response["error"], json!(true));
    assert_eq!(response["isValid"], json!(false));
    assert_eq!(response["handler"], json!("onError"));
    assert_eq!(response["raw"]["status"], json!(500));
    assert_eq!(
        atom.get("thing.error"),
        Some(json!("Network failure: connection refused"))
    );
    assert_eq!(atom.get("api.__requests.api1.sending"), Some(json!(false)));
    assert_eq!(atom.get("thing.loading"), Some(json!(false)));
    assert_eq!(atom.inner.cache.len(), 0);
}

#[tokio::test]
async fn test_non_json_body_becomes_on_error_response() {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .returning(|_, _| Ok(TransportResponse::new(200, "<html>")));
    let atom = atom_with(transport);
    create_api(&atom, "thing", EndpointDefinition::get("/x"));

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    let response = envelope(&atom, "api1");
    assert_eq!(response["handler"], json!("onError"));
    assert_eq!(response["raw"]["status"], json!(500));
}

#[tokio::test]
async fn test_empty_body_reads_as_null() {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .returning(|_, _| Ok(TransportResponse::new(204, "")));
    let atom = atom_with(transport);
    create_api(&atom, "thing", EndpointDefinition::new("DELETE", "/x"));

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    let response = envelope(&atom, "api1");
    assert_eq!(response["error"], json!(false));
    assert_eq!(response["handler"], json!("onCode204"));
    assert_eq!(response["raw"]["body"], Value::Null);
}

#[tokio::test]
async fn test_get_sends_query_in_url_and_no_body() {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .withf(|url, request| {
            url.to_string() == "https://api.test/search?q=a+b&tag=x&tag=y" && request.body.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(TransportResponse::json(200, &json!([]))));
    let atom = atom_with(transport);
    create_api(
        &atom,
        "search",
        EndpointDefinition::get("/search").body(json!({"dropped": true})),
    );

    atom.send("search", CallArgs::new().query(json!({"tag": ["x", "y"], "q": "a b"})))
        .unwrap();
    atom.run_until_idle().await.unwrap();
}

#[tokio::test]
async fn test_post_sends_populated_json_body() {
    let mut transport = MockTransport::new();
    transport
        .expect_fetch()
        .withf(|url, request| {
            url.to_string() == "https://api.test/login"
                && request.method == "POST"
                && request.body.as_deref() == Some(r#"{"password":"p","user":"ana"}"#)
        })
        .times(1)
        .returning(|_, _| Ok(TransportResponse::json(200, &json!({"jwt": "t"}))));
    let atom = atom_with(transport);
    atom.set("form.user", "ana").unwrap();
    create_api(
        &atom,
        "login",
        EndpointDefinition::post("/login")
            .body(json!({"user": "#form.user"}))
            .map("onCode200", "user.jwt", |res| res.raw.body["jwt"].clone()),
    );

    atom.send("login", CallArgs::new().body(json!({"password": "p"})))
        .unwrap();
    atom.run_until_idle().await.unwrap();
    assert_eq!(atom.get("user.jwt"), Some(json!("t")));
}

#[tokio::test]
async fn test_on_default_handles_unmapped_status() {
    let atom = atom_with(transport_returning(1, 404, json!({"message": "missing"})));
    create_api(
        &atom,
        "thing",
        EndpointDefinition::get("/x")
            .map("onCode200", "thing.data", |res| res.raw.body.clone())
            .map("onDefault", "thing.failure", |res| res.raw.body["message"].clone()),
    );

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(envelope(&atom, "api1")["handler"], json!("onDefault"));
    assert_eq!(atom.get("thing.failure"), Some(json!("missing")));
    assert_eq!(atom.get("thing.data"), None);
}

#[tokio::test]
async fn test_missing_handler_is_not_an_error() {
    let atom = atom_with(transport_returning(1, 418, json!({})));
    create_api(&atom, "thing", EndpointDefinition::get("/x"));

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(envelope(&atom, "api1")["handler"], json!("onCode418"));
    assert_eq!(atom.get("api.__requests.api1.sending"), Some(json!(false)));
}

#[tokio::test]
async fn test_parsers_run_after_mappers() {
    let atom = atom_with(transport_returning(1, 200, json!({"items": [1, 2, 3]})));
    create_api(
        &atom,
        "list",
        EndpointDefinition::get("/list")
            .map("onCode200", "list.items", |res| res.raw.body["items"].clone())
            .parse("onCode200", json!(["#list.items", "#list.factor"]), "list.total", |args| {
                let count = args[0].as_array().map(Vec::len).unwrap_or(0) as i64;
                json!(count * args[1].as_i64().unwrap_or(1))
            }),
    );
    atom.set("list.factor", 10).unwrap();

    atom.send("list", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(atom.get("list.total"), Some(json!(30)));
}

#[tokio::test]
async fn test_failing_response_validator_marks_response_invalid() {
    let atom = atom_with(transport_returning(1, 200, json!({"v": "nope"})));
    create_api(
        &atom,
        "thing",
        EndpointDefinition::get("/x")
            .validate_response(|raw| raw.body["v"].is_number())
            .map("onCode200", "thing.data", |res| json!(res.is_valid)),
    );

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(envelope(&atom, "api1")["isValid"], json!(false));
    assert_eq!(atom.get("thing.data"), Some(json!(false)));
}

#[tokio::test]
async fn test_offline_requests_wait_until_online() {
    let mut settings = settings();
    settings.api.initially_online = false;
    let atom = MockBuilder::new()
        .with_settings(settings)
        .with_transport(transport_returning(1, 200, json!({"v": 1})))
        .build_atom();
    atom.init().unwrap();
    create_api(&atom, "thing", EndpointDefinition::get("/x"));

    atom.send("thing", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();
    assert!(!atom.is_online());
    assert_eq!(atom.inner.queue.lock().len(), 1);
    assert_eq!(envelope(&atom, "api1"), Value::Null);

    atom.set_online(true).unwrap();
    atom.run_until_idle().await.unwrap();
    assert_eq!(envelope(&atom, "api1")["raw"]["status"], json!(200));
}

#[tokio::test]
async fn test_cancel_queued_request_never_reaches_transport() {
    let mut settings = settings();
    settings.api.initially_online = false;
    let atom = MockBuilder::new().with_settings(settings).build_atom();
    create_api(&atom, "thing", EndpointDefinition::get("/x"));

    let id = atom.send("thing", CallArgs::default()).unwrap();
    assert!(atom.cancel(&id));
    atom.set_online(true).unwrap();
    atom.run_until_idle().await.unwrap();

    assert!(atom.inner.queue.lock().is_empty());
    assert!(!atom.cancel(&id));
}

#[tokio::test]
async fn test_cancel_in_flight_request_releases_it() {
    let transport = Arc::new(PendingTransport::default());
    let mut settings = settings();
    settings.api.request_timeout_in_ms = 0;
    let atom = MockBuilder::new()
        .with_settings(settings)
        .with_shared_transport(transport.clone())
        .build_atom();
    create_api(
        &atom,
        "slow",
        EndpointDefinition::get("/slow")
            .flag("sending", "slow.loading")
            .map("onError", "slow.error", |res| json!(res.error_message)),
    );

    let id = atom.send("slow", CallArgs::default()).unwrap();
    atom.watch(
        WatchSpec::new(["slow.loading"])
            .validate("slow.loading", validators::is_true)
            .callback(move |atom| {
                atom.cancel(&id);
            }),
    )
    .unwrap();
    atom.run_until_idle().await.unwrap();

    assert!(transport.calls() <= 1);
    assert_eq!(atom.get("slow.error"), Some(json!("Request cancelled")));
    assert_eq!(atom.get("slow.loading"), Some(json!(false)));
    assert!(atom.inner.queue.lock().is_empty());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_timeout_resolves_stuck_request() {
    let transport = Arc::new(PendingTransport::default());
    let mut settings = settings();
    settings.api.request_timeout_in_ms = 1_000;
    let atom = MockBuilder::new()
        .with_settings(settings)
        .with_shared_transport(transport.clone())
        .build_atom();
    create_api(&atom, "slow", EndpointDefinition::get("/slow").flag("sending", "slow.loading"));

    let calls = recorder();
    atom.watch(WatchSpec::new(["slow.loading"]).callback(record_value(&calls, "slow.loading")))
        .unwrap();

    atom.send("slow", CallArgs::default()).unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(recorded(&calls), vec!["true", "false"]);
    assert_eq!(
        envelope(&atom, "api1")["errorMessage"],
        json!("Request timed out after 1000 ms")
    );
    assert!(logs_contain("transport failure"));
}

#[tokio::test]
async fn test_send_unknown_endpoint_fails() {
    let atom = MockBuilder::new().build_atom();
    let e = atom.send("nope", CallArgs::default()).unwrap_err();
    assert!(matches!(
        e,
        Error::Registration(RegistrationError::UnknownDefinition { kind: "api", .. })
    ));
}

#[tokio::test]
async fn test_on_change_sends_request() {
    let atom = atom_with(transport_returning(1, 200, json!({"name": "ana"})));
    create_api(
        &atom,
        "profile",
        EndpointDefinition::get("/profile")
            .query(json!({"jwt": "#user.jwt"}))
            .on_change(crate::OnChange::new(["user.jwt"]).when("user.jwt", validators::is_string))
            .map("onCode200", "user.profile", |res| res.raw.body.clone()),
    );

    atom.set("user.jwt", 1).unwrap();
    atom.run_until_idle().await.unwrap();
    assert_eq!(atom.get("user.profile"), None);

    atom.set("user.jwt", "t").unwrap();
    atom.run_until_idle().await.unwrap();
    assert_eq!(atom.get("user.profile"), Some(json!({"name": "ana"})));
    assert_eq!(atom.get("api.__requests.api1.request.path"), Some(json!("/profile?jwt=t")));
}
