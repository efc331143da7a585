use atom_engine::validators;
use atom_engine::Atom;
use atom_engine::CallArgs;
use atom_engine::Definition;
use atom_engine::EndpointDefinition;
use atom_engine::GetterDefinition;
use atom_engine::OnChange;
use atom_engine::RouterDefinition;
use atom_engine::WatcherDefinition;
use serde_json::json;
use serde_json::Value;

use crate::commons::test_settings;
use crate::commons::FixtureTransport;

fn define_profile(atom: &Atom) {
    atom.create(
        "user.profile",
        Definition::Router(RouterDefinition::new("/profile/:userId", "user.profile.route")),
    )
    .unwrap();

    atom.create(
        "user.profile.navigate",
        Definition::Watcher(
            WatcherDefinition::new(OnChange::new(["user.jwt", "user.profile.route"]), |atom, args| {
                let signed_out = validators::is_empty(&args[0]);
                let on_profile = args[1]["isActive"] == json!(true);
                if signed_out && on_profile {
                    atom.navigate("/").unwrap();
                }
            })
            .from(json!(["#user.jwt", "#user.profile.route"])),
        ),
    )
    .unwrap();

    atom.create(
        "user.profile",
        Definition::Getter(GetterDefinition::new(json!(["#user.profile.data"])).run(|args| {
            let prop = args.get(1).and_then(Value::as_str).unwrap_or_default();
            args[0].get(prop).cloned().unwrap_or(json!(""))
        })),
    )
    .unwrap();

    atom.create(
        "user.profile",
        Definition::Api(
            EndpointDefinition::get("/profile.json")
                .query(json!({"jwt": "#user.jwt"}))
                .on_change(
                    OnChange::new(["user.jwt"])
                        .when("user.jwt", validators::is_not_empty)
                        .when("user.jwt", validators::is_string),
                )
                .map("onCode200", "user.profile.data", |res| res.raw.body["user"].clone())
                .flag("sending", "user.profile.api.sending"),
        ),
    )
    .unwrap();
}

#[tokio::test]
async fn test_login_loads_profile_through_on_change() {
    let transport = FixtureTransport::new()
        .route("/profile.json?jwt=secret", 200, json!({"user": {"name": "Ana"}}))
        .shared();
    let atom = Atom::new(test_settings(), transport.clone());
    define_profile(&atom);
    atom.init().unwrap();
    atom.run_until_idle().await.unwrap();
    assert!(transport.urls().is_empty());

    atom.set("user.jwt", "secret").unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(transport.urls(), vec!["https://fixture.test/profile.json?jwt=secret"]);
    assert_eq!(atom.get("user.profile.data"), Some(json!({"name": "Ana"})));
    assert_eq!(atom.get("user.profile.api.sending"), Some(json!(false)));
    assert_eq!(atom.getter("user.profile", vec![json!("name")]), Some(json!("Ana")));
    assert_eq!(atom.getter("user.profile", vec![json!("age")]), Some(json!("")));
    assert_eq!(
        atom.get("api.__requests.api1.response.handler"),
        Some(json!("onCode200"))
    );
}

#[tokio::test]
async fn test_profile_route_without_session_redirects_home() {
    let transport = FixtureTransport::new().shared();
    let atom = Atom::new(test_settings(), transport.clone());
    define_profile(&atom);
    atom.init().unwrap();

    atom.navigate("/profile/42").unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(atom.location().map(|l| l.pathname), Some("/".to_string()));
    assert_eq!(
        atom.get("user.profile.route"),
        Some(json!({"isActive": false, "params": {}}))
    );
    assert_eq!(atom.get("app.router.notFound"), Some(json!(true)));
    assert!(transport.urls().is_empty());
}

#[tokio::test]
async fn test_profile_route_with_session_stays() {
    let transport = FixtureTransport::new()
        .route("/profile.json?jwt=secret", 200, json!({"user": {"name": "Ana"}}))
        .shared();
    let atom = Atom::new(test_settings(), transport.clone());
    define_profile(&atom);
    atom.init().unwrap();
    atom.set("user.jwt", "secret").unwrap();

    atom.navigate("/profile/42").unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(
        atom.get("user.profile.route"),
        Some(json!({"isActive": true, "params": {"userId": "42"}}))
    );
    assert_eq!(atom.get("user.profile.data.name"), Some(json!("Ana")));
}

#[tokio::test]
async fn test_second_login_hits_cache() {
    let transport = FixtureTransport::new()
        .route("/profile.json?jwt=secret", 200, json!({"user": {"name": "Ana"}}))
        .shared();
    let atom = Atom::new(test_settings(), transport.clone());
    define_profile(&atom);
    atom.init().unwrap();

    atom.set("user.jwt", "secret").unwrap();
    atom.run_until_idle().await.unwrap();
    atom.set("user.jwt", "").unwrap();
    atom.run_until_idle().await.unwrap();
    atom.set("user.jwt", "secret").unwrap();
    atom.run_until_idle().await.unwrap();

    assert_eq!(transport.urls().len(), 1);
    assert_eq!(
        atom.get("api.__requests.api2.response"),
        atom.get("api.__requests.api1.response")
    );
}

#[tokio::test]
async fn test_manual_send_with_call_args() {
    let transport = FixtureTransport::new()
        .route("/profile.json?jwt=other", 200, json!({"user": {"name": "Bo"}}))
        .shared();
    let atom = Atom::new(test_settings(), transport.clone());
    define_profile(&atom);

    atom.send("user.profile", CallArgs::new().query(json!({"jwt": "other"})))
        .unwrap();
    atom.run_until_idle().await.unwrap();
    assert_eq!(atom.get("user.profile.data.name"), Some(json!("Bo")));
}
