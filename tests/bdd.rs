use std::{collections::HashMap, fmt, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use cucumber::{given, then, when, World as _};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;
use whereto::{
    auth::{self, AuthenticatedUser},
    config::{AppConfig, DEFAULT_TILE_URL},
    db::{init_pool, run_migrations},
    models::trip::{start_of_day, TripInput},
    routes::create_router,
    error::AppError,
    services::{
        mail::MemoryMailer,
        summary::{self, ProfileSummary},
        users::{EMAIL_TAKEN, USERNAME_TAKEN},
    },
    state::AppState,
    validation::{self, FieldError},
};

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    registration: Option<Result<AuthenticatedUser, FieldError>>,
    summary: Option<ProfileSummary>,
    import_error: Option<FieldError>,
    response: Option<TestResponse>,
    session_cookie: Option<String>,
    export: Option<serde_json::Value>,
}

#[derive(Debug)]
struct TestResponse {
    status: StatusCode,
    location: Option<String>,
    set_cookie: Option<String>,
    body: String,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        &self
            .state
            .as_ref()
            .expect("state must be initialised first")
            .app
    }

    fn mailer(&self) -> &MemoryMailer {
        &self
            .state
            .as_ref()
            .expect("state must be initialised first")
            .mailer
    }

    fn user(&self, username: &str) -> &AuthenticatedUser {
        self.users
            .get(username)
            .unwrap_or_else(|| panic!("user {username} must be registered first"))
    }

    fn summary(&self) -> &ProfileSummary {
        self.summary.as_ref().expect("a profile must be viewed first")
    }

    fn response(&self) -> &TestResponse {
        self.response.as_ref().expect("a page must be requested first")
    }
}

struct TestState {
    app: AppState,
    mailer: MemoryMailer,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            public_url: Url::parse("http://localhost:3000")?,
            map_tile_url: DEFAULT_TILE_URL.into(),
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let mailer = MemoryMailer::new();
        let app = AppState::new(config, db, Arc::new(mailer.clone()));
        Ok(Self {
            app,
            mailer,
            _root: root,
        })
    }
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("dates are written as YYYY-MM-DD")
}

fn midday(raw: &str) -> DateTime<Utc> {
    start_of_day(date(raw)) + Duration::hours(12)
}

fn trip_input(destination: &str, country: &str, from: &str, to: &str) -> TripInput {
    TripInput {
        destination: destination.into(),
        country: country.into(),
        description: String::new(),
        from: date(from),
        to: date(to),
        lat: 48.85,
        long: 2.35,
        flights: 1,
        secret: false,
        hide_upcoming: false,
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.registration = None;
    world.summary = None;
    world.import_error = None;
    world.response = None;
    world.session_cookie = None;
    world.export = None;
}

#[given(
    regex = r#"^a registered user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I register a user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I try to register a user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn when_try_register(world: &mut AppWorld, username: String, email: String, password: String) {
    let outcome = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("registration should not fail internally");
    world.registration = Some(outcome);
}

#[then(regex = r#"^the registration is rejected on "([^"]+)"$"#)]
async fn then_registration_rejected(world: &mut AppWorld, field: String) {
    match world.registration.as_ref().expect("a registration must be attempted") {
        Ok(user) => panic!("registration unexpectedly succeeded for {}", user.username),
        Err(err) => assert_eq!(err.field, field, "unexpected error: {}", err.message),
    }
}

#[then(regex = r#"^I can authenticate as "([^"]+)" using password "([^"]+)"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, email: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &email, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.email, email);
}

#[then(regex = r#"^authenticating as "([^"]+)" with password "([^"]+)" fails$"#)]
async fn then_cannot_authenticate(world: &mut AppWorld, email: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &email, &password).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[given(regex = r#"^"([^"]+)" has a trip to "([^"]+)" in "([^"]+)" from "([^"]+)" to "([^"]+)"$"#)]
async fn given_trip(
    world: &mut AppWorld,
    username: String,
    destination: String,
    country: String,
    from: String,
    to: String,
) {
    store_trip(world, &username, trip_input(&destination, &country, &from, &to)).await;
}

#[given(
    regex = r#"^"([^"]+)" has a secret trip to "([^"]+)" in "([^"]+)" from "([^"]+)" to "([^"]+)"$"#
)]
async fn given_secret_trip(
    world: &mut AppWorld,
    username: String,
    destination: String,
    country: String,
    from: String,
    to: String,
) {
    let mut input = trip_input(&destination, &country, &from, &to);
    input.secret = true;
    store_trip(world, &username, input).await;
}

#[given(
    regex = r#"^"([^"]+)" has a trip to "([^"]+)" in "([^"]+)" from "([^"]+)" to "([^"]+)" hidden until over$"#
)]
async fn given_hidden_trip(
    world: &mut AppWorld,
    username: String,
    destination: String,
    country: String,
    from: String,
    to: String,
) {
    let mut input = trip_input(&destination, &country, &from, &to);
    input.hide_upcoming = true;
    store_trip(world, &username, input).await;
}

#[when(regex = r#"^a visitor views the profile of "([^"]+)" as of "([^"]+)"$"#)]
async fn when_visitor_views(world: &mut AppWorld, username: String, as_of: String) {
    view_profile(world, &username, false, midday(&as_of)).await;
}

#[when(regex = r#"^the owner views the profile of "([^"]+)" as of "([^"]+)"$"#)]
async fn when_owner_views(world: &mut AppWorld, username: String, as_of: String) {
    view_profile(world, &username, true, midday(&as_of)).await;
}

#[then(regex = r"^the profile lists (\d+) trips$")]
async fn then_profile_lists(world: &mut AppWorld, expected: usize) {
    assert_eq!(world.summary().trips.len(), expected);
}

#[then(regex = r"^the totals are (\d+) trips, (\d+) destinations and (\d+) countries$")]
async fn then_totals(world: &mut AppWorld, trips: usize, destinations: usize, countries: usize) {
    let totals = world.summary().totals;
    assert_eq!(
        (totals.trips, totals.destinations, totals.countries),
        (trips, destinations, countries)
    );
}

#[then("there is no next trip")]
async fn then_no_next_trip(world: &mut AppWorld) {
    assert!(world.summary().next_trip.is_none());
}

#[then(regex = r#"^the next trip is "([^"]+)" starting "([^"]+)"$"#)]
async fn then_next_trip(world: &mut AppWorld, destination: String, from: String) {
    let next = world
        .summary()
        .next_trip
        .as_ref()
        .expect("a next trip is expected");
    assert_eq!(next.trip.destination, destination);
    assert_eq!(next.trip.from, date(&from));
}

#[then(regex = r"^(\d+) listed trips are marked upcoming$")]
async fn then_upcoming_count(world: &mut AppWorld, expected: usize) {
    let upcoming = world
        .summary()
        .trips
        .iter()
        .filter(|view| view.is_future)
        .count();
    assert_eq!(upcoming, expected);
}

#[then(regex = r#"^the trips of "([^"]+)" are listed as "([^"]*)"$"#)]
async fn then_trips_listed(world: &mut AppWorld, username: String, expected: String) {
    let user_id = world.user(&username).id.clone();
    let trips = world
        .app_state()
        .trips
        .list_for_user(&user_id)
        .await
        .expect("list trips");
    let listed = trips
        .iter()
        .map(|trip| trip.destination.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    assert_eq!(listed, expected);
}

#[when(regex = r#"^"([^"]+)" imports (\d+) valid trips and (\d+) invalid trips$"#)]
async fn when_import(world: &mut AppWorld, username: String, valid: usize, invalid: usize) {
    let mut entries = Vec::new();
    for index in 0..valid {
        entries.push(serde_json::json!({
            "destination": format!("Place {index}"),
            "country": "DE",
            "from": "2022-01-01",
            "to": "2022-01-02",
            "description": "",
            "flights": 0,
            "lat": 52.51,
            "long": 13.40,
        }));
    }
    for _ in 0..invalid {
        entries.push(serde_json::json!({
            "destination": "Nowhere",
            "country": "DE",
            "from": "2022-01-01",
            "to": "2022-01-02",
            "description": "",
            "flights": 0,
            "lat": 123.0,
            "long": 13.40,
        }));
    }
    let raw = serde_json::to_string(&entries).expect("serialize import");

    let user_id = world.user(&username).id.clone();
    match validation::parse_import(&raw) {
        Ok(inputs) => {
            world
                .app_state()
                .trips
                .import(&user_id, &inputs)
                .await
                .expect("import trips");
            world.import_error = None;
        }
        Err(err) => world.import_error = Some(err),
    }
}

#[then("the import succeeds")]
async fn then_import_succeeds(world: &mut AppWorld) {
    assert!(world.import_error.is_none(), "{:?}", world.import_error);
}

#[then("the import is rejected")]
async fn then_import_rejected(world: &mut AppWorld) {
    let err = world.import_error.as_ref().expect("import should fail");
    assert_eq!(err.field, "json");
}

#[then(regex = r#"^"([^"]+)" has (\d+) stored trips$"#)]
async fn then_stored_trips(world: &mut AppWorld, username: String, expected: usize) {
    let user_id = world.user(&username).id.clone();
    let trips = world
        .app_state()
        .trips
        .list_for_user(&user_id)
        .await
        .expect("list trips");
    assert_eq!(trips.len(), expected);
}

#[when(regex = r#"^"([^"]+)" tries to delete the latest trip of "([^"]+)"$"#)]
async fn when_delete_trip(world: &mut AppWorld, actor: String, owner: String) {
    let owner_id = world.user(&owner).id.clone();
    let actor_id = world.user(&actor).id.clone();
    let trips = world
        .app_state()
        .trips
        .list_for_user(&owner_id)
        .await
        .expect("list trips");
    let trip = trips.first().expect("owner has a trip");
    world
        .app_state()
        .trips
        .delete(&actor_id, &trip.id)
        .await
        .expect("delete trip");
}

#[when(regex = r#"^"([^"]+)" renames the latest trip to "([^"]+)"$"#)]
async fn when_rename_trip(world: &mut AppWorld, username: String, destination: String) {
    let user_id = world.user(&username).id.clone();
    let trips = world
        .app_state()
        .trips
        .list_for_user(&user_id)
        .await
        .expect("list trips");
    let trip = trips.first().expect("user has a trip");
    let mut input = trip_input(
        &destination,
        &trip.country,
        &trip.from_display(),
        &trip.to_display(),
    );
    input.description = trip.description.clone();
    let updated = world
        .app_state()
        .trips
        .update(&user_id, &trip.id, &input)
        .await
        .expect("update trip")
        .expect("trip exists");
    assert_eq!(updated.id, trip.id);
    assert_eq!(updated.created_at, trip.created_at);
}

#[when(regex = r#"^"([^"]+)" deletes the account$"#)]
async fn when_delete_account(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id.clone();
    let state = world.app_state();
    let user = state
        .users
        .find_by_id(&user_id)
        .await
        .expect("load user")
        .expect("user exists");
    state.users.delete(&user).await.expect("delete user");
}

#[then(regex = r"^there are (\d+) users and (\d+) trips stored$")]
async fn then_counts(world: &mut AppWorld, users: i64, trips: i64) {
    let state = world.app_state();
    assert_eq!(state.users.count().await.expect("count users"), users);
    assert_eq!(state.trips.count().await.expect("count trips"), trips);
}

#[when(regex = r#"^a password reset is requested for "([^"]+)"$"#)]
async fn when_reset_requested(world: &mut AppWorld, email: String) {
    world
        .app_state()
        .resets
        .request(&email)
        .await
        .expect("request reset");
}

#[then(regex = r"^(\d+) reset mails have been sent$")]
async fn then_reset_mails(world: &mut AppWorld, expected: usize) {
    assert_eq!(world.mailer().sent().len(), expected);
}

#[when(regex = r#"^the emailed token is redeemed with password "([^"]+)"$"#)]
async fn when_token_redeemed(world: &mut AppWorld, password: String) {
    let token = emailed_token(world);
    let redeemed = world
        .app_state()
        .resets
        .redeem(&token, &password)
        .await
        .expect("redeem token");
    assert!(redeemed);
}

#[then("the emailed token can not be redeemed again")]
async fn then_token_spent(world: &mut AppWorld) {
    let token = emailed_token(world);
    let redeemed = world
        .app_state()
        .resets
        .redeem(&token, "anotherpassword")
        .await
        .expect("redeem token");
    assert!(!redeemed);
}

#[when(regex = r#"^an anonymous visitor requests "([^"]+)"$"#)]
async fn when_anonymous_request(world: &mut AppWorld, path: String) {
    send(world, get_request(&path, None)).await;
}

#[when(regex = r#"^an anonymous visitor posts "([^"]*)" to "([^"]+)"$"#)]
async fn when_anonymous_post(world: &mut AppWorld, body: String, path: String) {
    send(world, post_request(&path, body, None)).await;
}

#[when(regex = r#"^the signed-in visitor requests "([^"]+)"$"#)]
async fn when_signed_in_request(world: &mut AppWorld, path: String) {
    let cookie = world.session_cookie.clone();
    assert!(cookie.is_some(), "a user must log in first");
    send(world, get_request(&path, cookie.as_deref())).await;
}

#[when(regex = r#"^the signed-in visitor posts "([^"]*)" to "([^"]+)"$"#)]
async fn when_signed_in_post(world: &mut AppWorld, body: String, path: String) {
    let cookie = world.session_cookie.clone();
    assert!(cookie.is_some(), "a user must log in first");
    send(world, post_request(&path, body, cookie.as_deref())).await;
}

#[when(regex = r#"^"([^"]+)" logs in with password "([^"]+)"$"#)]
async fn when_log_in(world: &mut AppWorld, username: String, password: String) {
    log_in(world, &username, &password, false).await;
}

#[when(regex = r#"^"([^"]+)" logs in with password "([^"]+)" and asks to be remembered$"#)]
async fn when_log_in_remembered(world: &mut AppWorld, username: String, password: String) {
    log_in(world, &username, &password, true).await;
}

async fn log_in(world: &mut AppWorld, username: &str, password: &str, remember: bool) {
    let email = world.user(username).email.clone();
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("email", &email);
    form.append_pair("password", password);
    if remember {
        form.append_pair("remember", "on");
    }
    send(world, post_request("/login", form.finish(), None)).await;

    let set_cookie = world
        .response()
        .set_cookie
        .clone()
        .expect("a successful login sets the session cookie");
    let pair = set_cookie
        .split(';')
        .next()
        .expect("cookie has a name and value")
        .trim()
        .to_string();
    world.session_cookie = Some(pair);
}

#[then("the session cookie lasts for the browser session")]
async fn then_cookie_transient(world: &mut AppWorld) {
    let set_cookie = world.response().set_cookie.as_deref().expect("a session cookie");
    assert!(set_cookie.starts_with(auth::SESSION_COOKIE));
    assert!(!set_cookie.contains("Max-Age="), "{set_cookie}");
    assert!(!set_cookie.contains("Expires="), "{set_cookie}");
}

#[then("the session cookie outlives the browser session")]
async fn then_cookie_persistent(world: &mut AppWorld) {
    let set_cookie = world.response().set_cookie.as_deref().expect("a session cookie");
    assert!(set_cookie.starts_with(auth::SESSION_COOKIE));
    assert!(set_cookie.contains("Max-Age="), "{set_cookie}");
}

#[given("every stored session has expired")]
async fn given_sessions_expired(world: &mut AppWorld) {
    sqlx::query("UPDATE sessions SET expires_at = ?1")
        .bind(Utc::now() - Duration::days(1))
        .execute(&world.app_state().db)
        .await
        .expect("expire sessions");
}

#[given(regex = r#"^"([^"]+)" has a session that expired yesterday$"#)]
async fn given_stale_session(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id.clone();
    let now = Utc::now();
    sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now - Duration::days(8))
        .bind(now - Duration::days(1))
        .execute(&world.app_state().db)
        .await
        .expect("insert stale session");
}

#[then(regex = r"^there are (\d+) sessions stored$")]
async fn then_session_count(world: &mut AppWorld, expected: i64) {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&world.app_state().db)
        .await
        .expect("count sessions");
    assert_eq!(count, expected);
}

#[given(regex = r"^the emailed reset link was issued (\d+) minutes ago$")]
async fn given_reset_issued_ago(world: &mut AppWorld, minutes: i64) {
    sqlx::query("UPDATE password_resets SET created_at = ?1")
        .bind(Utc::now() - Duration::minutes(minutes))
        .execute(&world.app_state().db)
        .await
        .expect("backdate reset tokens");
}

#[then("the emailed token is rejected")]
async fn then_token_rejected(world: &mut AppWorld) {
    let token = emailed_token(world);
    let resets = &world.app_state().resets;
    assert!(!resets.is_valid(&token).await.expect("check token"));
    assert!(!resets
        .redeem(&token, "anotherpassword")
        .await
        .expect("redeem token"));
}

#[then("the emailed token is still valid")]
async fn then_token_valid(world: &mut AppWorld) {
    let token = emailed_token(world);
    assert!(world
        .app_state()
        .resets
        .is_valid(&token)
        .await
        .expect("check token"));
}

#[then(regex = r#"^the response is an export of "([^"]+)" for "([^"]+)" with (\d+) trips$"#)]
async fn then_export_body(world: &mut AppWorld, username: String, email: String, trips: usize) {
    let response = world.response();
    assert_eq!(response.status, StatusCode::OK);
    let export: serde_json::Value =
        serde_json::from_str(&response.body).expect("export is json");
    assert_eq!(export["username"], username.as_str());
    assert_eq!(export["email"], email.as_str());
    let listed = export["trips"].as_array().expect("trips is an array");
    assert_eq!(listed.len(), trips);
    for trip in listed {
        assert!(trip["from"].is_string() && trip["hideUpcoming"].is_boolean());
    }
    world.export = Some(export);
}

#[when("the signed-in visitor imports the trips of that export")]
async fn when_import_export(world: &mut AppWorld) {
    let export = world.export.as_ref().expect("an export must be downloaded first");
    let raw = serde_json::to_string(&export["trips"]).expect("serialize trips");
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("json", &raw);
    let body = form.finish();
    let cookie = world.session_cookie.clone();
    send(world, post_request("/trips/import", body, cookie.as_deref())).await;
}

#[then(regex = r#"^storing another user "([^"]+)" with email "([^"]+)" is refused as taken (email|username)$"#)]
async fn then_duplicate_insert_refused(
    world: &mut AppWorld,
    username: String,
    email: String,
    field: String,
) {
    let expected = if field == "email" { EMAIL_TAKEN } else { USERNAME_TAKEN };
    let result = world
        .app_state()
        .users
        .create(&email, &username, "not-a-real-hash")
        .await;
    match result {
        Err(AppError::BadRequest(message)) => assert_eq!(message, expected),
        other => panic!("expected a taken {field} error, got {other:?}"),
    }
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, expected: u16) {
    assert_eq!(world.response().status.as_u16(), expected);
}

#[then(regex = r#"^the response redirects to "([^"]+)"$"#)]
async fn then_redirects(world: &mut AppWorld, expected: String) {
    let response = world.response();
    assert!(response.status.is_redirection(), "status {}", response.status);
    assert_eq!(response.location.as_deref(), Some(expected.as_str()));
}

#[then(regex = r#"^the response body contains "([^"]+)"$"#)]
async fn then_body_contains(world: &mut AppWorld, needle: String) {
    assert!(world.response().body.contains(&needle));
}

#[then(regex = r#"^the response body does not contain "([^"]+)"$"#)]
async fn then_body_lacks(world: &mut AppWorld, needle: String) {
    assert!(!world.response().body.contains(&needle));
}

fn get_request(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

fn post_request(path: &str, body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).expect("valid request")
}

async fn send(world: &mut AppWorld, request: Request<Body>) {
    let router = create_router(world.app_state().clone());
    let response = router.oneshot(request).await.expect("router is infallible");

    let status = response.status();
    let header_text = |name: header::HeaderName| {
        response
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(String::from)
            .collect::<Vec<_>>()
    };
    let location = header_text(header::LOCATION).into_iter().next();
    let set_cookie = header_text(header::SET_COOKIE)
        .into_iter()
        .find(|value| value.starts_with(auth::SESSION_COOKIE));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    world.response = Some(TestResponse {
        status,
        location,
        set_cookie,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });
}

async fn register_user(world: &mut AppWorld, username: String, email: String, password: String) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user")
        .expect("registration is valid");
    world.users.insert(username, created);
}

async fn store_trip(world: &mut AppWorld, username: &str, input: TripInput) {
    let user_id = world.user(username).id.clone();
    world
        .app_state()
        .trips
        .create(&user_id, &input)
        .await
        .expect("create trip");
}

async fn view_profile(world: &mut AppWorld, username: &str, owner: bool, now: DateTime<Utc>) {
    let user_id = world.user(username).id.clone();
    let trips = world
        .app_state()
        .trips
        .list_for_user(&user_id)
        .await
        .expect("list trips");
    world.summary = Some(summary::summarize(trips, owner, now));
}

fn emailed_token(world: &AppWorld) -> String {
    let mail = world
        .mailer()
        .sent()
        .pop()
        .expect("a reset mail must have been sent");
    let link = mail
        .body
        .split_whitespace()
        .find(|word| word.contains("/password/change?token="))
        .expect("mail contains a reset link");
    let url = Url::parse(link).expect("reset link is a url");
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .expect("reset link carries a token")
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
