//! End-to-end account flows driven through the router.

use axum::http::{header, StatusCode};
use portal_backend_lib::storage::AccountStorage;

use crate::test_utils::{
    encode, location, login_body, register_body, setup_test_env, TestClient, GOOD_PASSWORD,
};

async fn register_and_login(client: &mut TestClient, email: &str) {
    let response = client
        .post_form("/auth/register", &register_body(email, GOOD_PASSWORD, GOOD_PASSWORD))
        .await;
    assert_eq!(location(&response), "/auth/login");

    let response = client.post_form("/auth/login", &login_body(email, GOOD_PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_register_login_logout_round() {
    let (state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    let response = client
        .post_form(
            "/auth/register",
            &register_body("Jane@Example.com", GOOD_PASSWORD, GOOD_PASSWORD),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
    assert!(client.cookie("portal_session").is_none(), "registration must not sign in");

    let page = client.page("/auth/login").await;
    assert_eq!(page.title, "Login");
    assert_eq!(page.success, vec!["Registration successful! Please log in."]);

    let response = client
        .post_form("/auth/login", &login_body("jane@example.com", GOOD_PASSWORD))
        .await;
    assert_eq!(location(&response), "/");
    let session_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("portal_session="))
        .expect("session cookie");
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("SameSite=Lax"));
    assert!(session_cookie.contains("Max-Age=604800"));
    assert_eq!(state.sessions.len(), 1);

    let page = client.page("/").await;
    assert_eq!(page.title, "Dashboard");
    assert_eq!(page.success, vec!["Login successful! Welcome back."]);
    let user = page.current_user.expect("signed in");
    assert_eq!(user.email, "jane@example.com");

    let response = client.get("/auth/logout").await;
    assert_eq!(location(&response), "/auth/login");
    assert!(client.cookie("portal_session").is_none());
    assert!(state.sessions.is_empty());

    let response = client.get("/dashboard").await;
    assert_eq!(location(&response), "/auth/login");
    let page = client.page("/auth/login").await;
    assert_eq!(page.error, vec!["Please log in to access this page"]);
    assert!(page.current_user.is_none());
}

#[tokio::test]
async fn test_sixth_login_attempt_is_throttled() {
    let (state, app) = setup_test_env();
    let mut client = TestClient::new(app.clone());
    register_and_login(&mut client, "victim@test.com").await;

    let mut attacker = TestClient::from_addr(app.clone(), "198.51.100.7:6000");
    for _ in 0..5 {
        let response = attacker
            .post_form("/auth/login", &login_body("victim@test.com", "Wrong123!"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    }

    // Even the right password is refused once the window is spent
    let response = attacker
        .post_form("/auth/login", &login_body("victim@test.com", GOOD_PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 15 * 60);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "RATE_001");
    assert_eq!(
        body["error"]["message"],
        "Too many login attempts. Please try again after 15 minutes."
    );
    assert_eq!(state.sessions.len(), 1);

    // Other clients are unaffected
    let mut bystander = TestClient::from_addr(app, "192.0.2.44:7000");
    let response = bystander
        .post_form("/auth/login", &login_body("victim@test.com", GOOD_PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_fourth_registration_is_throttled() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    for n in 0..3 {
        let email = format!("user{n}@test.com");
        let response = client
            .post_form("/auth/register", &register_body(&email, GOOD_PASSWORD, GOOD_PASSWORD))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    let response = client
        .post_form(
            "/auth/register",
            &register_body("user3@test.com", GOOD_PASSWORD, GOOD_PASSWORD),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body["error"]["message"],
        "Too many registration attempts. Please try again after an hour."
    );
}

#[tokio::test]
async fn test_duplicate_registration_is_a_conflict() {
    let (state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    client
        .post_form("/auth/register", &register_body("dup@test.com", GOOD_PASSWORD, GOOD_PASSWORD))
        .await;
    client.page("/auth/login").await;

    let response = client
        .post_form("/auth/register", &register_body("DUP@test.com", GOOD_PASSWORD, GOOD_PASSWORD))
        .await;
    assert_eq!(location(&response), "/auth/register");

    let page = client.page("/auth/register").await;
    assert_eq!(page.title, "Register");
    assert_eq!(page.error, vec!["An account with this email already exists"]);
    assert_eq!(state.storage.len(), 1);
}

#[tokio::test]
async fn test_validation_messages_reach_the_next_page() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    client
        .post_form("/auth/register", &register_body("a@test.com", "weakpass", "weakpass"))
        .await;
    let page = client.page("/auth/register").await;
    assert_eq!(page.error.len(), 1);
    assert!(page.error[0].starts_with("Password must be at least 8 characters long"));

    // An empty body counts as an empty form
    client.post_form("/auth/login", "").await;
    let page = client.page("/auth/login").await;
    assert_eq!(page.error, vec!["Please provide both email and password"]);

    // Shown exactly once
    let page = client.page("/auth/login").await;
    assert!(page.error.is_empty() && page.success.is_empty());
}

#[tokio::test]
async fn test_signed_in_user_is_kept_off_guest_pages() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);
    register_and_login(&mut client, "member@test.com").await;

    for path in ["/auth/login", "/auth/register"] {
        let response = client.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    // Notices survive the redirects, oldest first
    let page = client.page("/").await;
    assert_eq!(
        page.success,
        vec!["Registration successful! Please log in.", "Login successful! Welcome back."]
    );
}

#[tokio::test]
async fn test_pending_notice_survives_a_form_post() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    client
        .post_form("/auth/register", &register_body("p@test.com", GOOD_PASSWORD, GOOD_PASSWORD))
        .await;
    // Straight to the login POST without rendering the registration notice
    let response = client.post_form("/auth/login", &login_body("p@test.com", GOOD_PASSWORD)).await;
    assert_eq!(location(&response), "/");

    let page = client.page("/").await;
    assert_eq!(
        page.success,
        vec!["Registration successful! Please log in.", "Login successful! Welcome back."]
    );
    assert!(client.page("/").await.success.is_empty());
}

#[tokio::test]
async fn test_tampered_session_cookie_is_ignored() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);
    register_and_login(&mut client, "member@test.com").await;

    let genuine = client.cookie("portal_session").unwrap().to_string();
    let (token, _signature) = genuine.rsplit_once('.').unwrap();
    client.set_cookie("portal_session", &format!("{token}.AAAA"));

    let response = client.get("/").await;
    assert_eq!(location(&response), "/auth/login");

    client.set_cookie("portal_session", &genuine);
    assert!(client.page("/").await.current_user.is_some());
}

#[tokio::test]
async fn test_vanished_account_ends_the_session() {
    let (state, app) = setup_test_env();
    let mut client = TestClient::new(app);
    register_and_login(&mut client, "ghost@test.com").await;

    let account = state.storage.find_by_email("ghost@test.com").await.unwrap().unwrap();
    state.storage.remove(account.id);

    let response = client.get("/account/settings").await;
    assert_eq!(location(&response), "/auth/login");
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_change_password() {
    let (state, app) = setup_test_env();
    let mut client = TestClient::new(app.clone());
    register_and_login(&mut client, "pw@test.com").await;
    client.page("/").await;

    let body = |current: &str, new: &str, confirm: &str| {
        format!(
            "currentPassword={}&newPassword={}&confirmPassword={}",
            encode(current),
            encode(new),
            encode(confirm)
        )
    };

    let response = client
        .post_form("/account/password", &body("Nope123!", "Wxyz987$", "Wxyz987$"))
        .await;
    assert_eq!(location(&response), "/account/settings");
    let page = client.page("/account/settings").await;
    assert_eq!(page.title, "Account Settings");
    assert_eq!(page.error, vec!["Current password is incorrect"]);

    client
        .post_form("/account/password", &body(GOOD_PASSWORD, "Wxyz987$", "Wxyz987%"))
        .await;
    let page = client.page("/account/settings").await;
    assert_eq!(page.error, vec!["New passwords do not match"]);

    client
        .post_form("/account/password", &body(GOOD_PASSWORD, "Wxyz987$", "Wxyz987$"))
        .await;
    let page = client.page("/account/settings").await;
    assert_eq!(page.success, vec!["Password changed successfully"]);

    // The current session survives; a fresh login needs the new password
    assert_eq!(state.sessions.len(), 1);
    let mut other = TestClient::from_addr(app, "192.0.2.10:1234");
    let response = other.post_form("/auth/login", &login_body("pw@test.com", GOOD_PASSWORD)).await;
    assert_eq!(location(&response), "/auth/login");
    let response = other.post_form("/auth/login", &login_body("pw@test.com", "Wxyz987$")).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_update_account() {
    let (state, app) = setup_test_env();
    let mut other = TestClient::from_addr(app.clone(), "192.0.2.20:1234");
    other
        .post_form("/auth/register", &register_body("taken@test.com", GOOD_PASSWORD, GOOD_PASSWORD))
        .await;
    let mut client = TestClient::new(app);
    register_and_login(&mut client, "someone@test.com").await;

    client
        .post_form("/account/update", "fullName=Ada&email=Taken%40test.com")
        .await;
    let page = client.page("/account/settings").await;
    assert!(page.error.contains(&"Email is already in use".to_string()));

    client
        .post_form("/account/update", "fullName=Ada+Lovelace&email=ada%40test.com")
        .await;
    let page = client.page("/account/settings").await;
    assert_eq!(page.success, vec!["Account information updated successfully"]);
    let user = page.current_user.unwrap();
    assert_eq!(user.email, "ada@test.com");
    assert_eq!(user.full_name, "Ada Lovelace");
    assert!(state.storage.find_by_email("someone@test.com").await.unwrap().is_none());
}
