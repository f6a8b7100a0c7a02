use axum::http::StatusCode;
use portal_backend_lib::middleware::{classify, route_access, Decision, RouteAccess};
use portal_common::Notice;

use crate::test_utils::{location, setup_test_env, TestClient};

#[test]
fn test_every_route_has_the_expected_access_class() {
    let guest_only = ["/auth/login", "/auth/register"];
    let member_only = [
        "/",
        "/dashboard",
        "/auth/logout",
        "/account/settings",
        "/account/update",
        "/account/password",
    ];

    for path in guest_only {
        assert_eq!(route_access(path), RouteAccess::GuestOnly, "{path}");
    }
    for path in member_only {
        assert_eq!(route_access(path), RouteAccess::MemberOnly, "{path}");
    }
}

#[test]
fn test_classify_is_total() {
    for access in [RouteAccess::GuestOnly, RouteAccess::MemberOnly] {
        for authenticated in [false, true] {
            let decision = classify(access, authenticated);
            match (access, authenticated) {
                (RouteAccess::MemberOnly, false) => assert_eq!(
                    decision,
                    Decision::Redirect {
                        to: "/auth/login",
                        notice: Some(Notice::error("Please log in to access this page")),
                    }
                ),
                (RouteAccess::GuestOnly, true) => {
                    assert_eq!(decision, Decision::Redirect { to: "/", notice: None })
                },
                _ => assert_eq!(decision, Decision::Admit),
            }
        }
    }
}

#[tokio::test]
async fn test_unknown_paths_require_a_session() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    let response = client.get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_flash_cookie_only_issued_with_pending_notices() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    let page = client.page("/auth/login").await;
    assert!(page.error.is_empty());
    assert!(client.cookie("portal_flash").is_none());

    client.get("/dashboard").await;
    assert!(client.cookie("portal_flash").is_some());
}

#[tokio::test]
async fn test_rate_limit_ignores_page_views() {
    let (_state, app) = setup_test_env();
    let mut client = TestClient::new(app);

    for _ in 0..10 {
        let response = client.get("/auth/login").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
