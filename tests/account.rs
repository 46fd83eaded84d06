mod common;
use eduflow::model::entity::UserEntity;
use eduflow::web::UserRole;
use eduflow::web::dto::account::SessionResponse;
use eduflow::web::middlewares::AUTH_TOKEN;
use reqwest::StatusCode;
use serde_json::json;
use tower_cookies::cookie::SameSite;

use crate::common::{
    Action, Flow, FlowContext, body_json, set_role_action, setup_server, setup_test_db,
    signin_action, signin_admin_action, signup_action, stored_files,
};

#[tokio::test]
async fn route_signup_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("foobar", "foobaz")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    let ent: UserEntity = serde_json::from_str(body).expect("Invalid body format");
                    assert_eq!(ent.username(), "foobar");
                    assert_eq!(ent.full_name(), "foobar Testov");
                    assert_eq!(ent.role(), UserRole::Student);
                    assert!(!body.contains("password"));
                })
                .with_expect(StatusCode::OK),
        )
        // try to signup twice
        .step(signup_action("foobar", "foobaz").with_expect(StatusCode::CONFLICT))
        // too short password
        .step(
            signup_action("shorty", "abc")
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("at least 4 characters"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_signin_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("SIGNINTEST", "SIGNINTEST").with_save_cookies(false))
        .step(
            signin_action("SIGNINTEST", "SIGNINTEST")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    let ent: UserEntity = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(ent.username(), "SIGNINTEST");
                })
                .with_expect(StatusCode::OK)
                .with_clear_cookies(true),
        )
        // wrong credentials
        .step(
            signin_action("SIGNINTEST", "WRONGPASSWORD")
                .with_save_cookies(false)
                .with_clear_cookies(true)
                .assert_body(|body| {
                    assert!(body.contains("Authentication error"));
                })
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // non-existing account
        .step(
            signin_action("nonexisting", "nvm")
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("Authentication error"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_session_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        // anonymous
        .step(Action::new("verify", "GET", "/api/v1/account/verify").with_expect(StatusCode::UNAUTHORIZED))
        .step(
            Action::new("session", "GET", "/api/v1/account/session")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(signup_action("polly", "pollypass"))
        .step(Action::new("verify", "GET", "/api/v1/account/verify"))
        .step(
            Action::new("session", "GET", "/api/v1/account/session").assert_body(|body| {
                let session: SessionResponse =
                    serde_json::from_str(body).expect("Invalid body format");
                assert_eq!(session.user.username(), "polly");
                assert!(session.expires_at > chrono::Utc::now());
            }),
        )
        .step(
            Action::new("me", "GET", "/api/v1/account/me")
                .assert_body(|body| assert!(body.contains("polly"))),
        )
        .step(Action::new("signout", "POST", "/api/v1/account/signout"))
        // the revoked session is not accepted anymore
        .step(Action::new("verify", "GET", "/api/v1/account/verify").with_expect(StatusCode::UNAUTHORIZED))
        .step(
            Action::new("me", "GET", "/api/v1/account/me").with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_list_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("FOOBAR", "FOOBAZ").with_save_cookies(true))
        // try to request without admin perms
        .step(
            Action::new("user_list", "GET", "/api/v1/account/page")
                .assert_body(|body| {
                    assert!(body.contains("error"));
                })
                .with_param("limit", "5")
                .with_param("offset", "0")
                .with_expect(StatusCode::FORBIDDEN)
                .with_save_cookies(true),
        )
        // acquire admin account
        .step(signin_admin_action())
        .step(
            Action::new("user_list", "GET", "/api/v1/account/page")
                .with_param("limit", "5")
                .with_param("offset", "0")
                .assert_body(|body| {
                    assert!(body.contains("total"));
                    assert!(body.contains("items"));
                    assert!(body.contains("FOOBAR"));
                })
                .with_expect(StatusCode::OK),
        )
        .step(
            Action::new("user_list_students", "GET", "/api/v1/account/page")
                .with_param("role", "student")
                .assert_body(|body| {
                    assert!(body.contains("FOOBAR"));
                    assert!(!body.contains("\"admin\""));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_update_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        // create a pair of users and save their data to `foobar_user` and `foobar2_user`
        .step(
            signup_action("FOOBAR", "FOOBAZ")
                .with_save_cookies(false)
                .with_save_as("foobar_user"),
        )
        .step(
            signup_action("FOOBAR2", "FOOBAZ2")
                .with_save_cookies(true)
                .with_save_as("foobar2_user"),
        )
        // try to update `foobar_user` without permissions
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let user = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", user.id())
                })
                .with_body(json!({
                    "username": "should fail",
                    "full_name": "should fail",
                }))
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| {
                    assert!(body.contains("error"));
                }),
        )
        // try to update self, this one should work
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let user = ctx.get_json::<UserEntity>("foobar2_user");
                    format!("/api/v1/account/{}", user.id())
                })
                .with_expect(StatusCode::OK)
                .with_body(json!({
                    "username": "FOOBAR3",
                    "full_name": "Foo Bar",
                }))
                .assert_body(|body| {
                    assert!(body.contains("FOOBAR3"));
                    assert!(body.contains("Foo Bar"));
                }),
        )
        // login as admin to test admin perms
        .step(
            signin_admin_action()
                .with_save_cookies(true)
                .with_clear_cookies(true),
        )
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_body(json!({
                    "username": "FOOBAR4",
                }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("FOOBAR4"));
                }),
        )
        // the name of an existing user is taken
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_body(json!({
                    "username": "FOOBAR3",
                }))
                .with_expect(StatusCode::CONFLICT)
                .assert_body(|body| {
                    assert!(body.contains("error"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

fn inbox_id(ctx: &FlowContext) -> String {
    ctx.get("inbox")[0]["id"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn route_user_role_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("pupil", "pupilpass")
                .with_save_cookies(true)
                .with_save_as("pupil"),
        )
        // students cannot promote themselves
        .step(set_role_action("pupil", "teacher").with_expect(StatusCode::FORBIDDEN))
        .step(signin_admin_action().with_clear_cookies(true).with_save_as("admin"))
        .step(set_role_action("admin", "student").with_expect(StatusCode::BAD_REQUEST))
        .step(set_role_action("pupil", "teacher").assert_body(|body| {
            let ent: UserEntity = serde_json::from_str(body).expect("Invalid body format");
            assert_eq!(ent.role(), UserRole::Teacher);
        }))
        .step(set_role_action("pupil", "wizard").with_expect(StatusCode::UNPROCESSABLE_ENTITY))
        // the promoted user is told about it
        .step(signin_action("pupil", "pupilpass").with_clear_cookies(true))
        .step(
            Action::new("notifications", "GET", "/api/v1/notifications/")
                .with_save_as("inbox")
                .assert_body(|body| {
                    assert!(body.contains("role_changed"));
                    assert!(body.contains("from student to teacher"));
                }),
        )
        .step(
            Action::new("me", "GET", "/api/v1/account/me")
                .assert_body(|body| assert!(body.contains("\"teacher\""))),
        )
        // an inbox is private, admins included
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("read", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/notifications/{}/read", inbox_id(ctx)))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("notification_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/notifications/{}", inbox_id(ctx)))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("pupil", "pupilpass").with_clear_cookies(true))
        .step(
            Action::new("unread", "GET", "/api/v1/notifications/unread-count")
                .assert_body(|body| assert_eq!(body_json(body)["unread"], 1)),
        )
        .step(
            Action::new("notification_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/notifications/{}", inbox_id(ctx))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_delete_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("FOOBAR", "FOOBAZ").with_save_cookies(false).with_save_as("foobar"))
        .step(signup_action("FOOBAZ", "FOOBAR").with_save_cookies(true).with_save_as("foobaz"))
        // we can't allow everybody to delete anybody
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| {
                    assert!(body.contains("error"));
                }),
        )
        // self deletion is allowed
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobaz = ctx.get_json::<UserEntity>("foobaz");
                    format!("/api/v1/account/{}", foobaz.id())
                })
                .with_expect(StatusCode::OK),
        )
        // the session died with the account
        .step(Action::new("verify", "GET", "/api/v1/account/verify").with_expect(StatusCode::UNAUTHORIZED))
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobaz = ctx.get_json::<UserEntity>("foobaz");
                    format!("/api/v1/account/{}", foobaz.id())
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_expect(StatusCode::OK),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_avatar_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;
    let uploads = pool.uploads_path();

    Flow::new()
        .step(signup_action("painter", "painterpass"))
        .step(
            Action::new("avatar_text", "POST", "/api/v1/account/avatar")
                .with_file("notes.txt", "text/plain", b"not an image")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("avatar", "POST", "/api/v1/account/avatar")
                .with_file("me.png", "image/png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3])
                .assert_body(|body| {
                    assert!(body.contains("/api/v1/storage/avatars/"));
                    assert!(body.contains("me.png"));
                }),
        )
        // a new avatar replaces the stored file
        .step(
            Action::new("avatar", "POST", "/api/v1/account/avatar")
                .with_file("me2.png", "image/png", &[0x89, b'P', b'N', b'G', 4, 5, 6, 7])
                .assert_body(move |body| {
                    assert!(body.contains("me2.png"));
                    assert_eq!(stored_files(&uploads, "avatars"), 1);
                }),
        )
        .run(&mut server, pool)
        .await;
}
