mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, become_teacher, body_json, course_setup, mark_done_action, saved_id,
    setup_server, setup_test_db, signin_action, signin_admin_action, signup_action, stored_files,
};

#[tokio::test]
async fn route_module_create_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let flow = Flow::new()
        // anonymous users see nothing
        .step(Action::new("modules", "GET", "/api/v1/modules/").with_expect(StatusCode::UNAUTHORIZED))
        .step(signup_action("pupil", "pupilpass"))
        // students cannot author modules
        .step(
            Action::new("module_create", "POST", "/api/v1/modules/")
                .with_body(json!({ "title": "Nope" }))
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| assert!(body.contains("error"))),
        );

    become_teacher(flow, "teach", "teachpass")
        .step(
            Action::new("module_create", "POST", "/api/v1/modules/")
                .with_body(json!({ "title": "   " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("module_create", "POST", "/api/v1/modules/")
                .with_body(json!({ "title": "Second", "order_index": 2 }))
                .with_save_as("second"),
        )
        .step(
            Action::new("module_create", "POST", "/api/v1/modules/")
                .with_body(json!({ "title": "First", "description": "Start here", "order_index": 1 }))
                .with_save_as("first"),
        )
        // ordered by order_index, every module carries its (empty) lesson list
        .step(
            Action::new("modules", "GET", "/api/v1/modules/").assert_body(|body| {
                let modules = body_json(body);
                let modules = modules.as_array().expect("modules array");
                assert_eq!(modules.len(), 2);
                assert_eq!(modules[0]["title"], "First");
                assert_eq!(modules[1]["title"], "Second");
                assert_eq!(modules[0]["lessons"], json!([]));
                assert_eq!(modules[0]["percentage"], 0);
            }),
        )
        .step(
            Action::new("module_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "second")))
                .with_body(json!({ "title": "Renamed", "order_index": 0 }))
                .assert_body(|body| assert!(body.contains("Renamed"))),
        )
        .step(
            Action::new("module_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "second")))
                .assert_body(|body| assert_eq!(body_json(body)["order_index"], 0)),
        )
        .step(
            Action::new("module_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "second"))),
        )
        .step(
            Action::new("module_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "second")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_module_ownership_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let flow = course_setup(Flow::new())
        // a second teacher
        .step(
            signup_action("other", "otherpass")
                .with_clear_cookies(true)
                .with_save_as("other"),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("set_role", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}/role", saved_id(ctx, "other")))
                .with_body(json!({ "role": "teacher" })),
        )
        // admins may edit any module
        .step(
            Action::new("module_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "module")))
                .with_body(json!({ "title": "Basics", "description": "Edited by admin" })),
        )
        .step(signin_action("other", "otherpass").with_clear_cookies(true));

    flow.step(
        Action::new("module_update", "PUT", "dynamic")
            .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "module")))
            .with_body(json!({ "title": "Hijacked" }))
            .with_expect(StatusCode::FORBIDDEN),
    )
    .step(
        Action::new("lesson_delete", "DELETE", "dynamic")
            .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", saved_id(ctx, "lesson_intro")))
            .with_expect(StatusCode::FORBIDDEN),
    )
    .step(
        Action::new("lesson_create", "POST", "/api/v1/lessons/")
            .with_dyn_body(|ctx| json!({ "module_id": saved_id(ctx, "module"), "title": "Sneaky" }))
            .with_expect(StatusCode::FORBIDDEN),
    )
    .run(&mut server, pool)
    .await;
}

#[tokio::test]
async fn route_lessons_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;
    let uploads = pool.uploads_path();

    course_setup(Flow::new())
        .step(
            Action::new("module_lessons", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}/lessons", saved_id(ctx, "module")))
                .assert_body(|body| {
                    let lessons = body_json(body);
                    let lessons = lessons.as_array().expect("lessons array");
                    assert_eq!(lessons.len(), 2);
                    assert_eq!(lessons[0]["title"], "Intro");
                    assert_eq!(lessons[1]["quiz_total_items"], 10);
                }),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", saved_id(ctx, "lesson_quiz")))
                .assert_body(|body| {
                    let lesson = body_json(body);
                    assert_eq!(lesson["title"], "Checkpoint");
                    assert_eq!(lesson["completed"], false);
                    assert!(lesson["submission"].is_null());
                }),
        )
        // students cannot edit lessons
        .step(
            Action::new("lesson_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", saved_id(ctx, "lesson_intro")))
                .with_dyn_body(|ctx| json!({ "module_id": saved_id(ctx, "module"), "title": "x" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // next lesson walks the module in order, skipping what is done
        .step(
            Action::new("lesson_next", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/next", saved_id(ctx, "lesson_intro")))
                .assert_body(|body| assert_eq!(body_json(body)["title"], "Checkpoint")),
        )
        .step(mark_done_action("lesson_quiz"))
        .step(
            Action::new("lesson_next", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/next", saved_id(ctx, "lesson_intro")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(signin_action("teach", "teachpass").with_clear_cookies(true))
        // teachers do not track progress
        .step(mark_done_action("lesson_intro").with_expect(StatusCode::FORBIDDEN))
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "module_id": saved_id(ctx, "module"),
                        "title": "Broken quiz",
                        "quiz_url": "https://forms.example.com/broken",
                        "quiz_total_items": 0,
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("lesson_material", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/material", saved_id(ctx, "lesson_intro")))
                .with_file("slides.pdf", "application/pdf", b"%PDF-1.4 tiny")
                .assert_body(|body| {
                    let url = body_json(body)["material_url"].as_str().unwrap_or_default().to_string();
                    assert!(url.starts_with("/api/v1/storage/lesson-materials/"));
                    assert!(url.ends_with("slides.pdf"));
                }),
        )
        .step(
            Action::new("lesson_material", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/material", saved_id(ctx, "lesson_intro")))
                .with_file("slides-v2.pdf", "application/pdf", b"%PDF-1.4 tinier")
                .assert_body(move |body| {
                    assert!(body.contains("slides-v2.pdf"));
                    assert_eq!(stored_files(&uploads, "lesson-materials"), 1);
                }),
        )
        .step(
            Action::new("lesson_material_empty", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/material", saved_id(ctx, "lesson_intro")))
                .with_file("empty.pdf", "application/pdf", b"")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // deleting the module takes its lessons along
        .step(
            Action::new("module_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", saved_id(ctx, "module"))),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", saved_id(ctx, "lesson_intro")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_lesson_next_same_index_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    // neither lesson sets order_index, so both sit at 0 and titles decide
    let lesson = |title: &'static str| {
        Action::new("lesson_create", "POST", "/api/v1/lessons/")
            .with_dyn_body(move |ctx| json!({ "module_id": saved_id(ctx, "unordered"), "title": title }))
    };

    become_teacher(Flow::new(), "teach", "teachpass")
        .step(
            Action::new("module_create", "POST", "/api/v1/modules/")
                .with_body(json!({ "title": "Unordered" }))
                .with_save_as("unordered"),
        )
        .step(lesson("Beta").with_save_as("beta"))
        .step(lesson("Alpha").with_save_as("alpha"))
        .step(signup_action("pupil", "pupilpass").with_clear_cookies(true))
        .step(
            Action::new("module_lessons", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}/lessons", saved_id(ctx, "unordered")))
                .assert_body(|body| {
                    let lessons = body_json(body);
                    assert_eq!(lessons[0]["title"], "Alpha");
                    assert_eq!(lessons[1]["title"], "Beta");
                }),
        )
        .step(
            Action::new("lesson_next", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/next", saved_id(ctx, "alpha")))
                .assert_body(|body| assert_eq!(body_json(body)["title"], "Beta")),
        )
        // nothing comes after the last one
        .step(
            Action::new("lesson_next", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/next", saved_id(ctx, "beta")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}
