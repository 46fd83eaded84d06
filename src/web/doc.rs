use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current session",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::user::user_signup_handler,
        crate::web::routes::user::user_signin_handler,
        crate::web::routes::user::user_signout_handler,
        crate::web::routes::user::user_verify_handler,
        crate::web::routes::user::user_session_handler,
        crate::web::routes::user::user_me_handler,
        crate::web::routes::user::user_list_handler,
        crate::web::routes::user::user_update_handler,
        crate::web::routes::user::user_delete_handler,
        crate::web::routes::user::user_role_handler,
        crate::web::routes::user::user_avatar_handler,
        crate::web::routes::modules::modules_list_handler,
        crate::web::routes::modules::modules_get_handler,
        crate::web::routes::modules::modules_lessons_handler,
        crate::web::routes::modules::modules_create_handler,
        crate::web::routes::modules::modules_update_handler,
        crate::web::routes::modules::modules_delete_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_create_handler,
        crate::web::routes::lessons::lessons_update_handler,
        crate::web::routes::lessons::lessons_delete_handler,
        crate::web::routes::lessons::lessons_mark_done_handler,
        crate::web::routes::lessons::lessons_next_handler,
        crate::web::routes::lessons::lessons_submit_quiz_handler,
        crate::web::routes::lessons::lessons_material_handler,
        crate::web::routes::submissions::submissions_list_handler,
        crate::web::routes::submissions::submissions_get_handler,
        crate::web::routes::submissions::submissions_review_handler,
        crate::web::routes::progress::progress_get_handler,
        crate::web::routes::progress::progress_students_handler,
        crate::web::routes::progress::progress_student_handler,
        crate::web::routes::notifications::notifications_list_handler,
        crate::web::routes::notifications::notifications_unread_handler,
        crate::web::routes::notifications::notifications_read_handler,
        crate::web::routes::notifications::notifications_read_all_handler,
        crate::web::routes::notifications::notifications_delete_handler,
        crate::web::routes::activity::activity_page_handler,
        crate::web::routes::dashboard::stats_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;
