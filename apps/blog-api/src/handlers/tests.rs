use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::{App, test, web};
use serde_json::{Value, json};
use uuid::Uuid;

use blog_core::PostSettings;
use blog_core::domain::User;
use blog_core::domain::policy::{
    PERMISSION_ALL, PERMISSION_CREATE, PERMISSION_EDIT, PERMISSION_UPDATE,
};
use blog_core::ports::TokenService;
use blog_infra::{InMemoryPostRepository, JwtConfig, JwtTokenService};

use super::{configure_routes, path_config, query_config};
use crate::state::AppState;

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(query_config())
                .app_data(path_config())
                .configure(configure_routes),
        )
        .await
    };
}

fn state() -> (AppState, InMemoryPostRepository) {
    let repo = InMemoryPostRepository::new();
    let state = AppState::in_memory(repo.clone(), PostSettings::default(), JwtConfig::default());
    (state, repo)
}

fn bearer(user_id: Uuid, permissions: &[&str], roles: &[&str]) -> (&'static str, String) {
    let token = JwtTokenService::new(JwtConfig::default())
        .generate_token(
            user_id,
            "someone@example.com",
            roles.iter().map(|r| r.to_string()).collect(),
            permissions.iter().map(|p| p.to_string()).collect(),
        )
        .unwrap();
    ("Authorization", format!("Bearer {token}"))
}

fn admin() -> (&'static str, String) {
    bearer(Uuid::new_v4(), &[PERMISSION_ALL], &[])
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = test::call_service(&$app, $req.to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        (status, body)
    }};
}

macro_rules! create {
    ($app:expr, $auth:expr, $body:expr) => {{
        let (status, body) = send!(
            $app,
            test::TestRequest::post()
                .uri("/api/v1/dashboard/posts")
                .insert_header($auth)
                .set_json($body)
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["post"].clone()
    }};
}

#[actix_web::test]
async fn test_health_reports_in_memory_mode() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "disabled");
}

#[actix_web::test]
async fn test_dashboard_requires_a_token() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/dashboard/posts"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/posts")
            .insert_header((AUTHORIZATION, "Bearer not-a-jwt"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_from_json_then_read_publicly() {
    let (state, repo) = state();
    let author_id = Uuid::new_v4();
    let mut author = User::new("Ada".to_string(), "ada@example.com".to_string());
    author.id = author_id;
    repo.insert_user(author).await;
    let app = app!(state);

    let post = create!(
        app,
        bearer(author_id, &[PERMISSION_CREATE], &[]),
        json!({
            "title": "Hello World",
            "content": "Some body text",
            "publish": "published",
            "featured": true,
            "tags": ["rust", "web"],
            "coverUrl": "https://cdn.example.com/cover.png",
        })
    );

    assert_eq!(post["slug"], "hello-world");
    assert_eq!(post["authorId"], author_id.to_string());
    assert_eq!(post["totalViews"], 0);
    assert_eq!(post["totalShares"], 0);
    assert_eq!(post["totalFavorites"], 0);
    assert_eq!(post["coverUrl"], "https://cdn.example.com/cover.png");
    assert_eq!(post["tags"][0]["name"], "rust");
    assert_eq!(post["tags"][1]["name"], "web");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts/hello-world"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Hello World");
    assert_eq!(body["post"]["author"]["name"], "Ada");
    assert_eq!(body["post"]["duration"], "1 min read");
    assert_eq!(body["post"]["comments"], json!([]));
}

#[actix_web::test]
async fn test_create_validates_input() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/dashboard/posts")
            .insert_header(admin())
            .set_json(json!({ "content": "No title" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The title field is required.");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/dashboard/posts")
            .insert_header(admin())
            .set_json(json!({ "title": "T", "content": "C", "publish": "someday" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_create_without_permission_is_forbidden() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/dashboard/posts")
            .insert_header(bearer(Uuid::new_v4(), &[], &[]))
            .set_json(json!({ "title": "T", "content": "C" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "success": false, "message": "This action is unauthorized." }));
}

#[actix_web::test]
async fn test_create_from_multipart_stores_the_cover() {
    let (state, _) = state();
    let app = app!(state);

    let boundary = "XBLOGBOUNDARY";
    let mut payload = Vec::new();
    for (name, value) in [("title", "Cover story"), ("content", "Body"), ("tags[]", "rust")] {
        payload.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    payload.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"coverUrl\"; filename=\"Cover.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(&[0x89, b'P', b'N', b'G']);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/dashboard/posts")
            .insert_header(admin())
            .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}")))
            .set_payload(payload)
    );

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let cover = body["post"]["coverUrl"].as_str().unwrap();
    assert!(cover.starts_with("/storage/uploads/post/cover/cover_"), "{cover}");
    assert!(cover.ends_with(".png"));
    assert_eq!(body["post"]["tags"][0]["slug"], "rust");
}

#[actix_web::test]
async fn test_listings_respect_visibility_and_filters() {
    let (state, _) = state();
    let app = app!(state);

    create!(app, admin(), json!({ "title": "Draft", "content": "C" }));
    create!(
        app,
        admin(),
        json!({ "title": "Live", "content": "C", "publish": "published" })
    );

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"]["data"][0]["slug"], "live");
    assert_eq!(
        body["posts"]["meta"],
        json!({ "currentPage": 1, "perPage": 10, "total": 1, "lastPage": 1 })
    );

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/posts?filter%5Bpublish%5D=draft")
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"]["meta"]["total"], 1);
    assert_eq!(body["posts"]["data"][0]["publish"], "draft");

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/posts?sort=created_at")
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"]["meta"]["total"], 2);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/posts?sort=title")
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_highlights_and_search_projections() {
    let (state, _) = state();
    let app = app!(state);

    create!(
        app,
        admin(),
        json!({ "title": "Hello Rust", "content": "Body", "publish": "published", "featured": true })
    );

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts/featureds"));
    let featured = &body["featureds"][0];
    assert_eq!(featured["slug"], "hello-rust");
    assert!(featured["content"].is_null());
    assert!(featured.get("tags").is_none());

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts/latest"));
    assert_eq!(body["latest"][0]["content"], "Body");
    assert_eq!(body["latest"][0]["duration"], "1 min read");

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts/search?query=RUST"));
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/v1/posts/search"));
    assert_eq!(body["results"], json!([]));
}

#[actix_web::test]
async fn test_only_the_author_or_editors_may_update() {
    let (state, _) = state();
    let app = app!(state);

    let author_id = Uuid::new_v4();
    let post = create!(
        app,
        bearer(author_id, &[PERMISSION_CREATE], &[]),
        json!({ "title": "Mine", "content": "C" })
    );
    let uri = format!("/api/v1/dashboard/posts/{}", post["id"].as_str().unwrap());

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(Uuid::new_v4(), &[], &[]))
            .set_json(json!({ "title": "Theirs" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(author_id, &[], &[]))
            .set_json(json!({ "title": "Still mine", "tags": ["rust"] }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["slug"], "still-mine");
    assert_eq!(body["post"]["tags"][0]["name"], "rust");

    let (status, _) = send!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(Uuid::new_v4(), &[PERMISSION_UPDATE], &[]))
            .set_json(json!({ "title": "Restorer edit" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(Uuid::new_v4(), &[PERMISSION_EDIT], &[]))
            .set_json(json!({ "title": "Editor edit" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Editor edit");
}

#[actix_web::test]
async fn test_cover_url_must_be_absolute() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/dashboard/posts")
            .insert_header(bearer(Uuid::new_v4(), &[PERMISSION_CREATE], &[]))
            .set_json(json!({
                "title": "Borrowed",
                "content": "C",
                "coverUrl": "uploads/post/cover/someone-else.png",
            }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The cover url must be a valid http or https URL.");

    let post = create!(
        app,
        admin(),
        json!({ "title": "Linked", "content": "C", "coverUrl": "https://cdn.example.com/a.png" })
    );
    let uri = format!("/api/v1/dashboard/posts/{}", post["id"].as_str().unwrap());

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(admin())
            .set_json(json!({ "coverUrl": "../../.env" }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send!(app, test::TestRequest::get().uri(&uri).insert_header(admin()));
    assert_eq!(body["post"]["coverUrl"], "https://cdn.example.com/a.png");
}

#[actix_web::test]
async fn test_delete_restore_and_force_delete() {
    let (state, _) = state();
    let app = app!(state);

    let post = create!(
        app,
        admin(),
        json!({ "title": "Short lived", "content": "C", "publish": "published" })
    );
    let uri = format!("/api/v1/dashboard/posts/{}", post["id"].as_str().unwrap());

    let (status, body) = send!(app, test::TestRequest::delete().uri(&uri).insert_header(admin()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Post deleted successfully." }));

    let (status, _) = send!(app, test::TestRequest::delete().uri(&uri).insert_header(admin()));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/v1/posts/short-lived"));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("{uri}/restore"))
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["post"]["deletedAt"].is_null());

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("{uri}/force"))
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("{uri}/force"))
            .insert_header(bearer(Uuid::new_v4(), &[PERMISSION_ALL], &["Super Admin"]))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(app, test::TestRequest::get().uri(&uri).insert_header(admin()));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_unknown_ids_are_not_found() {
    let (state, _) = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/dashboard/posts/{}", Uuid::new_v4()))
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/posts/not-a-uuid")
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_tags_endpoint_lists_known_tags() {
    let (state, _) = state();
    let app = app!(state);

    create!(
        app,
        admin(),
        json!({ "title": "Tagged", "content": "C", "tags": ["web", "rust"] })
    );

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard/tags")
            .insert_header(admin())
    );
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["rust", "web"]);
}
