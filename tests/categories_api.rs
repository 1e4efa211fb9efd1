mod common;

use axum::http::StatusCode;
use bookstore_app::modules::{books::models::BookDtoWithoutCategoryIds, categories::models::CategoryDto};
use bookstore_http::Page;
use common::{TestApp, ADD_BOOKS, ADD_CATEGORIES, ADD_USERS, CLEAR_CATEGORIES};
use serde_json::json;

const ENDPOINT: &str = "/api/categories";

async fn app() -> TestApp {
    TestApp::spawn(&[ADD_USERS, CLEAR_CATEGORIES, ADD_CATEGORIES]).await
}

fn fiction() -> CategoryDto {
    CategoryDto {
        id: 1,
        name: "Fiction".to_string(),
        description: Some("Novels and short stories".to_string()),
    }
}

fn science() -> CategoryDto {
    CategoryDto {
        id: 2,
        name: "Science".to_string(),
        description: Some("Popular science and textbooks".to_string()),
    }
}

fn new_category() -> serde_json::Value {
    json!({ "name": "Poetry", "description": "Verse of every age" })
}

#[tokio::test]
async fn get_all_returns_every_category() {
    let app = app().await;

    let response = app.get(ENDPOINT, &app.user_token()).await;

    assert_eq!(response.status, StatusCode::OK);
    let page: Page<CategoryDto> = response.json();
    assert_eq!(page.content, vec![fiction(), science()]);
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.number, 0);
}

#[tokio::test]
async fn get_all_honours_page_and_sort() {
    let app = app().await;

    let response = app
        .get(&format!("{ENDPOINT}?page=0&size=1&sort=name,desc"), &app.user_token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let page: Page<CategoryDto> = response.json();
    assert_eq!(page.content, vec![science()]);
    assert_eq!(page.size, 1);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn unsupported_sort_field_is_bad_request() {
    let app = app().await;

    let response = app
        .get(&format!("{ENDPOINT}?sort=description"), &app.user_token())
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "bad_request");
}

#[tokio::test]
async fn get_by_id_returns_the_category() {
    let app = app().await;

    let response = app.get(&format!("{ENDPOINT}/1"), &app.user_token()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json::<CategoryDto>(), fiction());
}

#[tokio::test]
async fn get_by_unknown_id_is_not_found() {
    let app = app().await;

    let response = app.get(&format!("{ENDPOINT}/99"), &app.user_token()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "not_found");
}

#[tokio::test]
async fn create_returns_the_new_category() {
    let app = app().await;

    let response = app.post(ENDPOINT, Some(&app.admin_token()), new_category()).await;

    assert_eq!(response.status, StatusCode::CREATED);
    let created: CategoryDto = response.json();
    assert_eq!(
        created,
        CategoryDto {
            id: 3,
            name: "Poetry".to_string(),
            description: Some("Verse of every age".to_string()),
        }
    );
}

#[tokio::test]
async fn create_with_taken_name_conflicts() {
    let app = app().await;

    let response = app
        .post(ENDPOINT, Some(&app.admin_token()), json!({ "name": "Fiction" }))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_with_blank_name_is_rejected() {
    let app = app().await;

    let response = app
        .post(ENDPOINT, Some(&app.admin_token()), json!({ "name": " ", "description": null }))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.error_fields(), vec!["name"]);
}

#[tokio::test]
async fn customers_cannot_create_categories() {
    let app = app().await;

    let response = app.post(ENDPOINT, Some(&app.user_token()), new_category()).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn anonymous_requests_are_unauthorized() {
    let app = app().await;

    let response = app.post(ENDPOINT, None, new_category()).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "unauthorized");
}

#[tokio::test]
async fn update_replaces_fields() {
    let app = app().await;

    let response = app.put(&format!("{ENDPOINT}/2"), &app.admin_token(), new_category()).await;

    assert_eq!(response.status, StatusCode::CREATED);
    let updated: CategoryDto = response.json();
    assert_eq!(updated.id, 2);
    assert_eq!(updated.name, "Poetry");

    let reread = app.get(&format!("{ENDPOINT}/2"), &app.user_token()).await;
    assert_eq!(reread.json::<CategoryDto>(), updated);
}

#[tokio::test]
async fn update_of_unknown_category_is_not_found() {
    let app = app().await;

    let response = app.put(&format!("{ENDPOINT}/42"), &app.admin_token(), new_category()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_may_keep_its_own_name() {
    let app = app().await;

    let response = app
        .put(
            &format!("{ENDPOINT}/1"),
            &app.admin_token(),
            json!({ "name": "Fiction", "description": "Made-up stories" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn delete_removes_the_category() {
    let app = app().await;

    let response = app.delete(&format!("{ENDPOINT}/2"), &app.admin_token()).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("{ENDPOINT}/2"), &app.user_token()).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_books() {
    let app = TestApp::spawn(&[ADD_USERS, ADD_CATEGORIES, ADD_BOOKS]).await;

    let response = app.delete(&format!("{ENDPOINT}/2"), &app.admin_token()).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get("/api/books/2", &app.user_token()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.value()["categoryIds"], json!([]));
}

#[tokio::test]
async fn books_of_a_category_omit_category_ids() {
    let app = TestApp::spawn(&[ADD_USERS, ADD_CATEGORIES, ADD_BOOKS]).await;

    let response = app.get(&format!("{ENDPOINT}/1/books"), &app.user_token()).await;

    assert_eq!(response.status, StatusCode::OK);
    let page: Page<BookDtoWithoutCategoryIds> = response.json();
    let titles: Vec<_> = page.content.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Foundation"]);
    assert!(response.value()["content"][0].get("categoryIds").is_none());
}

#[tokio::test]
async fn books_of_an_unknown_category_is_an_empty_page() {
    let app = TestApp::spawn(&[ADD_USERS, ADD_CATEGORIES, ADD_BOOKS]).await;

    let response = app.get(&format!("{ENDPOINT}/77/books"), &app.user_token()).await;

    assert_eq!(response.status, StatusCode::OK);
    let page: Page<BookDtoWithoutCategoryIds> = response.json();
    assert!(page.content.is_empty());
    assert_eq!(page.total_pages, 0);
}
