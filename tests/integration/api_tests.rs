//! API integration tests
//!
//! Run against a live server with a seeded head librarian:
//! `PERPUSTAKAAN_TEST_HEAD_ID=<uuid> cargo test --test api -- --ignored`

use chrono::Utc;
use perpustakaan_server::models::{enums::Role, user::UserClaims};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a token for an existing account; issuance is not part of the API
fn token_for(user_id: Uuid, role: Role) -> String {
    let now = Utc::now().timestamp();
    let claims = UserClaims {
        sub: user_id.to_string(),
        user_id,
        role,
        exp: now + 3600,
        iat: now,
    };
    claims.create_token(&jwt_secret()).expect("Failed to sign token")
}

fn head_token() -> String {
    let id = std::env::var("PERPUSTAKAAN_TEST_HEAD_ID")
        .expect("PERPUSTAKAAN_TEST_HEAD_ID must name a seeded head librarian");
    token_for(id.parse().expect("Invalid head librarian id"), Role::HeadLibrarian)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

async fn create_student(client: &Client, token: &str) -> (Uuid, String) {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": "Test Student",
            "username": unique("student"),
            "password": "secret",
            "role": "STUDENT",
            "student_number": unique("NIS"),
            "class_name": "7A"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let id: Uuid = body["id"].as_str().expect("No user ID").parse().expect("Invalid user ID");
    (id, token_for(id, Role::Student))
}

async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": unique("Integration Book"),
            "author": "Tester",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_stock"], copies);
    body["id"].as_i64().expect("No book ID")
}

async fn available_stock(client: &Client, token: &str, book_id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["available_stock"].as_i64().expect("No stock")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unknown_user_is_rejected() {
    let client = Client::new();
    let token = token_for(Uuid::new_v4(), Role::HeadLibrarian);

    let response = client
        .get(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = head_token();

    let response = client
        .get(format!("{}/books?per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_student_cannot_manage_catalog() {
    let client = Client::new();
    let head = head_token();
    let (_, student) = create_student(&client, &head).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({ "title": "Nope", "total_copies": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_cart_checkout_and_confirmed_return() {
    let client = Client::new();
    let head = head_token();
    let (_, student) = create_student(&client, &head).await;
    let book_id = create_book(&client, &head, 1).await;

    let response = client
        .post(format!("{}/cart/items", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Second add of the same book is a duplicate
    let response = client
        .post(format!("{}/cart/items", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/cart/checkout", BASE_URL))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let summary: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(summary["total_borrowed"], 1);
    assert_eq!(available_stock(&client, &head, book_id).await, 0);

    let loans: Value = client
        .get(format!("{}/loans/mine", BASE_URL))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let loan_id = loans
        .as_array()
        .and_then(|loans| loans.iter().find(|l| l["book_id"] == book_id))
        .and_then(|l| l["id"].as_i64())
        .expect("Loan not listed");

    let response = client
        .post(format!("{}/loans/{}/self-return", BASE_URL, loan_id))
        .bearer_auth(&student)
        .json(&json!({ "condition": "NORMAL" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "PENDING_CONFIRMATION");
    assert_eq!(available_stock(&client, &head, book_id).await, 0);

    let response = client
        .post(format!("{}/loans/{}/confirm", BASE_URL, loan_id))
        .bearer_auth(&head)
        .json(&json!({ "approve": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "RETURNED");
    assert_eq!(available_stock(&client, &head, book_id).await, 1);

    let response = client
        .post(format!("{}/loans/{}/rating", BASE_URL, loan_id))
        .bearer_auth(&student)
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let movements: Value = client
        .get(format!("{}/books/{}/stock-movements", BASE_URL, book_id))
        .bearer_auth(&head)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let deltas: Vec<i64> = movements
        .as_array()
        .expect("Movements not an array")
        .iter()
        .filter_map(|m| m["delta"].as_i64())
        .collect();
    assert_eq!(deltas, vec![-1, 1]);
}

#[tokio::test]
#[ignore]
async fn test_checkout_without_stock_keeps_cart() {
    let client = Client::new();
    let head = head_token();
    let (_, student) = create_student(&client, &head).await;
    let book_id = create_book(&client, &head, 0).await;

    client
        .post(format!("{}/cart/items", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");

    let response = client
        .post(format!("{}/cart/checkout", BASE_URL))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    let cart: Value = client
        .get(format!("{}/cart", BASE_URL))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(cart.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_manual_loan_and_damaged_return() {
    let client = Client::new();
    let head = head_token();
    let (student_id, _) = create_student(&client, &head).await;
    let book_id = create_book(&client, &head, 2).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&head)
        .json(&json!({ "student_id": student_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    // Damaged without a note is refused
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&head)
        .json(&json!({ "condition": "DAMAGED" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&head)
        .json(&json!({ "condition": "DAMAGED", "note": "torn cover" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["fine_kind"], "DAMAGED");
    assert_eq!(body["fine_amount"], 50000);
    // Damaged copies do not go back on the shelf
    assert_eq!(available_stock(&client, &head, book_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_reports_summary() {
    let client = Client::new();
    let token = head_token();

    let response = client
        .get(format!("{}/reports/summary", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["borrowed"].is_number());
    assert!(body["total_fines"].is_number());
}

/// Desk loan with fixed dates, returned by the student and left pending
async fn pending_late_return(client: &Client, head: &str, borrow_date: &str, due_date: &str) -> (Uuid, i64, i64) {
    let (student_id, student) = create_student(client, head).await;
    let book_id = create_book(client, head, 1).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(head)
        .json(&json!({
            "student_id": student_id,
            "book_id": book_id,
            "borrow_date": borrow_date,
            "due_date": due_date
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    let response = client
        .post(format!("{}/loans/{}/self-return", BASE_URL, loan_id))
        .bearer_auth(&student)
        .json(&json!({ "condition": "NORMAL" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "PENDING_CONFIRMATION");
    assert_eq!(body["fine_kind"], "LATE");

    (student_id, book_id, loan_id)
}

async fn report_rows(client: &Client, token: &str, report: &str, query: &str) -> Vec<Value> {
    let body: Value = client
        .get(format!("{}/reports/{}?{}", BASE_URL, report, query))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body.as_array().cloned().expect("Report is not an array")
}

#[tokio::test]
#[ignore]
async fn test_late_students_counts_confirmed_returns_only() {
    let client = Client::new();
    let head = head_token();
    let (student_id, _, loan_id) = pending_late_return(&client, &head, "2019-03-01", "2019-03-08").await;
    let period = "from=2019-03-01&to=2019-03-01&limit=100";
    let listed = |rows: &[Value]| rows.iter().any(|r| r["student_id"] == student_id.to_string());

    let rows = report_rows(&client, &head, "late-students", period).await;
    assert!(!listed(&rows));

    let response = client
        .post(format!("{}/loans/{}/confirm", BASE_URL, loan_id))
        .bearer_auth(&head)
        .json(&json!({ "approve": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let rows = report_rows(&client, &head, "late-students", period).await;
    assert!(listed(&rows));
}

#[tokio::test]
#[ignore]
async fn test_top_rated_honours_period() {
    let client = Client::new();
    let head = head_token();
    let (student_id, book_id, loan_id) = pending_late_return(&client, &head, "2019-06-01", "2019-06-08").await;
    let student = token_for(student_id, Role::Student);

    client
        .post(format!("{}/loans/{}/confirm", BASE_URL, loan_id))
        .bearer_auth(&head)
        .json(&json!({ "approve": true }))
        .send()
        .await
        .expect("Failed to send request");
    let response = client
        .post(format!("{}/loans/{}/rating", BASE_URL, loan_id))
        .bearer_auth(&student)
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let listed = |rows: &[Value]| rows.iter().any(|r| r["book_id"] == book_id);

    let rows = report_rows(&client, &head, "top-rated", "from=2019-06-01&to=2019-06-01&limit=100").await;
    assert!(listed(&rows));

    let rows = report_rows(&client, &head, "top-rated", "from=2019-06-02&limit=100").await;
    assert!(!listed(&rows));
}
