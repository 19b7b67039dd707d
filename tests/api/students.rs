use placement_notify::records::RecordStore;
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{assert_unauthorized, spawn_app, PORTAL_URL, STUDENT_PASSWORD};

fn registration(email: &str, roll_no: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "password": "s3cret-passphrase",
        "confirm_password": "s3cret-passphrase",
        "name": "Asha Rao",
        "roll_no": roll_no,
        "course": "M.Sc",
        "branch": "Cyber Security",
        "year": 2025,
        "cgpa": 8.4,
        "skills": ["forensics", " Rust "]
    })
}

#[tokio::test]
async fn registration_returns_201_and_sends_a_welcome_email() {
    let app = spawn_app().await;

    Mock::given(path("/api/tx"))
        .and(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "subscriber_email": "asha@nfsu.example"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.mail_server)
        .await;

    let response = app
        .post_students(&registration("asha@nfsu.example", "nfsu-2025-01"))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["welcome_email_sent"], true);

    let email_request = &app.mail_server.received_requests().await.unwrap()[0];
    let login_link = app.get_login_link(email_request);
    assert_eq!(login_link.0.as_str(), format!("{}/login", PORTAL_URL));
}

#[tokio::test]
async fn welcome_email_never_contains_the_password() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.mail_server)
        .await;

    app.post_students(&registration("asha@nfsu.example", "NFSU-2025-01"))
        .await;

    let email_request = &app.mail_server.received_requests().await.unwrap()[0];
    let body = String::from_utf8_lossy(&email_request.body);
    assert!(!body.contains("s3cret-passphrase"));
    assert!(body.contains("NFSU-2025-01"));
}

#[tokio::test]
async fn registered_students_sign_in_with_their_password() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.mail_server)
        .await;

    let response = app
        .post_students(&registration("asha@nfsu.example", "NFSU-2025-01"))
        .await;
    let body: serde_json::Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap();

    let response = app
        .get_student_as(id, "asha@nfsu.example", "s3cret-passphrase")
        .await;
    assert_eq!(200, response.status().as_u16());

    let response = app
        .get_student_as(id, "asha@nfsu.example", "not-my-passphrase")
        .await;
    assert_unauthorized(&response);
}

#[tokio::test]
async fn mismatched_passwords_are_rejected_before_anything_is_stored() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.mail_server)
        .await;

    let mut body = registration("asha@nfsu.example", "NFSU-2025-01");
    body["confirm_password"] = "something-else".into();

    let response = app.post_students(&body).await;

    assert_eq!(400, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Passwords do not match.");

    assert!(app.records.list_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn registration_returns_400_for_invalid_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        ("email", serde_json::json!("not-an-email"), "invalid email"),
        ("name", serde_json::json!("  "), "blank name"),
        ("roll_no", serde_json::json!("NFSU 01"), "roll number with a space"),
        ("cgpa", serde_json::json!(11.0), "cgpa above ten"),
        ("password", serde_json::json!("short"), "short password"),
    ];

    for (field, value, description) in test_cases {
        let mut body = registration("asha@nfsu.example", "NFSU-2025-01");
        body[field] = value.clone();
        if field == "password" {
            body["confirm_password"] = value;
        }

        let response = app.post_students(&body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "the API did not return 400 Bad Request when the payload had a {}.",
            description
        );
    }
}

#[tokio::test]
async fn duplicate_email_returns_409() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.mail_server)
        .await;

    let first = app
        .post_students(&registration("asha@nfsu.example", "NFSU-2025-01"))
        .await;
    assert_eq!(201, first.status().as_u16());

    let second = app
        .post_students(&registration("ASHA@nfsu.example", "NFSU-2025-02"))
        .await;

    assert_eq!(409, second.status().as_u16());
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"], "Account with this email already exists.");
}

#[tokio::test]
async fn registration_succeeds_when_the_welcome_email_fails() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.mail_server)
        .await;

    let response = app
        .post_students(&registration("asha@nfsu.example", "NFSU-2025-01"))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["welcome_email_sent"], false);
}

fn profile_update() -> serde_json::Value {
    serde_json::json!({
        "name": "Asha Rao",
        "roll_no": "NFSU-2025-01",
        "course": "M.Sc",
        "branch": "Digital Forensics",
        "year": 2026,
        "cgpa": 9.9,
        "backlogs": 0
    })
}

#[tokio::test]
async fn profile_can_be_read_and_updated_by_its_owner() {
    let app = spawn_app().await;
    let student = app
        .seed_student("asha@nfsu.example", "NFSU-2025-01", "Cyber Security", 8.4)
        .await;
    let id = student.id.to_string();

    let response = app
        .get_student_as(&id, "asha@nfsu.example", STUDENT_PASSWORD)
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email"], "asha@nfsu.example");
    assert_eq!(body["roll_no"], "NFSU-2025-01");
    assert!(body.get("password_hash").is_none());

    let response = app
        .put_student_as(&id, "asha@nfsu.example", STUDENT_PASSWORD, &profile_update())
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["branch"], "Digital Forensics");
    assert_eq!(body["year"], 2026);
}

#[tokio::test]
async fn profile_routes_require_credentials() {
    let app = spawn_app().await;
    let student = app
        .seed_student("asha@nfsu.example", "NFSU-2025-01", "Cyber Security", 6.0)
        .await;
    let id = student.id.to_string();

    assert_unauthorized(&app.get_student(&id).await);
    assert_unauthorized(&app.put_student(&id, &profile_update()).await);

    let stored = app.records.get_student(student.id).await.unwrap();
    assert_eq!(stored.profile.cgpa.value(), 6.0);
}

#[tokio::test]
async fn students_cannot_touch_another_students_profile() {
    let app = spawn_app().await;
    let victim = app
        .seed_student("asha@nfsu.example", "NFSU-2025-01", "Cyber Security", 6.0)
        .await;
    app.seed_student("ravi@nfsu.example", "NFSU-2025-02", "Cyber Security", 7.0)
        .await;
    let id = victim.id.to_string();

    let response = app
        .get_student_as(&id, "ravi@nfsu.example", STUDENT_PASSWORD)
        .await;
    assert_eq!(403, response.status().as_u16());

    let response = app
        .put_student_as(&id, "ravi@nfsu.example", STUDENT_PASSWORD, &profile_update())
        .await;
    assert_eq!(403, response.status().as_u16());

    let stored = app.records.get_student(victim.id).await.unwrap();
    assert_eq!(stored.profile.cgpa.value(), 6.0);
    assert_eq!(stored.profile.branch, "Cyber Security");
}
