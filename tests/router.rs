use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use paddy::config::Config;
use paddy::db::MemoryStore;
use paddy::routes::router;
use paddy::AppState;

const ROSTER: &str = "ID,FirstName,LastName,Email,Username,Department\n\
                      1,Ada,Lovelace,ada@uni.edu,ada,CS\n\
                      2,Alan,Kay,alan@uni.edu,alan,CS\n\
                      ,Missing,Id,missing@uni.edu,missing,CS\n\
                      3,Barbara,Liskov,barbara@uni.edu,barbara,CS\n";

fn app() -> Router {
    router(AppState::new(
        Config::in_memory(),
        Arc::new(MemoryStore::default()),
    ))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("token", token);
    }
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

async fn sign_up_and_log_in(app: &Router, id: i64, username: &str, role: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/signup",
        None,
        Some(json!({
            "ID": id,
            "Email": format!("{}@uni.edu", username),
            "Username": username,
            "Password": "hunter22",
            "FirstName": username,
            "LastName": "Tester",
            "Department": "CS",
            "Role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": username, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_owned()
}

fn rating_body(ratee_id: i64, values: [i64; 4]) -> Value {
    let dimensions = [
        "Cooperation",
        "Conceptual Contribution",
        "Practical Contribution",
        "Work Ethic",
    ];

    json!({
        "classID": 10,
        "rateeID": ratee_id,
        "ratings": dimensions
            .iter()
            .zip(values.iter())
            .map(|(name, value)| json!({
                "dimensionName": name,
                "ratingValue": value,
                "comments": "solid work",
            }))
            .collect::<Vec<_>>(),
    })
}

/// An instructor with class 10 (students 1, 2, 3) and group 50 holding all three.
async fn class_with_group(app: &Router) -> String {
    let instructor = sign_up_and_log_in(app, 100, "grace", "Instructor").await;

    let (status, body) = send(
        app,
        "POST",
        "/uploadClass",
        Some(&instructor),
        Some(json!({
            "ClassID": 10,
            "Name": "Compilers",
            "Subject": "CS",
            "Section": "001",
            "file": base64::encode(ROSTER),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newStudents"], 3);
    assert_eq!(body["class"]["Students"], json!([1, 2, 3]));

    let (status, body) = send(
        app,
        "POST",
        "/createGroup",
        Some(&instructor),
        Some(json!({
            "groupID": 50,
            "GroupName": "Team Rocket",
            "classID": 10,
            "studentIDs": [1, 2, 3],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"]["Students"], json!([1, 2, 3]));

    instructor
}

#[tokio::test]
async fn protected_endpoints_need_a_session() {
    let app = app();

    let (status, body) = send(&app, "GET", "/index", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "login required");

    let (status, _) = send(&app, "GET", "/index", Some("made-up-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_a_session_cookie_and_logout_ends_it() {
    let app = app();
    let token = sign_up_and_log_in(&app, 100, "grace", "Instructor").await;

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": "grace@uni.edu", "password": "hunter22" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_owned();
    assert!(cookie.starts_with(&format!("paddy_session={}", token)));

    let request = Request::builder()
        .uri("/index")
        .header(COOKIE, format!("paddy_session={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, "POST", "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/index", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_and_duplicate_accounts_are_rejected() {
    let app = app();
    sign_up_and_log_in(&app, 100, "grace", "Instructor").await;

    let (status, _) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "grace", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/signup",
        None,
        Some(json!({
            "ID": 101,
            "Email": "other@uni.edu",
            "Username": "grace",
            "Password": "pw",
            "FirstName": "Other",
            "LastName": "Grace",
            "Role": "Instructor",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid input");
}

#[tokio::test]
async fn perfect_ratings_pay_the_ratee_and_show_up_in_every_view() {
    let app = app();
    let instructor = class_with_group(&app).await;
    let ada = sign_up_and_log_in(&app, 1, "ada", "Student").await;
    let alan = sign_up_and_log_in(&app, 2, "alan", "Student").await;
    let barbara = sign_up_and_log_in(&app, 3, "barbara", "Student").await;

    let (status, body) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&barbara),
        Some(rating_body(2, [3, 3, 2, 2])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grainsAwarded"], 100);

    let (status, body) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&ada),
        Some(rating_body(2, [5, 5, 5, 5])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grainsAwarded"], 250);
    assert_eq!(body["perfectBonusApplied"], true);
    assert_eq!(body["replaced"], false);

    let (_, body) = send(&app, "GET", "/index", Some(&alan), None).await;
    assert_eq!(body["RiceGrains"], 350);

    let (status, body) = send(&app, "GET", "/getUserGrades?classID=10", Some(&alan), None).await;
    assert_eq!(status, StatusCode::OK);
    let grades = &body["grades"][0];
    assert_eq!(grades["classID"], 10);
    assert_eq!(grades["dimensions"][0]["dimensionName"], "Cooperation");
    assert_eq!(grades["dimensions"][0]["averageRating"], 4.0);
    assert_eq!(grades["dimensions"][0]["count"], 2);
    assert_eq!(grades["overallAverage"], 3.8);

    let (status, body) = send(&app, "GET", "/studentsSummary/10", Some(&instructor), None).await;
    assert_eq!(status, StatusCode::OK);
    let alan_row = &body["students"][1];
    assert_eq!(alan_row["ID"], 2);
    assert_eq!(alan_row["PeersWhoResponded"], 2);
    assert_eq!(alan_row["dimensions"]["Work Ethic"], 3.5);
    assert_eq!(body["students"][0]["overallAverage"], "N/A");

    let (status, body) = send(&app, "GET", "/detailView/10", Some(&instructor), None).await;
    assert_eq!(status, StatusCode::OK);
    let alan_block = &body["groups"][0]["ratees"][1];
    assert_eq!(alan_block["rateeID"], 2);
    assert_eq!(alan_block["raters"][0]["average"], 5.0);
    assert_eq!(alan_block["raters"][1]["average"], "-");
    assert_eq!(alan_block["raters"][2]["ratings"]["Practical Contribution"], 2.0);
}

#[tokio::test]
async fn resubmitting_does_not_pay_twice() {
    let app = app();
    class_with_group(&app).await;
    let ada = sign_up_and_log_in(&app, 1, "ada", "Student").await;
    let alan = sign_up_and_log_in(&app, 2, "alan", "Student").await;

    send(&app, "POST", "/studentRatingsSubmit", Some(&ada), Some(rating_body(2, [4, 4, 4, 4]))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&ada),
        Some(rating_body(2, [5, 5, 5, 5])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replaced"], true);
    assert_eq!(body["grainsAwarded"], 0);

    let (_, body) = send(&app, "GET", "/getUserGrades", Some(&alan), None).await;
    assert_eq!(body["RiceGrains"], 160);
    assert_eq!(body["grades"][0]["overallAverage"], 5.0);
}

#[tokio::test]
async fn invalid_submissions_are_turned_away() {
    let app = app();
    let instructor = class_with_group(&app).await;
    let ada = sign_up_and_log_in(&app, 1, "ada", "Student").await;

    let (status, body) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&ada),
        Some(rating_body(2, [5, 0, 5, 5])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&ada),
        Some(json!({ "classID": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&instructor),
        Some(rating_body(2, [5, 5, 5, 5])),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/setDeadline",
        Some(&instructor),
        Some(json!({ "classID": 10, "submissionDeadline": "2001-09-09T01:46:40Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        "POST",
        "/studentRatingsSubmit",
        Some(&ada),
        Some(rating_body(2, [5, 5, 5, 5])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["reason"].as_str().unwrap().contains("deadline"));
}

#[tokio::test]
async fn instructors_only_manage_their_own_classes() {
    let app = app();
    class_with_group(&app).await;
    let stranger = sign_up_and_log_in(&app, 200, "edsger", "Instructor").await;
    let ada = sign_up_and_log_in(&app, 1, "ada", "Student").await;

    let (status, _) = send(&app, "GET", "/studentsSummary/10", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/removeStudentFromGroup",
        Some(&stranger),
        Some(json!({ "groupID": 50, "studentIDs": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/createGroup",
        Some(&ada),
        Some(json!({ "groupID": 51, "GroupName": "Mine", "classID": 10, "studentIDs": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/detailView/nope", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid input");
}

#[tokio::test]
async fn students_see_their_classes_and_groups() {
    let app = app();
    let instructor = class_with_group(&app).await;
    let ada = sign_up_and_log_in(&app, 1, "ada", "Student").await;

    let (status, _) = send(
        &app,
        "POST",
        "/removeStudentFromGroup",
        Some(&instructor),
        Some(json!({ "groupID": 50, "studentIDs": [3] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/getClasses", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["ID"], 10);
    assert_eq!(body[0]["Name"], "Compilers");

    let (status, body) = send(&app, "GET", "/getGroups/10", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["groupID"], 50);
    assert_eq!(body[0]["Students"].as_array().unwrap().len(), 2);
    assert_eq!(body[0]["Students"][1]["FirstName"], "Alan");
    assert!(body[0]["Students"][1].get("RiceGrains").is_none());
}

#[tokio::test]
async fn rosters_can_be_uploaded_as_multipart_forms() {
    let app = app();
    let instructor = sign_up_and_log_in(&app, 100, "grace", "Instructor").await;

    let boundary = "paddyboundary";
    let mut form = String::new();
    for (name, value) in [
        ("ClassID", "20"),
        ("Name", "Databases"),
        ("Subject", "CS"),
        ("Section", "002"),
    ] {
        form.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            boundary, name, value
        ));
    }
    form.push_str(&format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"roster.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{}\r\n--{}--\r\n",
        boundary, ROSTER, boundary
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/uploadClass")
        .header("token", &instructor)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(form))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = send(&app, "GET", "/getClasses", Some(&instructor), None).await;
    assert_eq!(body[0]["ID"], 20);
    assert_eq!(body[0]["Students"], json!([1, 2, 3]));

    let (status, _) = send(
        &app,
        "POST",
        "/uploadClass",
        Some(&instructor),
        Some(json!({ "ClassID": 21, "Name": "No roster", "Subject": "CS", "Section": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
