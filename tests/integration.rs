use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use service_desk::api::rest::router;
use service_desk::config::Config;
use service_desk::models::event::DeskEvent;
use service_desk::models::request::RequestStatus;
use service_desk::state::AppState;
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&Config::default())))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_vendor(app: &axum::Router, name: &str, categories: &[&str]) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vendor/register/",
            json!({
                "name": name,
                "mobile": "9000000100",
                "categories": categories,
                "location": { "state": "Odisha", "district": "Khordha", "block": "Jatni" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_request(app: &axum::Router, name: &str, services: &[&str]) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/customer/requestservices/",
            json!({
                "requester": {
                    "name": name,
                    "mobile": "9000000200",
                    "address": "4 Temple Street",
                    "state": "Odisha",
                    "district": "Khordha",
                    "block": "Jatni"
                },
                "request_for_services": services,
                "schedule_date": "2026-11-05"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["requests"], 0);
    assert_eq!(body["vendors"], 0);
    assert_eq!(body["bills"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("open_requests"));
}

#[tokio::test]
async fn create_request_starts_pending() {
    let app = setup();
    let id = create_request(&app, "Asha", &["Plumbing", "Electrical"]).await;

    let res = app
        .oneshot(get_request(&format!("/api/customer/requestservices/{id}/")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["assignments"].as_array().unwrap().len(), 0);
    assert_eq!(body["request_for_services"], json!(["Plumbing", "Electrical"]));
}

#[tokio::test]
async fn create_request_without_services_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/api/customer/requestservices/",
            json!({
                "requester": {
                    "name": "Asha",
                    "mobile": "9000000200",
                    "address": "",
                    "state": "",
                    "district": "",
                    "block": ""
                },
                "request_for_services": [],
                "schedule_date": "2026-11-05"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"], "no services requested");
}

#[tokio::test]
async fn get_nonexistent_request_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/api/customer/requestservices/{fake_id}/")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_requests_filters_and_paginates() {
    let app = setup();
    for i in 0..12 {
        create_request(&app, &format!("Customer {i}"), &["Cleaning"]).await;
    }
    create_request(&app, "Bikash", &["Painting"]).await;

    let res = app
        .clone()
        .oneshot(get_request("/api/customer/requestservices/?page=2"))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["total_items"], 13);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 3);

    let res = app
        .clone()
        .oneshot(get_request(
            "/api/customer/requestservices/?service=paint&status=pending",
        ))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["total_items"], 1);
    assert_eq!(page["items"][0]["requester"]["name"], "Bikash");

    let res = app
        .clone()
        .oneshot(get_request("/api/customer/requestservices/?name=nobody"))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["total_items"], 0);
    assert_eq!(page["total_pages"], 1);
    assert_eq!(page["page"], 1);

    let res = app
        .oneshot(get_request("/api/customer/requestservices/?colour=red"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overlapping_assignment_returns_400_and_changes_nothing() {
    let app = setup();
    let request_id = create_request(&app, "Asha", &["Plumbing", "Electrical"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing", "Electrical"]).await;
    let meena = create_vendor(&app, "Meena", &["Electrical"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [
                    { "vendor_unique_id": ravi, "request_for_services": ["Plumbing", "Electrical"] },
                    { "vendor_unique_id": meena, "request_for_services": ["Electrical"] }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get_request(&format!(
            "/api/customer/requestservices/{request_id}/available-services/"
        )))
        .await
        .unwrap();
    let available = body_json(res).await;
    assert_eq!(available, json!(["Plumbing", "Electrical"]));
}

#[tokio::test]
async fn full_assignment_and_billing_flow() {
    let app = setup();
    let request_id = create_request(&app, "Asha", &["Plumbing", "Electrical"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing"]).await;
    let meena = create_vendor(&app, "Meena", &["Electrical"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [
                    { "vendor_unique_id": ravi, "request_for_services": ["Plumbing"] },
                    { "vendor_unique_id": meena, "request_for_services": ["Electrical"] }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assignments = body_json(res).await;
    let list = assignments.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["status"], "assigned");
    assert_eq!(list[0]["vendor_name"], "Ravi");
    let ravi_assignment = list[0]["id"].as_str().unwrap().to_string();
    let meena_assignment = list[1]["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(get_request(&format!("/api/customer/requestservices/{request_id}/")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["status"], "assigned");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/api/vendor/{ravi}/assignments/")))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["total_items"], 1);
    assert_eq!(page["items"][0]["services"], json!(["Plumbing"]));

    // billing before completion is refused
    let bill_body = json!({
        "request_id": request_id,
        "vendor_id": ravi,
        "payment_type": "Cash",
        "bill_items": [
            { "category": "Plumbing", "description": "Pipe fix", "amount": 1000, "gst_percent": 18 }
        ]
    });
    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/billing/", bill_body.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    for (vendor, assignment) in [(&ravi, &ravi_assignment), (&meena, &meena_assignment)] {
        let res = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/customer/requestservices/{request_id}/assignments/{assignment}/"),
                json!({ "vendor_id": vendor, "status": "completed" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(get_request(&format!("/api/customer/requestservices/{request_id}/")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["status"], "completed");

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/billing/", bill_body.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bill = body_json(res).await;
    assert_eq!(bill["customer_name"], "Asha");
    assert_eq!(bill["amount"], "1000.00");
    assert_eq!(bill["gst"], "0.00");
    assert_eq!(bill["total_payment"], "1180.00");
    assert_eq!(bill["bill_items"][0]["gst_amount"], "180.00");
    assert_eq!(bill["status"], "Pending");
    let bill_id = bill["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/billing/", bill_body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/billing/{bill_id}/"),
            json!({ "status": "Paid" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Paid");

    let res = app
        .oneshot(get_request("/api/billing/?status=paid"))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["total_items"], 1);
}

#[tokio::test]
async fn wrong_vendor_cannot_complete_assignment() {
    let app = setup();
    let request_id = create_request(&app, "Asha", &["Plumbing"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing"]).await;
    let meena = create_vendor(&app, "Meena", &["Plumbing"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [{ "vendor_unique_id": ravi, "request_for_services": ["Plumbing"] }]
            }),
        ))
        .await
        .unwrap();
    let assignment_id = body_json(res).await[0]["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/customer/requestservices/{request_id}/assignments/{assignment_id}/"),
            json!({ "vendor_id": meena, "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_vendor_cannot_be_assigned() {
    let app = setup();
    let request_id = create_request(&app, "Asha", &["Plumbing"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/vendor/register/{ravi}/"),
            json!({ "active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["active"], false);

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [{ "vendor_unique_id": ravi, "request_for_services": ["Plumbing"] }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_pending_requests_can_be_deleted() {
    let app = setup();
    let pending = create_request(&app, "Asha", &["Plumbing"]).await;
    let cancelled = create_request(&app, "Bikash", &["Plumbing"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/customer/requestservices/{cancelled}/cancel/"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/api/customer/requestservices/{cancelled}/")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/api/customer/requestservices/{pending}/")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(get_request(&format!("/api/customer/requestservices/{pending}/")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn legacy_request_import_keeps_assignments() {
    let app = setup();
    let vendor_id = "6f1c1f8e-3d1b-4c57-9a44-0b8cf2a1d001";

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/customer/requestservices/import/",
            json!({
                "requester": {
                    "name": "Asha",
                    "mobile": "9000000200",
                    "address": "4 Temple Street",
                    "state": "Odisha",
                    "district": "Khordha",
                    "block": "Jatni"
                },
                "request_for_services": ["Plumbing", "Electrical"],
                "schedule_date": "2025-03-01",
                "assignments": [
                    [["Plumbing", "Electrical"], vendor_id, "Ravi", "completed", "9000000003"]
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["assignments"][0]["vendor_id"], vendor_id);
    assert_eq!(body["assignments"][0]["vendor_mobile"], "9000000003");
}

#[tokio::test]
async fn lookups_reflect_registered_vendors() {
    let app = setup();
    create_vendor(&app, "Ravi", &["Plumbing", "Carpentry"]).await;
    create_vendor(&app, "Meena", &["Electrical", "Plumbing"]).await;

    let res = app
        .clone()
        .oneshot(get_request("/api/get-service/categories/"))
        .await
        .unwrap();
    assert_eq!(
        body_json(res).await,
        json!(["Carpentry", "Electrical", "Plumbing"])
    );

    let res = app
        .oneshot(get_request("/api/district-blocks/"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await, json!({ "Khordha": ["Jatni"] }));
}

#[tokio::test]
async fn support_query_resolves_once() {
    let app = setup();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/support/queries/",
            json!({
                "raised_by": "Vendor",
                "raiser_name": "Ravi",
                "subject": "Payment delay",
                "message": "Bill for the Jatni job is still unpaid"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let query = body_json(res).await;
    assert_eq!(query["status"], "Open");
    let id = query["id"].as_str().unwrap().to_string();

    let resolve = json!({ "response": "Released today" });
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/support/queries/{id}/resolve/"),
            resolve.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Resolved");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/support/queries/{id}/resolve/"),
            resolve,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(get_request("/api/support/queries/?status=Resolved"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["total_items"], 1);
}

#[tokio::test]
async fn duplicate_staff_email_returns_409() {
    let app = setup();
    let body = json!({ "name": "Priya", "email": "priya@example.com", "role": "Admin" });

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/staffadmin/register/", body.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request("POST", "/api/staffadmin/register/", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn trimming_last_open_service_completes_request() {
    let state = Arc::new(AppState::new(&Config::default()));
    let app = router(state.clone());
    let request_id = create_request(&app, "Asha", &["Plumbing", "Electrical"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing"]).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [{ "vendor_unique_id": ravi, "request_for_services": ["Plumbing"] }]
            }),
        ))
        .await
        .unwrap();
    let assignment = body_json(res).await[0]["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/customer/requestservices/{request_id}/assignments/{assignment}/"),
            json!({ "vendor_id": ravi, "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(state.metrics.open_requests.get(), 1);

    let mut events = state.events_tx.subscribe();
    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/customer/requestservices/{request_id}/"),
            json!({ "request_for_services": ["Plumbing"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "completed");

    assert_eq!(state.metrics.open_requests.get(), 0);
    let event = events.try_recv().unwrap();
    assert!(matches!(
        event,
        DeskEvent::RequestStatusChanged { status: RequestStatus::Completed, .. }
    ));
}

#[tokio::test]
async fn assigned_service_cannot_be_dropped_from_request() {
    let app = setup();
    let request_id = create_request(&app, "Asha", &["Plumbing", "Electrical"]).await;
    let ravi = create_vendor(&app, "Ravi", &["Plumbing"]).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/assign-vendor/",
            json!({
                "request_id": request_id,
                "assignments": [{ "vendor_unique_id": ravi, "request_for_services": ["Plumbing"] }]
            }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/customer/requestservices/{request_id}/"),
            json!({ "request_for_services": ["Electrical"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert!(body_string(res).await.contains("service Plumbing is assigned and cannot be removed"));

    let res = app
        .oneshot(get_request(&format!("/api/customer/requestservices/{request_id}/")))
        .await
        .unwrap();
    assert_eq!(
        body_json(res).await["request_for_services"],
        json!(["Plumbing", "Electrical"])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_staff_registration_keeps_email_unique() {
    let app = setup();
    let body = json!({ "name": "Priya", "email": "Priya@Example.com", "role": "Staff" });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let body = body.clone();
            tokio::spawn(async move {
                app.oneshot(json_request("POST", "/api/staffadmin/register/", body))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => created += 1,
            status => assert_eq!(status, StatusCode::CONFLICT),
        }
    }
    assert_eq!(created, 1);

    let res = app
        .oneshot(get_request("/api/staffadmin/register/?email=priya@example.com"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["total_items"], 1);
}
