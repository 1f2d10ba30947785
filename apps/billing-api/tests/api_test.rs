//! End-to-end tests through the router, against an in-memory database.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use billing_api::{router, ApiConfig, AppState};
use chrono::Utc;
use medibill_core::clinical::{
    Appointment, Doctor, Hospital, LabOrder, LabTest, Medication, Patient, Prescription,
    PrescriptionLine,
};
use medibill_core::Money;
use medibill_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const HOSPITAL: &str = "h-1";
const USER: &str = "u-1";

// =============================================================================
// Fixtures
// =============================================================================

async fn seed(db: &Database, hospital_id: &str) {
    let clinical = db.clinical();
    clinical
        .insert_hospital(&Hospital {
            id: hospital_id.to_string(),
            name: "City General".to_string(),
            address: Some("12 MG Road".to_string()),
        })
        .await
        .unwrap();
    clinical
        .insert_patient(&Patient {
            id: "pat-1".to_string(),
            hospital_id: hospital_id.to_string(),
            name: "Arjun Singh".to_string(),
            contact: Some("9876500001".to_string()),
        })
        .await
        .unwrap();
    clinical
        .insert_doctor(&Doctor {
            id: "doc-1".to_string(),
            hospital_id: hospital_id.to_string(),
            name: "Asha Mehta".to_string(),
            specialization: Some("General Medicine".to_string()),
        })
        .await
        .unwrap();
    clinical
        .insert_medication(&Medication {
            id: "med-1".to_string(),
            hospital_id: hospital_id.to_string(),
            name: "Paracetamol 500mg".to_string(),
            price: Money::from_major(20),
            stock: 5,
        })
        .await
        .unwrap();
    clinical
        .insert_appointment(&Appointment {
            id: "appt-1".to_string(),
            hospital_id: hospital_id.to_string(),
            patient_id: "pat-1".to_string(),
            doctor_id: "doc-1".to_string(),
            category: "Follow-up".to_string(),
            date: Utc::now().date_naive(),
            time: "10:30".to_string(),
        })
        .await
        .unwrap();
    clinical
        .insert_prescription(&Prescription {
            id: "rx-1".to_string(),
            hospital_id: hospital_id.to_string(),
            patient_id: "pat-1".to_string(),
            doctor_id: "doc-1".to_string(),
            lines: vec![PrescriptionLine {
                medication_id: "med-1".to_string(),
                dosage: Some("500mg".to_string()),
                frequency: Some("twice daily".to_string()),
                duration: Some("5 days".to_string()),
                instructions: None,
                quantity: 10,
            }],
        })
        .await
        .unwrap();
    clinical
        .insert_lab_order(&LabOrder {
            id: "lab-1".to_string(),
            hospital_id: hospital_id.to_string(),
            patient_id: "pat-1".to_string(),
            doctor_id: Some("doc-1".to_string()),
            tests: vec![
                LabTest {
                    id: "cbc".to_string(),
                    name: "Complete Blood Count".to_string(),
                    price: Money::from_major(400),
                },
                LabTest {
                    id: "lft".to_string(),
                    name: "Liver Function Test".to_string(),
                    price: Money::from_major(600),
                },
            ],
        })
        .await
        .unwrap();
}

async fn test_app() -> (Router, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(&db, HOSPITAL).await;
    let app = router(AppState::new(db.clone(), ApiConfig::default()));
    (app, db)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Hospital-Id", HOSPITAL)
        .header("X-User-Id", USER);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn set_tax_rate(app: &Router, bps: u32) {
    let (status, body) = send(
        app,
        request(
            Method::PUT,
            "/billing/settings",
            Some(json!({ "taxRateBps": bps })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

fn manual_invoice(paid: i64) -> Value {
    json!({
        "customer": { "kind": "registered", "patientId": "pat-1" },
        "doctorId": "doc-1",
        "invoiceType": "consultation",
        "items": [
            { "description": "Dressing", "quantity": 2, "unitPrice": 50000 },
            { "description": "Procedure", "quantity": 1, "unitPrice": 100000 }
        ],
        "paidAmount": paid
    })
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_created_with_defaults() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, request(Method::GET, "/billing/settings", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hospitalId"], HOSPITAL);
    assert_eq!(body["taxRateBps"], 0);
    assert_eq!(body["consultationFees"]["followUp"], 30000);
}

#[tokio::test]
async fn test_settings_update_rejects_unknown_fields() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/billing/settings",
            Some(json!({ "hospitalId": "someone-else" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_tenant_header_is_rejected() {
    let (app, _db) = test_app().await;

    let request = Request::builder()
        .uri("/billing/invoices")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_writes_require_user_header() {
    let (app, _db) = test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/billing/invoices/consultation")
        .header("X-Hospital-Id", HOSPITAL)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "appointmentId": "appt-1" }).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Invoices
// =============================================================================

#[tokio::test]
async fn test_manual_invoice_totals_and_round_trip() {
    let (app, _db) = test_app().await;
    set_tax_rate(&app, 1800).await;

    let (status, created) = send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(0))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["subtotal"], 200000);
    assert_eq!(created["taxAmount"], 36000);
    assert_eq!(created["totalAmount"], 236000);
    assert_eq!(created["balanceDue"], 236000);
    assert_eq!(created["paymentStatus"], "unpaid");
    assert_eq!(created["paymentMethod"], "cash");
    assert_eq!(created["createdBy"], USER);

    let number = created["invoiceNumber"].as_str().unwrap();
    assert!(number.starts_with("INV-"), "{}", number);
    assert!(number.ends_with("-0001"), "{}", number);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(
        &app,
        request(Method::GET, &format!("/billing/invoices/{}", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_partial_payment_at_creation() {
    let (app, _db) = test_app().await;
    set_tax_rate(&app, 1800).await;

    let (status, created) = send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(100000))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["paidAmount"], 100000);
    assert_eq!(created["balanceDue"], 136000);
    assert_eq!(created["paymentStatus"], "partial");
    assert!(created["paymentDate"].is_null());
}

#[tokio::test]
async fn test_consultation_invoice_then_replay_then_payment() {
    let (app, _db) = test_app().await;
    set_tax_rate(&app, 1800).await;

    let body = json!({ "appointmentId": "appt-1" });
    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/consultation",
            Some(body.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["items"][0]["unitPrice"], 30000);
    assert_eq!(created["totalAmount"], 35400);
    assert_eq!(created["source"], json!({ "kind": "appointment", "id": "appt-1" }));
    assert!(created["paymentDate"].is_null());

    // Replay returns the first invoice, nothing new is written
    let (status, replay) = send(
        &app,
        request(Method::POST, "/billing/invoices/consultation", Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(replay["code"], "ALREADY_INVOICED");
    assert_eq!(replay["invoiceId"], created["id"]);
    assert_eq!(replay["invoiceNumber"], created["invoiceNumber"]);

    let (_, listed) = send(&app, request(Method::GET, "/billing/invoices", None)).await;
    assert_eq!(listed["pagination"]["total"], 1);

    let id = created["id"].as_str().unwrap();
    let (status, paid) = send(
        &app,
        request(
            Method::PUT,
            &format!("/billing/invoices/{}/payment", id),
            Some(json!({ "amount": 35400, "paymentMethod": "card" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", paid);
    assert_eq!(paid["paymentStatus"], "paid");
    assert_eq!(paid["balanceDue"], 0);
    assert_eq!(paid["paymentMethod"], "card");
    assert!(!paid["paymentDate"].is_null());
    assert_eq!(paid["version"], 2);
}

#[tokio::test]
async fn test_source_invoice_uses_first_accepted_method_without_cash() {
    let (app, _db) = test_app().await;

    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            "/billing/settings",
            Some(json!({ "acceptedPaymentMethods": ["card", "upi"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/consultation",
            Some(json!({ "appointmentId": "appt-1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["paymentMethod"], "card");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/laboratory",
            Some(json!({ "labOrderId": "lab-1", "paymentMethod": "cash" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_payment_validation() {
    let (app, _db) = test_app().await;

    let (_, created) = send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(0))),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            &format!("/billing/invoices/{}/payment", id),
            Some(json!({ "amount": 0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            &format!("/billing/invoices/{}/payment", id),
            Some(json!({ "amount": 100, "paymentMethod": "barter" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/billing/invoices/missing/payment",
            Some(json!({ "amount": 100 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_lab_order_invoiced_once() {
    let (app, _db) = test_app().await;

    let body = json!({ "labOrderId": "lab-1" });
    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/laboratory",
            Some(body.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["invoiceType"], "laboratory");
    assert_eq!(created["items"].as_array().unwrap().len(), 2);
    assert_eq!(created["subtotal"], 100000);

    let (status, replay) = send(
        &app,
        request(Method::POST, "/billing/invoices/laboratory", Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(replay["invoiceId"], created["id"]);
}

#[tokio::test]
async fn test_prescription_invoice_does_not_touch_stock() {
    let (app, db) = test_app().await;

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/pharmacy",
            Some(json!({ "prescriptionId": "rx-1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["items"][0]["quantity"], 10);
    assert_eq!(created["subtotal"], 20000);

    let medication = db.clinical().get_medication(HOSPITAL, "med-1").await.unwrap().unwrap();
    assert_eq!(medication.stock, 5);
}

#[tokio::test]
async fn test_unknown_source_is_not_found() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/consultation",
            Some(json!({ "appointmentId": "appt-404" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_rejects_bad_filters() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/billing/invoices?status=bogus", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        request(Method::GET, "/billing/invoices?page=0", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(Method::GET, "/billing/invoices?from=not-a-date", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_tenant_cannot_see_invoice() {
    let (app, db) = test_app().await;
    seed_other_hospital(&db).await;

    let (_, created) = send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(0))),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let request = Request::builder()
        .uri(format!("/billing/invoices/{}", id))
        .header("X-Hospital-Id", "h-2")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn seed_other_hospital(db: &Database) {
    db.clinical()
        .insert_hospital(&Hospital {
            id: "h-2".to_string(),
            name: "Lakeside Clinic".to_string(),
            address: None,
        })
        .await
        .unwrap();
}

// =============================================================================
// Walk-in
// =============================================================================

fn walk_in_pharmacy(quantity: i64) -> Value {
    json!({
        "customerName": "Priya Nair",
        "customerContact": "9000000001",
        "items": [{
            "description": "Paracetamol 500mg",
            "quantity": quantity,
            "unitPrice": 2000,
            "medicationId": "med-1"
        }]
    })
}

#[tokio::test]
async fn test_walk_in_pharmacy_deducts_stock() {
    let (app, db) = test_app().await;

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/walkin/pharmacy/invoice",
            Some(walk_in_pharmacy(2)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["customer"]["kind"], "walk_in");
    assert_eq!(created["customer"]["name"], "Priya Nair");

    let medication = db.clinical().get_medication(HOSPITAL, "med-1").await.unwrap().unwrap();
    assert_eq!(medication.stock, 3);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/walkin/pharmacy/invoice",
            Some(walk_in_pharmacy(10)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["available"], 3);

    let medication = db.clinical().get_medication(HOSPITAL, "med-1").await.unwrap().unwrap();
    assert_eq!(medication.stock, 3);

    let (_, listed) = send(&app, request(Method::GET, "/walkin/invoices", None)).await;
    assert_eq!(listed["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_walk_in_pharmacy_requires_medication() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/walkin/pharmacy/invoice",
            Some(json!({
                "customerName": "Priya Nair",
                "customerContact": "9000000001",
                "items": [{ "description": "Bandage", "quantity": 1, "unitPrice": 500 }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_walk_in_lookup_hides_registered_invoices() {
    let (app, _db) = test_app().await;

    let (_, registered) = send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(0))),
    )
    .await;
    let (status, walk_in) = send(
        &app,
        request(
            Method::POST,
            "/walkin/laboratory/invoice",
            Some(json!({
                "customerName": "Rahul Das",
                "customerContact": "9000000002",
                "items": [{ "description": "Blood Sugar", "quantity": 1, "unitPrice": 15000 }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", walk_in);

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/walkin/invoices/{}", registered["id"].as_str().unwrap()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = send(
        &app,
        request(
            Method::GET,
            &format!("/walkin/invoices/{}", walk_in["id"].as_str().unwrap()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], walk_in["id"]);

    // Registered and walk-in invoices share one number sequence
    let (_, all) = send(&app, request(Method::GET, "/billing/invoices", None)).await;
    assert_eq!(all["pagination"]["total"], 2);
}

// =============================================================================
// Statistics and health
// =============================================================================

#[tokio::test]
async fn test_statistics_this_month() {
    let (app, _db) = test_app().await;
    set_tax_rate(&app, 1800).await;

    send(
        &app,
        request(Method::POST, "/billing/invoices", Some(manual_invoice(100000))),
    )
    .await;
    send(
        &app,
        request(
            Method::POST,
            "/billing/invoices/consultation",
            Some(json!({ "appointmentId": "appt-1", "paidAmount": 35400 })),
        ),
    )
    .await;

    let (status, stats) = send(
        &app,
        request(Method::GET, "/billing/statistics?period=this_month", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", stats);
    assert_eq!(stats["summary"]["totalInvoices"], 2);
    assert_eq!(stats["summary"]["totalAmount"], 271400);
    assert_eq!(stats["summary"]["paidAmount"], 135400);
    assert_eq!(stats["summary"]["pendingAmount"], 136000);
    assert_eq!(stats["byStatus"]["paid"]["count"], 1);
    assert_eq!(stats["byStatus"]["partial"]["count"], 1);
}

#[tokio::test]
async fn test_statistics_rejects_unknown_period() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/billing/statistics?period=fortnight", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_health() {
    let (app, _db) = test_app().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
