use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tower::ServiceExt;

use barberbook::config::AppConfig;
use barberbook::db::{self, queries};
use barberbook::handlers;
use barberbook::models::{Barber, ScheduleEntry, Service};
use barberbook::services::booking::{self, NewBooking};
use barberbook::services::notify::{BookingEvent, NotificationSink};
use barberbook::state::AppState;

// ── Mock notification sinks ──

struct RecordingSink {
    events: Arc<Mutex<Vec<BookingEvent>>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn dispatch(&self, event: &BookingEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn dispatch(&self, _event: &BookingEvent) -> anyhow::Result<()> {
        anyhow::bail!("downstream dispatcher is down")
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
    }
}

fn seed(conn: &rusqlite::Connection) {
    queries::insert_barber(
        conn,
        &Barber {
            id: "barber-1".to_string(),
            display_name: "Tom".to_string(),
        },
    )
    .unwrap();
    queries::insert_service(
        conn,
        &Service {
            id: "svc-30".to_string(),
            barber_id: "barber-1".to_string(),
            name: "Haircut".to_string(),
            duration_minutes: 30,
            price_cents: 2500,
        },
    )
    .unwrap();
    for day in [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ] {
        queries::insert_schedule_entry(
            conn,
            &ScheduleEntry {
                barber_id: "barber-1".to_string(),
                day: day.to_string(),
                start_time: t("09:00"),
                end_time: t("18:00"),
                lunch_start: Some(t("13:00")),
                lunch_end: Some(t("14:00")),
                is_working: true,
            },
        )
        .unwrap();
    }
}

fn test_state() -> (Arc<AppState>, Arc<Mutex<Vec<BookingEvent>>>) {
    let conn = db::init_db(":memory:").unwrap();
    seed(&conn);
    let events = Arc::new(Mutex::new(vec![]));
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        notifier: Box::new(RecordingSink {
            events: Arc::clone(&events),
        }),
    });
    (state, events)
}

fn t(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn next_week() -> NaiveDate {
    Local::now().date_naive() + Duration::days(7)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn create_body(client: &str, date: NaiveDate, start: &str) -> serde_json::Value {
    serde_json::json!({
        "client_id": client,
        "barber_id": "barber-1",
        "service_id": "svc-30",
        "date": date.format("%Y-%m-%d").to_string(),
        "start_time": start,
    })
}

// ── Booking lifecycle over HTTP ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let app = handlers::router(state);
    let (status, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_booking_returns_details_and_emits_event() {
    let (state, events) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "14:00")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["start_time"], "14:00");
    assert_eq!(body["booking"]["end_time"], "14:30");
    assert_eq!(body["booking"]["status"], "PENDING");
    assert_eq!(body["barber_name"], "Tom");
    assert_eq!(body["service_name"], "Haircut");

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].booking_id, body["booking"]["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_double_booking_rejected_touching_allowed() {
    let (state, events) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (status, _) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "14:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-2", date, "14:15")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already booked"));

    let (status, body) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-3", date, "14:30")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["end_time"], "15:00");

    // Only the two successful creates were dispatched.
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_lunch_conflict_surfaces_checker_reason() {
    let (state, _) = test_state();
    let app = handlers::router(state);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/bookings",
            create_body("client-1", next_week(), "13:30"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lunch"));
}

#[tokio::test]
async fn test_unknown_service_is_404() {
    let (state, _) = test_state();
    let app = handlers::router(state);

    let mut body = create_body("client-1", next_week(), "14:00");
    body["service_id"] = serde_json::json!("svc-missing");
    let (status, body) = send(&app, json_request("POST", "/api/bookings", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("service"));
}

#[tokio::test]
async fn test_malformed_time_is_400() {
    let (state, _) = test_state();
    let app = handlers::router(state);

    let mut body = create_body("client-1", next_week(), "14:00");
    body["start_time"] = serde_json::json!("2pm");
    let (status, _) = send(&app, json_request("POST", "/api/bookings", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_cancel_and_unknown_status() {
    let (state, events) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (_, created) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "10:00")),
    )
    .await;
    let id = created["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/bookings/{id}/status"),
            serde_json::json!({ "status": "CONFIRMED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/bookings/{id}/status"),
            serde_json::json!({ "status": "DONE" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CANCELLED");

    // create + confirm + cancel
    assert_eq!(events.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_reschedule_self_exclusion_over_http() {
    let (state, _) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (_, created) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "14:00")),
    )
    .await;
    let id = created["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            serde_json::json!({
                "new_date": date.format("%Y-%m-%d").to_string(),
                "new_start_time": "14:15",
                "reason": "running late",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["start_time"], "14:15");
    assert_eq!(body["booking"]["end_time"], "14:45");
    assert!(body["booking"]["notes"]
        .as_str()
        .unwrap()
        .contains("[Rescheduled: running late]"));
}

#[tokio::test]
async fn test_reschedule_terminal_booking_is_400() {
    let (state, _) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (_, created) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "14:00")),
    )
    .await;
    let id = created["booking"]["id"].as_str().unwrap().to_string();

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/bookings/{id}/status"),
            serde_json::json!({ "status": "COMPLETED" }),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            serde_json::json!({
                "new_date": date.format("%Y-%m-%d").to_string(),
                "new_start_time": "16:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot reschedule"));
}

#[tokio::test]
async fn test_bulk_status_is_all_or_nothing() {
    let (state, _) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    let (_, a) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "09:00")),
    )
    .await;
    let (_, b) = send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-2", date, "10:00")),
    )
    .await;
    let a_id = a["booking"]["id"].as_str().unwrap().to_string();
    let b_id = b["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/bookings/bulk-status",
            serde_json::json!({
                "booking_ids": [a_id, b_id, "missing"],
                "status": "CONFIRMED",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing changed; retry without the bad id succeeds.
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/bookings/bulk-status",
            serde_json::json!({
                "booking_ids": [a["booking"]["id"], b["booking"]["id"]],
                "status": "CONFIRMED",
                "reason": "confirmed by phone",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = body.as_array().unwrap();
    assert_eq!(updated.len(), 2);
    for details in updated {
        assert_eq!(details["booking"]["status"], "CONFIRMED");
        assert!(details["booking"]["notes"]
            .as_str()
            .unwrap()
            .contains("[Bulk Update: confirmed by phone]"));
    }
}

#[tokio::test]
async fn test_list_bookings_requires_one_owner_filter() {
    let (state, _) = test_state();
    let app = handlers::router(state);

    let (status, _) = send(&app, get_request("/api/bookings")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get_request("/api/bookings?client_id=client-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

// ── Week schedule over HTTP ──

#[tokio::test]
async fn test_week_schedule_shape_and_idempotence() {
    let (state, _) = test_state();
    let app = handlers::router(state);
    let date = next_week();

    send(
        &app,
        json_request("POST", "/api/bookings", create_body("client-1", date, "14:00")),
    )
    .await;

    let monday = date - Duration::days(i64::from(chrono::Datelike::weekday(&date).num_days_from_monday()));
    let uri = format!("/api/barbers/barber-1/schedule?week_start={}", monday.format("%Y-%m-%d"));

    let (status, first) = send(&app, get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let days = first.as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["day_of_week"], "monday");
    assert_eq!(days[6]["day_of_week"], "sunday");

    let booked_day = days
        .iter()
        .find(|d| d["date"] == serde_json::json!(date.format("%Y-%m-%d").to_string()))
        .unwrap();
    assert!(booked_day["booked"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("14:00")));
    assert_eq!(
        booked_day["booked_ranges"],
        serde_json::json!([{ "start": "14:00", "end": "14:30" }])
    );

    let (_, second) = send(&app, get_request(&uri)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_put_schedule_replaces_wholesale() {
    let (state, _) = test_state();
    let app = handlers::router(state);

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/api/barbers/barber-1/schedule",
            serde_json::json!([
                {
                    "day": "monday",
                    "start_time": "10:00",
                    "end_time": "16:00",
                    "is_working": true,
                },
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The other six days are gone, so tuesday is now off.
    let (_, week) = send(&app, get_request("/api/barbers/barber-1/schedule")).await;
    let days = week.as_array().unwrap();
    assert_eq!(days[0]["is_off"], false);
    assert_eq!(days[0]["start_time"], "10:00");
    assert_eq!(days[1]["is_off"], true);
}

// ── Notification failure isolation ──

#[tokio::test]
async fn test_sink_failure_does_not_fail_booking() {
    let conn = db::init_db(":memory:").unwrap();
    seed(&conn);
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        notifier: Box::new(FailingSink),
    });
    let app = handlers::router(Arc::clone(&state));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/bookings",
            create_body("client-1", next_week(), "14:00"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The booking really was committed.
    let id = body["booking"]["id"].as_str().unwrap();
    let db = state.db.lock().unwrap();
    assert!(queries::get_booking(&db, id).unwrap().is_some());
}

// ── Concurrency: exactly one of N racing creates wins ──

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_creates_one_winner() {
    let conn = db::init_db(":memory:").unwrap();
    seed(&conn);
    let db = Arc::new(Mutex::new(conn));
    let date = next_week();

    let mut handles = vec![];
    for i in 0..8 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let mut conn = db.lock().unwrap();
            booking::create_booking(
                &mut conn,
                &format!("client-{i}"),
                NewBooking {
                    barber_id: "barber-1".to_string(),
                    service_id: "svc-30".to_string(),
                    date,
                    start_time: t("14:00"),
                    notes: None,
                },
            )
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let bookings = queries::active_bookings_for_day(&db.lock().unwrap(), "barber-1", date, None).unwrap();
    assert_eq!(bookings.len(), 1);
}
