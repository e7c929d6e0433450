//! An in-process stand-in for the CloudCharge backend.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use serde_json::{Value, json};

pub const USER_ID: &str = "u-1";
pub const TOKEN: &str = "tok-1";
pub const EXPIRED_TOKEN: &str = "expired";

/// What the fake backend holds and what it has been asked.
#[derive(Debug, Default)]
pub struct Backend {
    pub stations: Vec<Value>,
    pub bookings: Vec<Value>,
    pub swaps: Vec<Value>,
    /// `METHOD path` for every request, in order
    pub requests: Vec<String>,
    /// Authorization header of every request
    pub auth: Vec<Option<String>>,
    /// Bodies of profile updates
    pub profile_updates: Vec<Value>,
    pub next_id: u32,
}

impl Backend {
    pub fn seeded() -> Self {
        Self {
            stations: vec![
                json!({
                    "_id": "st-far", "name": "Pune Station", "status": "Available",
                    "pricePerKwh": 15, "chargedBatteries": 2, "chargingBatteries": 1,
                    "totalBatteries": 4,
                    "location": { "type": "Point", "coordinates": [73.8567, 18.5204],
                                  "address": "FC Road, Pune" }
                }),
                json!({
                    "_id": "st-near", "name": "Bandra Hub", "status": "Charging",
                    "pricePerKwh": 18, "chargedBatteries": 0, "chargingBatteries": 3,
                    "totalBatteries": 3,
                    "location": { "type": "Point", "coordinates": [72.8406, 19.0596] }
                }),
                json!({
                    "_id": "st-lost", "name": "Nowhere Depot", "status": "Offline",
                    "location": { "type": "Point", "coordinates": [] }
                }),
            ],
            ..Default::default()
        }
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| *r == request).count()
    }

    pub fn active_swap(&self) -> Option<&Value> {
        self.swaps.iter().find(|s| s["status"] == "Active")
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn station_ref(&self, id: &str) -> Value {
        self.stations
            .iter()
            .find(|s| s["_id"] == id)
            .map(|s| json!({ "_id": id, "name": s["name"] }))
            .unwrap_or_else(|| json!(id))
    }
}

pub type Shared = Arc<Mutex<Backend>>;

/// A running fake backend.
pub struct FakeBackend {
    pub state: Shared,
    pub base_url: String,
}

impl FakeBackend {
    pub async fn start() -> Self {
        Self::start_with(Backend::seeded()).await
    }

    pub async fn start_with(backend: Backend) -> Self {
        let state: Shared = Arc::new(Mutex::new(backend));
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.state.lock().unwrap()
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/:id", put(update_user))
        .route("/api/stations", get(stations))
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/user/:id", get(user_bookings))
        .route("/api/bookings/:id", delete(cancel_booking))
        .route("/api/swaps", post(create_swap))
        .route("/api/swaps/user/:id", get(user_swaps))
        .route("/api/swaps/active/:id", get(active_swap))
        .route("/api/swaps/:id/deposit", put(deposit_swap))
        .route("/api/swaps/:id/cancel", patch(cancel_swap))
        .with_state(state)
}

fn record(state: &Shared, headers: &HeaderMap, request: String) -> bool {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let expired = auth.as_deref() == Some(format!("Bearer {EXPIRED_TOKEN}").as_str());
    let mut backend = state.lock().unwrap();
    backend.requests.push(request);
    backend.auth.push(auth);
    expired
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Token expired" })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

async fn register(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&s, &headers, "POST /api/users/register".into());
    if body["email"] == "taken@example.com" {
        return bad_request("User already exists");
    }
    (StatusCode::CREATED, Json(json!({ "message": "User registered" }))).into_response()
}

async fn login(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&s, &headers, "POST /api/users/login".into());
    if body["password"] != "secret" {
        return bad_request("Invalid credentials");
    }
    Json(json!({
        "token": TOKEN,
        "user": { "_id": USER_ID, "name": "Asha", "email": body["email"] }
    }))
    .into_response()
}

async fn update_user(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if record(&s, &headers, format!("PUT /api/users/{id}")) {
        return unauthorized();
    }
    s.lock().unwrap().profile_updates.push(body.clone());
    Json(json!({
        "message": "Profile updated",
        "updatedUser": { "_id": id, "name": body["name"], "email": "asha@example.com" }
    }))
    .into_response()
}

async fn stations(State(s): State<Shared>, headers: HeaderMap) -> Response {
    record(&s, &headers, "GET /api/stations".into());
    let stations = s.lock().unwrap().stations.clone();
    Json(stations).into_response()
}

async fn create_booking(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if record(&s, &headers, "POST /api/bookings".into()) {
        return unauthorized();
    }
    let mut backend = s.lock().unwrap();
    let id = backend.next_id("b");
    let station_id = body["stationId"].as_str().unwrap_or_default().to_string();
    let booking = json!({
        "_id": id,
        "userId": body["userId"],
        "station": backend.station_ref(&station_id),
        "startTime": body["startTime"],
        "endTime": body["endTime"],
        "status": "Confirmed",
    });
    backend.bookings.push(booking.clone());
    (StatusCode::CREATED, Json(booking)).into_response()
}

async fn user_bookings(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if record(&s, &headers, format!("GET /api/bookings/user/{id}")) {
        return unauthorized();
    }
    let bookings: Vec<Value> = s
        .lock()
        .unwrap()
        .bookings
        .iter()
        .filter(|b| b["userId"] == id.as_str())
        .cloned()
        .collect();
    Json(bookings).into_response()
}

async fn cancel_booking(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if record(&s, &headers, format!("DELETE /api/bookings/{id}")) {
        return unauthorized();
    }
    let mut backend = s.lock().unwrap();
    match backend.bookings.iter_mut().find(|b| b["_id"] == id.as_str()) {
        Some(b) => {
            b["status"] = json!("Cancelled");
            Json(json!({ "message": "Booking cancelled" })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Booking not found" })),
        )
            .into_response(),
    }
}

async fn create_swap(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if record(&s, &headers, "POST /api/swaps".into()) {
        return unauthorized();
    }
    let mut backend = s.lock().unwrap();
    if backend.active_swap().is_some() {
        return bad_request("You already have an active swap");
    }
    let id = backend.next_id("sw");
    let source = body["sourceStation"].as_str().unwrap_or_default().to_string();
    let swap = json!({
        "_id": id,
        "userId": body["userId"],
        "sourceStation": backend.station_ref(&source),
        "swapCost": 150,
        "swappedAt": "2026-03-14T10:00:00Z",
        "status": "Active",
    });
    backend.swaps.push(swap.clone());
    (StatusCode::CREATED, Json(json!({ "swap": swap }))).into_response()
}

async fn user_swaps(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if record(&s, &headers, format!("GET /api/swaps/user/{id}")) {
        return unauthorized();
    }
    let swaps = s.lock().unwrap().swaps.clone();
    Json(swaps).into_response()
}

async fn active_swap(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if record(&s, &headers, format!("GET /api/swaps/active/{id}")) {
        return unauthorized();
    }
    if id == "ghost" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No active swap" })),
        )
            .into_response();
    }
    let active = s.lock().unwrap().active_swap().cloned();
    Json(active).into_response()
}

async fn deposit_swap(
    State(s): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if record(&s, &headers, format!("PUT /api/swaps/{id}/deposit")) {
        return unauthorized();
    }
    let mut backend = s.lock().unwrap();
    let destination = body["destinationStation"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let destination = backend.station_ref(&destination);
    match backend.swaps.iter_mut().find(|sw| sw["_id"] == id.as_str()) {
        Some(sw) => {
            sw["status"] = json!("Completed");
            sw["destinationStation"] = destination;
            Json(json!({ "message": "Deposited" })).into_response()
        }
        None => bad_request("Swap not found"),
    }
}

async fn cancel_swap(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if record(&s, &headers, format!("PATCH /api/swaps/{id}/cancel")) {
        return unauthorized();
    }
    let mut backend = s.lock().unwrap();
    match backend.swaps.iter_mut().find(|sw| sw["_id"] == id.as_str()) {
        Some(sw) => {
            sw["status"] = json!("Cancelled");
            Json(json!({ "message": "Cancelled" })).into_response()
        }
        None => bad_request("Swap not found"),
    }
}
