mod common;

use chrono::{TimeZone, Utc};
use serde_json::json;

use cloudcharge_web::api::{
    ApiClient, ApiConfig, ApiError, CreateBookingRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest,
};
use cloudcharge_web::domain::{
    BookingBoard, BookingStatus, StationId, StationStatus, SwapPhase, SwapStatus, UserId,
};

use common::{Backend, EXPIRED_TOKEN, FakeBackend, TOKEN, USER_ID};

fn client(backend: &FakeBackend) -> ApiClient {
    ApiClient::new(ApiConfig::new(&backend.base_url).with_timeout(5)).unwrap()
}

fn login_request(password: &str) -> LoginRequest {
    LoginRequest {
        email: "asha@example.com".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn login_returns_token_and_user() {
    let backend = FakeBackend::start().await;
    let (token, user) = client(&backend).login(&login_request("secret")).await.unwrap();

    assert_eq!(token, TOKEN);
    assert_eq!(user.id, UserId::new(USER_ID));
    assert_eq!(user.name, "Asha");
    assert_eq!(user.email, "asha@example.com");
}

#[tokio::test]
async fn login_failure_surfaces_backend_message() {
    let backend = FakeBackend::start().await;
    let err = client(&backend)
        .login(&login_request("wrong"))
        .await
        .unwrap_err();

    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn register_rejects_taken_email() {
    let backend = FakeBackend::start().await;
    let api = client(&backend);

    let fresh = RegisterRequest {
        name: "Asha".into(),
        email: "asha@example.com".into(),
        password: "secret".into(),
    };
    api.register(&fresh).await.unwrap();

    let taken = RegisterRequest {
        email: "taken@example.com".into(),
        ..fresh
    };
    let err = api.register(&taken).await.unwrap_err();
    assert_eq!(err.user_message(), "User already exists");
}

#[tokio::test]
async fn stations_resolve_geojson_positions() {
    let backend = FakeBackend::start().await;
    let stations = client(&backend).fetch_stations().await.unwrap();

    assert_eq!(stations.len(), 3);

    let pune = &stations[0];
    assert_eq!(pune.name, "Pune Station");
    let position = pune.position.unwrap();
    assert!((position.lat() - 18.5204).abs() < 1e-9);
    assert!((position.lng() - 73.8567).abs() < 1e-9);
    assert_eq!(pune.address.as_deref(), Some("FC Road, Pune"));
    assert_eq!(pune.price_per_kwh, Some(15.0));
    assert_eq!(pune.batteries.charged, 2);

    assert_eq!(stations[1].status, StationStatus::Charging);

    // Empty coordinates keep the station but without a position
    assert_eq!(stations[2].name, "Nowhere Depot");
    assert!(stations[2].position.is_none());
    assert_eq!(stations[2].status, StationStatus::Unavailable);
}

#[tokio::test]
async fn malformed_station_does_not_hide_the_others() {
    let mut seeded = Backend::seeded();
    seeded.stations.push(json!({
        "_id": "st-odd", "name": null, "pricePerKwh": "18",
        "location": { "coordinates": "77.59,12.97" }
    }));
    let backend = FakeBackend::start_with(seeded).await;

    let stations = client(&backend).fetch_stations().await.unwrap();

    assert_eq!(stations.len(), 4);
    assert_eq!(stations[0].name, "Pune Station");
    let odd = &stations[3];
    assert_eq!(odd.id, StationId::new("st-odd"));
    assert!(odd.position.is_none());
    assert_eq!(odd.price_per_kwh, Some(18.0));
}

#[tokio::test]
async fn token_is_sent_as_bearer() {
    let backend = FakeBackend::start().await;
    let api = client(&backend);

    api.fetch_stations().await.unwrap();
    api.with_token(TOKEN)
        .unwrap()
        .fetch_user_bookings(&UserId::new(USER_ID))
        .await
        .unwrap();

    let recorded = backend.backend();
    assert_eq!(recorded.auth[0], None);
    assert_eq!(recorded.auth[1].as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn rejected_token_is_unauthorized() {
    let backend = FakeBackend::start().await;
    let err = client(&backend)
        .with_token(EXPIRED_TOKEN)
        .unwrap()
        .fetch_user_bookings(&UserId::new(USER_ID))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn active_swap_absent_is_none() {
    let backend = FakeBackend::start().await;
    let api = client(&backend).with_token(TOKEN).unwrap();

    // `null` body
    let none = api.fetch_active_swap(&UserId::new(USER_ID)).await.unwrap();
    assert!(none.is_none());

    // 404
    let none = api.fetch_active_swap(&UserId::new("ghost")).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn borrow_then_deposit() {
    let backend = FakeBackend::start().await;
    let api = client(&backend).with_token(TOKEN).unwrap();
    let user = UserId::new(USER_ID);

    let created = api
        .create_swap(&user, &StationId::new("st-far"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.status, SwapStatus::Active);
    assert_eq!(created.source.name.as_deref(), Some("Pune Station"));
    assert_eq!(created.cost, 150.0);

    let active = api.fetch_active_swap(&user).await.unwrap();
    let phase = SwapPhase::from_active(active);
    let swap = phase.check_deposit().unwrap();
    assert_eq!(swap.id, created.id);

    api.deposit_swap(&swap.id, &StationId::new("st-near"))
        .await
        .unwrap();

    assert!(api.fetch_active_swap(&user).await.unwrap().is_none());
    let history = api.fetch_user_swaps(&user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SwapStatus::Completed);
    assert_eq!(
        history[0].destination.as_ref().and_then(|d| d.name.as_deref()),
        Some("Bandra Hub")
    );
}

#[tokio::test]
async fn second_borrow_is_refused_by_backend() {
    let backend = FakeBackend::start().await;
    let api = client(&backend).with_token(TOKEN).unwrap();
    let user = UserId::new(USER_ID);

    api.create_swap(&user, &StationId::new("st-far")).await.unwrap();
    let err = api
        .create_swap(&user, &StationId::new("st-far"))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "You already have an active swap");
}

#[tokio::test]
async fn cancelled_booking_moves_to_cancelled() {
    let backend = FakeBackend::start().await;
    let api = client(&backend).with_token(TOKEN).unwrap();
    let user = UserId::new(USER_ID);

    let req = CreateBookingRequest {
        user_id: USER_ID.into(),
        station_id: "st-near".into(),
        start_time: Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 3, 14, 11, 30, 0).unwrap(),
    };
    api.create_booking(&req).await.unwrap();

    let board = BookingBoard::from_bookings(api.fetch_user_bookings(&user).await.unwrap());
    assert_eq!(board.active.len(), 1);
    let booking = board.active[0].clone();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.station.name.as_deref(), Some("Bandra Hub"));
    assert!((booking.duration_hours() - 1.5).abs() < 1e-9);

    api.cancel_booking(&booking.id).await.unwrap();

    let board = BookingBoard::from_bookings(api.fetch_user_bookings(&user).await.unwrap());
    assert!(board.active.is_empty());
    assert_eq!(board.cancelled.len(), 1);
}

#[tokio::test]
async fn profile_update_returns_new_name() {
    let backend = FakeBackend::start().await;
    let api = client(&backend).with_token(TOKEN).unwrap();

    let updated = api
        .update_profile(
            &UserId::new(USER_ID),
            &UpdateProfileRequest {
                name: "Asha K".into(),
                password: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Asha K");
    assert_eq!(updated.id, UserId::new(USER_ID));
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    // Port 9 (discard) is not expected to be listening
    let api = ApiClient::new(ApiConfig::new("http://127.0.0.1:9").with_timeout(2)).unwrap();
    let err = api.fetch_stations().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}
