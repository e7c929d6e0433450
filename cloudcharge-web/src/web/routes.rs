//! HTTP route handlers.

use std::path::Path as FsPath;

use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::api::{
    ApiError, CreateBookingRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::domain::{Booking, BookingBoard, BookingDraft, BookingId, Station, StationId, SwapPhase};
use crate::feed::StationSnapshot;
use crate::rank::{NearestStations, nearest_stations};
use crate::session::SessionData;

use super::auth::CurrentUser;
use super::dto::*;
use super::error::{AppError, JsonError};
use super::state::AppState;
use super::templates::*;

/// How many nearest stations the booking page lists before "show all".
const NEAREST_PREVIEW: usize = 5;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/health", get(health))
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", post(logout))
        .route("/home", get(home_page))
        .route("/map", get(map_page))
        .route("/booking", get(booking_page).post(booking_submit))
        .route("/my-bookings", get(my_bookings_page))
        .route("/my-bookings/:id/cancel", post(cancel_booking))
        .route("/swap", get(swap_page))
        .route("/swap/borrow", post(borrow_battery))
        .route("/swap/cancel", post(cancel_swap))
        .route("/my-swaps", get(my_swaps_page))
        .route("/my-swaps/deposit", post(deposit_battery))
        .route("/profile", get(profile_page).post(profile_submit))
        .route("/api/stations/nearest", get(nearest_json))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn render(template: &impl Template) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

/// The feed's stations, fetching them now if the feed has never loaded.
async fn station_snapshot(state: &AppState) -> StationSnapshot {
    let snapshot = state.feed.snapshot().await;
    if snapshot.is_loaded() {
        return snapshot;
    }
    state.refresh_stations().await;
    state.feed.snapshot().await
}

fn ends_session(e: &ApiError) -> bool {
    matches!(e, ApiError::Unauthorized | ApiError::InvalidToken)
}

/// The backend's own message if it gave one, else `fallback`.
fn failure_message(e: &ApiError, fallback: &str) -> String {
    match e {
        ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}

/// Unwrap a fetch for a page that can still render without it.
///
/// An ended session still fails the request. Anything else is logged,
/// becomes an inline message, and yields an empty value.
async fn or_inline<T: Default>(
    state: &AppState,
    result: Result<T, ApiError>,
    flash: &mut Option<Flash>,
    message: &str,
) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if ends_session(&e) => Err(state.api_failure(e).await),
        Err(e) => {
            warn!(error = %e, "{message}");
            flash.get_or_insert_with(|| Flash::error(message));
            Ok(T::default())
        }
    }
}

/// The inline message for a failed action, or the session error.
async fn action_failed(state: &AppState, e: ApiError, fallback: &str) -> Result<Flash, AppError> {
    if ends_session(&e) {
        return Err(state.api_failure(e).await);
    }
    warn!(error = %e, "{fallback}");
    Ok(Flash::error(failure_message(&e, fallback)))
}

/// Stations for a pick list: nearest first when the position is known,
/// backend order when it is unavailable, and none while still waiting.
fn station_rows(location: LocationState, stations: &[Station]) -> Vec<StationRow> {
    match location {
        LocationState::Pending => Vec::new(),
        LocationState::Unavailable => stations.iter().map(StationRow::from_station).collect(),
        LocationState::Known(p) => nearest_stations(Some(&p), stations)
            .ranked()
            .iter()
            .map(StationRow::from_ranked)
            .collect(),
    }
}

// ============================================================================
// Public pages
// ============================================================================

async fn landing_page() -> Result<Response, AppError> {
    render(&LandingTemplate)
}

async fn login_page(Query(query): Query<NoticeQuery>) -> Result<Response, AppError> {
    render(&LoginTemplate {
        flash: Flash::from_query(&query),
        email: String::new(),
    })
}

async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim().to_string();
    if email.is_empty() || form.password.is_empty() {
        return render(&LoginTemplate {
            flash: Some(Flash::error("Please enter your email and password.")),
            email,
        });
    }

    let req = LoginRequest {
        email: email.clone(),
        password: form.password,
    };
    match state.api.login(&req).await {
        Ok((token, user)) => {
            info!(user = %user.email, "logged in");
            state.session.establish(SessionData { token, user }).await?;
            Ok(redirect("/home"))
        }
        Err(e) => {
            warn!(error = %e, "login failed");
            let message = match &e {
                ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
                ApiError::Api { .. } | ApiError::Unauthorized => {
                    "Invalid email or password.".to_string()
                }
                _ => e.user_message(),
            };
            render(&LoginTemplate {
                flash: Some(Flash::error(message)),
                email,
            })
        }
    }
}

async fn register_page() -> Result<Response, AppError> {
    render(&RegisterTemplate {
        flash: None,
        name: String::new(),
        email: String::new(),
    })
}

async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_string();
    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return render(&RegisterTemplate {
            flash: Some(Flash::error("Please fill in every field.")),
            name,
            email,
        });
    }

    let req = RegisterRequest {
        name: name.clone(),
        email: email.clone(),
        password: form.password,
    };
    match state.api.register(&req).await {
        Ok(()) => {
            info!(user = %email, "registered");
            Ok(redirect(&Notice::Registered.redirect_to("/login")))
        }
        Err(e) => {
            warn!(error = %e, "registration failed");
            render(&RegisterTemplate {
                flash: Some(Flash::error(failure_message(&e, &e.user_message()))),
                name,
                email,
            })
        }
    }
}

async fn logout(State(state): State<AppState>) -> Result<Response, AppError> {
    state.session.clear().await?;
    Ok(redirect(&Notice::LoggedOut.redirect_to("/login")))
}

// ============================================================================
// Stations
// ============================================================================

async fn home_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
) -> Result<Response, AppError> {
    let location = pos.location();
    let snapshot = station_snapshot(&state).await;

    render(&HomeTemplate {
        sidebar: Sidebar::new(NavPage::Home, &user.session.user),
        location: LocationView::new(location, state.geolocation_timeout),
        map: MapView::new(&snapshot.stations, location.position()),
        stations: snapshot.stations.iter().map(StationRow::from_station).collect(),
        stations_loaded: snapshot.is_loaded(),
        updated: snapshot.fetched_at.as_ref().map(format_timestamp),
    })
}

async fn map_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
) -> Result<Response, AppError> {
    let location = pos.location();
    let snapshot = station_snapshot(&state).await;
    let map = MapView::new(&snapshot.stations, location.position());

    render(&MapTemplate {
        sidebar: Sidebar::new(NavPage::Map, &user.session.user),
        location: LocationView::new(location, state.geolocation_timeout),
        unplaced: snapshot.stations.len() - map.placed,
        map,
    })
}

/// Nearest stations as JSON. Without `lat`/`lng` the answer is
/// `awaiting_location` with no stations.
async fn nearest_json(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<NearestResponse>, JsonError> {
    let origin = match query.location() {
        LocationState::Known(p) => Some(p),
        LocationState::Pending => None,
        LocationState::Unavailable => {
            return Err(JsonError(AppError::BadRequest {
                message: "lat and lng must both be valid coordinates".to_string(),
            }));
        }
    };

    let snapshot = station_snapshot(&state).await;
    let nearest = nearest_stations(origin.as_ref(), &snapshot.stations);

    Ok(Json(NearestResponse {
        awaiting_location: nearest.is_awaiting_location(),
        stations: nearest
            .ranked()
            .iter()
            .map(NearestStationResult::from_ranked)
            .collect(),
    }))
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking form contents to render back into the page.
#[derive(Default)]
struct BookingFormView {
    station: Option<StationId>,
    start: String,
    end: String,
    estimate: Option<EstimateView>,
}

fn booking_template(
    state: &AppState,
    user: &CurrentUser,
    snapshot: &StationSnapshot,
    location: LocationState,
    show_all: bool,
    form: BookingFormView,
    flash: Option<Flash>,
) -> BookingTemplate {
    let nearest = nearest_stations(location.position(), &snapshot.stations);
    let ranked = nearest.ranked();
    let limit = if show_all { ranked.len() } else { NEAREST_PREVIEW };

    // Nearest first when ranked; otherwise every station, by name.
    let mut choices: Vec<&Station> = match &nearest {
        NearestStations::Ranked(r) if !r.is_empty() => r.iter().map(|r| &r.station).collect(),
        _ => {
            let mut all: Vec<&Station> = snapshot.stations.iter().collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            all
        }
    };
    // A preselected station must stay selectable even without coordinates.
    if let Some(id) = &form.station
        && !choices.iter().any(|s| &s.id == id)
        && let Some(s) = snapshot.find(id)
    {
        choices.push(s);
    }

    BookingTemplate {
        sidebar: Sidebar::new(NavPage::Booking, &user.session.user),
        location: LocationView::new(location, state.geolocation_timeout),
        flash,
        nearest: ranked.iter().take(limit).map(StationRow::from_ranked).collect(),
        show_all,
        has_more: ranked.len() > NEAREST_PREVIEW,
        options: choices
            .into_iter()
            .map(|s| StationOption::new(s, form.station.as_ref() == Some(&s.id)))
            .collect(),
        start: form.start,
        end: form.end,
        estimate: form.estimate,
        stations_loaded: snapshot.is_loaded(),
    }
}

async fn booking_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Query(query): Query<BookingQuery>,
) -> Result<Response, AppError> {
    let snapshot = station_snapshot(&state).await;
    let form = BookingFormView {
        station: query.station(),
        ..Default::default()
    };
    render(&booking_template(
        &state,
        &user,
        &snapshot,
        pos.location(),
        query.show_all(),
        form,
        None,
    ))
}

async fn booking_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Form(form): Form<BookingForm>,
) -> Result<Response, AppError> {
    let snapshot = station_snapshot(&state).await;
    let draft = BookingDraft {
        station: form.station(),
        start: form.start(),
        end: form.end(),
    };
    let estimate = state.tariff.estimate_for_station(
        draft.start,
        draft.end,
        draft.selected_station(&snapshot.stations),
    );
    let form_view = BookingFormView {
        station: draft.station.clone(),
        start: form.start.clone().unwrap_or_default(),
        end: form.end.clone().unwrap_or_default(),
        estimate: estimate.as_ref().map(EstimateView::new),
    };
    let page = |form_view, flash| {
        render(&booking_template(
            &state,
            &user,
            &snapshot,
            pos.location(),
            false,
            form_view,
            flash,
        ))
    };

    if form.action == BookingAction::Estimate {
        return page(form_view, None);
    }

    let valid = match draft.validate(&snapshot.stations) {
        Ok(valid) => valid,
        Err(rejection) => return page(form_view, Some(Flash::error(rejection.to_string()))),
    };

    let req = CreateBookingRequest {
        user_id: user.session.user.id.as_str().to_string(),
        station_id: valid.station.id.as_str().to_string(),
        start_time: valid.start,
        end_time: valid.end,
    };
    if let Err(e) = user.api.create_booking(&req).await {
        let flash = action_failed(&state, e, "Booking failed. Try again.").await?;
        return page(form_view, Some(flash));
    }

    info!(station = %valid.station.id, hours = valid.duration_hours(), "booking created");
    let mut target = format!(
        "{}&hours={:.2}",
        Notice::BookingCreated.redirect_to("/my-bookings"),
        valid.duration_hours()
    );
    if let Some(estimate) = &estimate {
        target.push_str(&format!("&total={}", estimate.total_display()));
    }
    Ok(redirect(&target))
}

async fn render_my_bookings(
    state: &AppState,
    user: &CurrentUser,
    mut flash: Option<Flash>,
) -> Result<Response, AppError> {
    let result = user.api.fetch_user_bookings(&user.session.user.id).await;
    let bookings = or_inline(
        state,
        result,
        &mut flash,
        "Failed to load bookings. Please try again.",
    )
    .await?;
    let board = BookingBoard::from_bookings(bookings);
    let rows = |list: &[Booking]| -> Vec<BookingRow> {
        list.iter().map(BookingRow::from_booking).collect()
    };

    render(&MyBookingsTemplate {
        sidebar: Sidebar::new(NavPage::MyBookings, &user.session.user),
        flash,
        active: rows(&board.active),
        completed: rows(&board.completed),
        cancelled: rows(&board.cancelled),
    })
}

async fn my_bookings_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    render_my_bookings(&state, &user, Flash::from_query(&query)).await
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = BookingId::new(id);
    match user.api.cancel_booking(&id).await {
        Ok(()) => {
            info!(booking = %id, "booking cancelled");
            Ok(redirect(&Notice::BookingCancelled.redirect_to("/my-bookings")))
        }
        Err(e) => {
            let flash =
                action_failed(&state, e, "Failed to cancel booking. Please try again.").await?;
            render_my_bookings(&state, &user, Some(flash)).await
        }
    }
}

// ============================================================================
// Swaps
// ============================================================================

async fn render_swap(
    state: &AppState,
    user: &CurrentUser,
    location: LocationState,
    show_history: bool,
    mut flash: Option<Flash>,
) -> Result<Response, AppError> {
    let uid = &user.session.user.id;
    let (active, history, snapshot) = futures::join!(
        user.api.fetch_active_swap(uid),
        user.api.fetch_user_swaps(uid),
        station_snapshot(state)
    );
    let active = or_inline(state, active, &mut flash, "Failed to load your active swap.").await?;
    let history = or_inline(state, history, &mut flash, "Failed to load swap history.").await?;
    let phase = SwapPhase::from_active(active);

    render(&SwapTemplate {
        sidebar: Sidebar::new(NavPage::Swap, &user.session.user),
        location: LocationView::new(location, state.geolocation_timeout),
        flash,
        active: phase.active().map(SwapRow::from_swap),
        stations: station_rows(location, &snapshot.stations),
        show_history,
        history: history.iter().map(SwapRow::from_swap).collect(),
    })
}

async fn swap_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Query(notice): Query<NoticeQuery>,
    Query(history): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    render_swap(
        &state,
        &user,
        pos.location(),
        history.show_history(),
        Flash::from_query(&notice),
    )
    .await
}

async fn borrow_battery(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Form(form): Form<StationForm>,
) -> Result<Response, AppError> {
    let location = pos.location();
    let snapshot = station_snapshot(&state).await;
    let Some(station) = snapshot.find(&StationId::new(form.station.trim())) else {
        let flash = Flash::error("Invalid station selected.");
        return render_swap(&state, &user, location, false, Some(flash)).await;
    };

    // Always ask the backend; a stale page may not show a newer swap.
    let phase = match user.api.fetch_active_swap(&user.session.user.id).await {
        Ok(active) => SwapPhase::from_active(active),
        Err(e) => {
            let flash =
                action_failed(&state, e, "Could not check your active swap. Try again.").await?;
            return render_swap(&state, &user, location, false, Some(flash)).await;
        }
    };
    if let Err(rejection) = phase.check_borrow(station) {
        info!(station = %station.id, %rejection, "borrow refused");
        let flash = Flash::error(rejection.to_string());
        return render_swap(&state, &user, location, false, Some(flash)).await;
    }

    if let Err(e) = user.api.create_swap(&user.session.user.id, &station.id).await {
        let flash = action_failed(&state, e, "Failed to borrow battery. Try again later.").await?;
        return render_swap(&state, &user, location, false, Some(flash)).await;
    }

    info!(station = %station.id, "battery borrowed");
    state.refresh_stations().await;
    let view = LocationView::new(location, state.geolocation_timeout);
    Ok(redirect(&view.link(&Notice::Borrowed.redirect_to("/swap"))))
}

async fn cancel_swap(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
) -> Result<Response, AppError> {
    let location = pos.location();
    let phase = match user.api.fetch_active_swap(&user.session.user.id).await {
        Ok(active) => SwapPhase::from_active(active),
        Err(e) => {
            let flash =
                action_failed(&state, e, "Failed to cancel swap. Try again later.").await?;
            return render_swap(&state, &user, location, false, Some(flash)).await;
        }
    };
    let swap = match phase.check_cancel() {
        Ok(swap) => swap,
        Err(rejection) => {
            let flash = Flash::error(rejection.to_string());
            return render_swap(&state, &user, location, false, Some(flash)).await;
        }
    };

    if let Err(e) = user.api.cancel_swap(&swap.id).await {
        let flash = action_failed(&state, e, "Failed to cancel swap. Try again later.").await?;
        return render_swap(&state, &user, location, false, Some(flash)).await;
    }

    info!(swap = %swap.id, "swap cancelled");
    state.refresh_stations().await;
    let view = LocationView::new(location, state.geolocation_timeout);
    Ok(redirect(&view.link(&Notice::SwapCancelled.redirect_to("/swap"))))
}

async fn render_my_swaps(
    state: &AppState,
    user: &CurrentUser,
    location: LocationState,
    show_history: bool,
    mut flash: Option<Flash>,
) -> Result<Response, AppError> {
    let (swaps, snapshot) = futures::join!(
        user.api.fetch_user_swaps(&user.session.user.id),
        station_snapshot(state)
    );
    let swaps =
        or_inline(state, swaps, &mut flash, "Failed to load swaps. Please try again.").await?;
    let phase = SwapPhase::from_history(&swaps);

    let deposit_stations = if phase.active().is_some() {
        station_rows(location, &snapshot.stations)
    } else {
        Vec::new()
    };

    render(&MySwapsTemplate {
        sidebar: Sidebar::new(NavPage::MySwaps, &user.session.user),
        location: LocationView::new(location, state.geolocation_timeout),
        flash,
        active: phase.active().map(SwapRow::from_swap),
        deposit_stations,
        show_history,
        history: swaps.iter().map(SwapRow::from_swap).collect(),
    })
}

async fn my_swaps_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Query(notice): Query<NoticeQuery>,
    Query(history): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    render_my_swaps(
        &state,
        &user,
        pos.location(),
        history.show_history(),
        Flash::from_query(&notice),
    )
    .await
}

async fn deposit_battery(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pos): Query<PositionQuery>,
    Form(form): Form<StationForm>,
) -> Result<Response, AppError> {
    let location = pos.location();
    let swaps = match user.api.fetch_user_swaps(&user.session.user.id).await {
        Ok(swaps) => swaps,
        Err(e) => {
            let flash = action_failed(&state, e, "Failed to deposit battery.").await?;
            return render_my_swaps(&state, &user, location, false, Some(flash)).await;
        }
    };
    let phase = SwapPhase::from_history(&swaps);
    let swap = match phase.check_deposit() {
        Ok(swap) => swap,
        Err(rejection) => {
            let flash = Flash::error(rejection.to_string());
            return render_my_swaps(&state, &user, location, false, Some(flash)).await;
        }
    };

    let snapshot = station_snapshot(&state).await;
    let Some(destination) = snapshot.find(&StationId::new(form.station.trim())) else {
        let flash = Flash::error("Invalid station selected.");
        return render_my_swaps(&state, &user, location, false, Some(flash)).await;
    };

    if let Err(e) = user.api.deposit_swap(&swap.id, &destination.id).await {
        let flash = action_failed(&state, e, "Failed to deposit battery.").await?;
        return render_my_swaps(&state, &user, location, false, Some(flash)).await;
    }

    info!(swap = %swap.id, station = %destination.id, "battery deposited");
    state.refresh_stations().await;
    let view = LocationView::new(location, state.geolocation_timeout);
    Ok(redirect(&view.link(&Notice::Deposited.redirect_to("/my-swaps"))))
}

// ============================================================================
// Profile
// ============================================================================

async fn profile_page(
    user: CurrentUser,
    Query(notice): Query<NoticeQuery>,
    Query(edit): Query<EditQuery>,
) -> Result<Response, AppError> {
    let me = &user.session.user;
    render(&ProfileTemplate {
        sidebar: Sidebar::new(NavPage::Profile, me),
        flash: Flash::from_query(&notice),
        name: me.name.clone(),
        email: me.email.clone(),
        editing: edit.editing(),
    })
}

async fn profile_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let me = &user.session.user;
    let name = form.name.trim().to_string();
    let page = |name: String, flash: Flash| {
        render(&ProfileTemplate {
            sidebar: Sidebar::new(NavPage::Profile, me),
            flash: Some(flash),
            name,
            email: me.email.clone(),
            editing: true,
        })
    };

    if name.is_empty() {
        return page(name, Flash::error("Name cannot be empty."));
    }

    let req = UpdateProfileRequest {
        name: name.clone(),
        password: form.new_password(),
    };
    match user.api.update_profile(&me.id, &req).await {
        Ok(updated) => {
            info!(user = %updated.email, "profile updated");
            state.session.update_user(updated).await?;
            Ok(redirect(&Notice::ProfileUpdated.redirect_to("/profile")))
        }
        Err(e) => {
            let flash = action_failed(&state, e, "Failed to update profile.").await?;
            page(name, flash)
        }
    }
}
