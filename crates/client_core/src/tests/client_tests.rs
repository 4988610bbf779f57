use super::*;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{GeoPoint, ReportStatus};
use tokio::{net::TcpListener, sync::Mutex};

use crate::forms::{
    attachments::Attachment,
    sighting::{PublicSightingForm, ReportSightingForm},
};

#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    value: String,
}

#[derive(Clone, Default)]
struct ServerState {
    bypass_headers: Arc<Mutex<Vec<String>>>,
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    json_bodies: Arc<Mutex<Vec<Value>>>,
}

impl ServerState {
    async fn saw(&self, headers: &HeaderMap) {
        let value = headers
            .get(TUNNEL_BYPASS_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>")
            .to_string();
        self.bypass_headers.lock().await.push(value);
    }

    async fn read_parts(&self, mut multipart: Multipart) {
        let mut parts = self.parts.lock().await;
        while let Some(field) = multipart.next_field().await.expect("field") {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.expect("bytes");
            parts.push(ReceivedPart {
                name,
                file_name,
                content_type,
                value: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
    }
}

fn pet_json(id: &str, name: &str) -> Value {
    json!({
        "petId": id,
        "ownerId": "u-1",
        "status": "safe",
        "basicInfo": {"name": name, "photos": ["https://img/1.jpg"]},
        "specificInfo": {"species": "perro", "colors": ["café"], "temperament": "Juguetón,Tranquilo"},
        "ownerInfo": {"ownerName": "Ana", "ownerPhone": "8441234567", "ownerEmail": "ana@example.com"}
    })
}

async fn get_pet(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(pet_id): Path<String>,
) -> impl IntoResponse {
    state.saw(&headers).await;
    if pet_id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Pet not found"})));
    }
    (StatusCode::OK, Json(json!({"pet": pet_json(&pet_id, "Bruno")})))
}

async fn update_pet(
    State(state): State<ServerState>,
    Path(pet_id): Path<String>,
    multipart: Multipart,
) -> impl IntoResponse {
    if pet_id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Pet not found"})));
    }
    state.read_parts(multipart).await;
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "Mascota actualizada"})),
    )
}

async fn delete_pet() -> Json<Value> {
    Json(json!({"success": false, "message": "No autorizado"}))
}

async fn register_pet(
    State(state): State<ServerState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Json<Value> {
    state.saw(&headers).await;
    state.read_parts(multipart).await;
    Json(json!({"success": true, "petId": "server-assigned"}))
}

async fn my_pets(Path(owner_id): Path<String>) -> Json<Value> {
    assert_eq!(owner_id, "u-1");
    Json(json!({"pets": [pet_json("p-1", "Bruno"), pet_json("p-2", "Luna")]}))
}

async fn create_report(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.json_bodies.lock().await.push(body);
    Json(json!({"success": true, "reportId": "r-7"}))
}

async fn active_reports(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.queries.lock().await.push(query);
    Json(json!({"reports": [
        {"reportId": "r-1", "petId": "p-1", "distanceInKm": 1.2, "status": "active"},
        {"reportId": "r-2", "petId": "p-2", "distanceInKm": 3.4}
    ]}))
}

async fn public_sightings(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.queries.lock().await.push(query);
    Json(json!({"sightings": [{
        "sightingId": "s-1",
        "reportedBy": {"name": "Luis"},
        "location": {"latitude": 25.4, "longitude": -101.0, "address": "Alameda"},
        "description": "Perro café",
        "petDescription": {"species": "Perro", "approximateSize": "Mediano", "colors": ["café"]},
        "timestamp": {"_seconds": 1700000000, "_nanoseconds": 0}
    }]}))
}

async fn comment(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    state.queries.lock().await.push(query);
    StatusCode::OK
}

async fn mark_read() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "Firestore unavailable"})),
    )
}

async fn update_token(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.json_bodies.lock().await.push(body);
    Json(json!({"message": "Token actualizado"}))
}

async fn get_report(Path(report_id): Path<String>) -> Json<Value> {
    if report_id == "slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    Json(json!({"report": {
        "reportId": report_id,
        "petId": "p-1",
        "status": "active",
        "notificationRadius": 24,
        "lastSeenLocation": {"latitude": 25.4, "longitude": -101.0, "address": "Centro"},
        "searchRoute": [{
            "reportedBy": "u-2",
            "location": {"latitude": 25.41, "longitude": -101.01, "address": "Alameda"},
            "notes": "Corría hacia el parque",
            "timestamp": "2024-05-01T10:00:00Z"
        }],
        "petInfo": {"basicInfo": {"name": "Bruno"}}
    }}))
}

async fn add_report_sighting(
    State(state): State<ServerState>,
    Path(report_id): Path<String>,
    multipart: Multipart,
) -> Json<Value> {
    state.queries.lock().await.push(HashMap::from([(
        "report_id".to_string(),
        report_id,
    )]));
    state.read_parts(multipart).await;
    Json(json!({"success": true, "message": "Avistamiento agregado"}))
}

async fn create_public_sighting(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Json<Value> {
    state.read_parts(multipart).await;
    Json(json!({"success": true, "sightingId": "s-9"}))
}

async fn get_public_sighting(Path(sighting_id): Path<String>) -> Json<Value> {
    Json(json!({"sighting": {
        "sightingId": sighting_id,
        "reportedBy": "u-3",
        "location": {"latitude": 25.4, "longitude": -101.0, "address": "Plaza"},
        "description": "Perro sin collar",
        "petDescription": {"species": "Perro", "approximateSize": "Grande", "colors": ["negro"]},
        "comments": [{"userId": "u-1", "userName": "Ana", "comment": "Lo vi ayer"}],
        "status": "active"
    }}))
}

async fn spawn_api_server() -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServerState::default();
    let app = Router::new()
        .route("/pets/register", post(register_pet))
        .route("/pets/my-pets/:owner_id", get(my_pets))
        .route(
            "/pets/:pet_id",
            get(get_pet).put(update_pet).delete(delete_pet),
        )
        .route("/reports/create", post(create_report))
        .route("/reports/:report_id", get(get_report))
        .route("/reports/:report_id/sighting", post(add_report_sighting))
        .route("/sightings/active-reports", get(active_reports))
        .route("/sightings/public-sightings", get(public_sightings))
        .route(
            "/sightings/public-sightings/create",
            post(create_public_sighting),
        )
        .route("/sightings/public-sightings/:id", get(get_public_sighting))
        .route("/sightings/public-sightings/:id/comment", post(comment))
        .route("/notifications/:id/mark-read", post(mark_read))
        .route("/auth/update-fcm-token", post(update_token))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/"), state)
}

fn client_for(base: &str) -> LomitoClient {
    LomitoClient::with_base_url(Url::parse(base).expect("url"), Duration::from_secs(5))
        .expect("client")
}

#[tokio::test]
async fn get_pet_sends_bypass_header_and_unwraps_envelope() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);

    let pet = client.get_pet(&PetId::new("p-1")).await.expect("pet");

    assert_eq!(pet.basic_info.name, "Bruno");
    assert_eq!(pet.temperament_labels(), vec!["Juguetón", "Tranquilo"]);
    assert_eq!(*state.bypass_headers.lock().await, vec!["true".to_string()]);
}

#[tokio::test]
async fn missing_pet_maps_to_not_found() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let err = client
        .get_pet(&PetId::new("missing"))
        .await
        .expect_err("404");
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn register_pet_streams_multipart_with_attachment() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bruno.png");
    std::fs::write(&path, b"png-bytes").expect("write");

    let mut upload = MultipartUpload::new();
    upload
        .text("name", "Bruno")
        .repeated("colors", ["café", "blanco"])
        .file("photos", &Attachment::from_path(&path), "pet");

    let pet_id = client
        .register_pet(&PetId::new("client-id"), upload)
        .await
        .expect("register");
    assert_eq!(pet_id.as_str(), "server-assigned");

    let parts = state.parts.lock().await;
    let colors: Vec<_> = parts
        .iter()
        .filter(|p| p.name == "colors")
        .map(|p| p.value.as_str())
        .collect();
    assert_eq!(colors, vec!["café", "blanco"]);
    let photo = parts.iter().find(|p| p.name == "photos").expect("photo part");
    assert_eq!(photo.file_name.as_deref(), Some("bruno.png"));
    assert_eq!(photo.content_type.as_deref(), Some("image/png"));
    assert_eq!(photo.value, "png-bytes");
    assert_eq!(*state.bypass_headers.lock().await, vec!["true".to_string()]);
}

#[tokio::test]
async fn unreadable_attachment_fails_before_sending() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let mut upload = MultipartUpload::new();
    upload.file(
        "photos",
        &Attachment::from_path("/definitely/not/here.jpg"),
        "pet",
    );

    let err = client
        .register_pet(&PetId::new("x"), upload)
        .await
        .expect_err("io");
    assert!(matches!(err, ClientError::Io { .. }));
    assert!(state.parts.lock().await.is_empty());
}

#[tokio::test]
async fn edit_submission_is_sent_as_put_to_the_pet() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let mut upload = MultipartUpload::new();
    upload.text("name", "Bruno II");
    let submission = PetSubmission {
        mode: FormMode::Edit(PetId::new("p-9")),
        pet_id: PetId::new("p-9"),
        upload,
    };

    let pet_id = client.submit_pet(submission).await.expect("update");

    assert_eq!(pet_id.as_str(), "p-9");
    let parts = state.parts.lock().await;
    assert_eq!(parts[0].name, "name");
    assert_eq!(parts[0].value, "Bruno II");
}

#[tokio::test]
async fn explicit_failure_flag_is_rejected() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let err = client
        .delete_pet(&PetId::new("p-1"))
        .await
        .expect_err("rejected");
    assert!(matches!(err, ClientError::Rejected(ref m) if m == "No autorizado"));
}

#[tokio::test]
async fn server_error_surfaces_detail() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let err = client
        .mark_notification_read(&NotificationId::new("n-1"))
        .await
        .expect_err("500");
    match err {
        ClientError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Firestore unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn list_my_pets_decodes_every_record() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let pets = client.list_my_pets(&UserId::new("u-1")).await.expect("pets");
    let names: Vec<_> = pets.iter().map(|p| p.basic_info.name.as_str()).collect();
    assert_eq!(names, vec!["Bruno", "Luna"]);
}

#[tokio::test]
async fn create_report_posts_camel_case_json() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let request = CreateReportRequest {
        pet_id: PetId::new("p-1"),
        owner_id: UserId::new("u-1"),
        last_seen_location: GeoPoint {
            latitude: 25.4,
            longitude: -101.0,
            address: "Centro".into(),
        },
        notification_radius: 24,
        notes: "Collar rojo".into(),
    };

    let report_id = ReportDesk::create_report(&client, request)
        .await
        .expect("report");

    assert_eq!(report_id.as_str(), "r-7");
    let bodies = state.json_bodies.lock().await;
    assert_eq!(bodies[0]["petId"], "p-1");
    assert_eq!(bodies[0]["lastSeenLocation"]["address"], "Centro");
    assert_eq!(bodies[0]["notificationRadius"], 24);
}

#[tokio::test]
async fn active_reports_sends_position_and_paging() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);

    let reports = client
        .active_reports(&ActiveReportsQuery {
            user_lat: 25.5,
            user_lon: -101.1,
            limit: 20,
            offset: 0,
        })
        .await
        .expect("reports");

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].distance_in_km, Some(1.2));
    let queries = state.queries.lock().await;
    assert_eq!(queries[0]["user_lat"], "25.5");
    assert_eq!(queries[0]["limit"], "20");
}

#[tokio::test]
async fn public_sightings_omit_unset_filters() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);

    let sightings = client
        .public_sightings(&PublicSightingsQuery {
            limit: 10,
            ..PublicSightingsQuery::default()
        })
        .await
        .expect("sightings");

    assert_eq!(sightings[0].description, "Perro café");
    assert!(sightings[0].timestamp.as_ref().and_then(|t| t.to_utc()).is_some());
    let queries = state.queries.lock().await;
    assert!(!queries[0].contains_key("latitude"));
    assert_eq!(queries[0]["limit"], "10");
}

#[tokio::test]
async fn comment_goes_in_the_query_and_accepts_empty_body() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);

    client
        .comment_on_sighting(&SightingId::new("s-1"), &UserId::new("u-1"), "  Lo vi ayer ")
        .await
        .expect("comment");

    let queries = state.queries.lock().await;
    assert_eq!(queries[0]["user_id"], "u-1");
    assert_eq!(queries[0]["comment"], "Lo vi ayer");
}

#[tokio::test]
async fn blank_comment_is_a_validation_error() {
    let client = client_for("http://127.0.0.1:9/");
    let err = client
        .comment_on_sighting(&SightingId::new("s-1"), &UserId::new("u-1"), "   ")
        .await
        .expect_err("blank");
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn push_token_upload_uses_snake_case_body() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);

    client
        .store_push_token(&UserId::new("u-1"), "tok-123")
        .await
        .expect("token");

    let bodies = state.json_bodies.lock().await;
    assert_eq!(bodies[0], json!({"user_id": "u-1", "fcm_token": "tok-123"}));
}

#[tokio::test]
async fn slow_server_times_out() {
    let (base, _state) = spawn_api_server().await;
    let client = LomitoClient::with_base_url(
        Url::parse(&base).expect("url"),
        Duration::from_millis(200),
    )
    .expect("client");

    let err = client
        .get_report(&ReportId::new("slow"))
        .await
        .expect_err("timeout");
    assert!(matches!(err, ClientError::Timeout));
}

#[tokio::test]
async fn update_of_missing_pet_names_the_pet() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let err = client
        .update_pet(&PetId::new("missing"), MultipartUpload::new())
        .await
        .expect_err("404");
    assert!(matches!(err, ClientError::NotFound(ref what) if what == "la mascota"));
    assert_eq!(err.user_message(), "No se encontró la mascota.");
}

#[tokio::test]
async fn get_report_unwraps_report_envelope() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let report = client.get_report(&ReportId::new("r-3")).await.expect("report");

    assert_eq!(report.report_id.as_str(), "r-3");
    assert_eq!(report.status, ReportStatus::Active);
    assert_eq!(report.pet_name(), Some("Bruno"));
    assert_eq!(report.search_route.len(), 1);
    assert_eq!(report.search_route[0].location.address, "Alameda");
}

#[tokio::test]
async fn report_sighting_form_posts_multipart_to_its_report() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("visto.jpg");
    std::fs::write(&path, b"jpeg-bytes").expect("write");

    let mut form = ReportSightingForm::new(ReportId::new("r-3"), UserId::new("u-2"));
    form.set_location(GeoPoint {
        latitude: 25.41,
        longitude: -101.01,
        address: "Alameda".into(),
    })
    .expect("location");
    form.set_notes("Corría hacia el parque").expect("notes");
    form.add_photo(Attachment::from_path(&path)).expect("photo");
    form.submit(&client).await.expect("submit");

    assert_eq!(state.queries.lock().await[0]["report_id"], "r-3");
    let parts = state.parts.lock().await;
    let text = |name: &str| {
        parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.clone())
    };
    assert_eq!(text("reportedBy").as_deref(), Some("u-2"));
    assert_eq!(text("address").as_deref(), Some("Alameda"));
    assert_eq!(text("notes").as_deref(), Some("Corría hacia el parque"));
    let photo = parts.iter().find(|p| p.name == "photos").expect("photo part");
    assert_eq!(photo.file_name.as_deref(), Some("visto.jpg"));
    assert_eq!(photo.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(photo.value, "jpeg-bytes");
}

#[tokio::test]
async fn public_sighting_form_posts_snake_case_multipart() {
    let (base, state) = spawn_api_server().await;
    let client = client_for(&base);
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.png");
    std::fs::write(&first, b"a").expect("write");
    std::fs::write(&second, b"b").expect("write");

    let mut form = PublicSightingForm::new(UserId::new("u-3"));
    form.set_location(GeoPoint {
        latitude: 25.4,
        longitude: -101.0,
        address: "Plaza".into(),
    })
    .expect("location");
    form.set_description("Perro sin collar").expect("description");
    form.set_species("Perro").expect("species");
    form.set_approximate_size("Grande").expect("size");
    form.set_colors("negro, blanco").expect("colors");
    form.add_photo(Attachment::from_path(&first)).expect("photo");
    form.add_photo(Attachment::from_path(&second)).expect("photo");
    form.submit(&client).await.expect("submit");

    let parts = state.parts.lock().await;
    let values = |name: &str| -> Vec<String> {
        parts
            .iter()
            .filter(|p| p.name == name && p.file_name.is_none())
            .map(|p| p.value.clone())
            .collect()
    };
    assert_eq!(values("reported_by"), vec!["u-3"]);
    assert_eq!(values("approximate_size"), vec!["Grande"]);
    assert_eq!(values("colors"), vec!["negro", "blanco"]);
    let photos: Vec<_> = parts
        .iter()
        .filter(|p| p.name == "photos")
        .filter_map(|p| p.file_name.as_deref())
        .collect();
    assert_eq!(photos, vec!["a.png", "b.png"]);
}

#[tokio::test]
async fn get_public_sighting_unwraps_sighting_envelope() {
    let (base, _state) = spawn_api_server().await;
    let client = client_for(&base);

    let sighting = client
        .get_public_sighting(&SightingId::new("s-4"))
        .await
        .expect("sighting");

    assert_eq!(sighting.sighting_id.as_str(), "s-4");
    assert_eq!(
        sighting.reported_by.as_ref().map(|r| r.display_name()),
        Some("u-3")
    );
    assert_eq!(sighting.pet_description.colors, vec!["negro"]);
    assert_eq!(sighting.comments[0].comment, "Lo vi ayer");
}
