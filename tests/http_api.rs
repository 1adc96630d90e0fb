//! End-to-end tests of `ResourceController` over `HttpApi` against an
//! in-process fake backend.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Json;
use serde_json::{Value, json};

use sitedesk::{
    ClientConfig, CollectionApi, ControllerError, DeleteContract, HttpApi, LocalFile, Mode, RecordId,
    ResourceController, ResourceSpec,
};

// =============================================================================
// FAKE BACKEND
// =============================================================================

/// A multipart part as the backend received it.
#[derive(Debug, Clone, PartialEq)]
struct Received {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    text: Option<String>,
    len: usize,
}

#[derive(Default)]
struct Backend {
    testimonials: Vec<Value>,
    uploads: Vec<Vec<Received>>,
    deleted: Vec<String>,
    resubmitted: Vec<Value>,
    next_id: u64,
}

type Shared = Arc<Mutex<Backend>>;

async fn list_testimonials(State(state): State<Shared>) -> Json<Value> {
    let backend = state.lock().unwrap();
    Json(json!({ "success": true, "testimonials": backend.testimonials }))
}

async fn add_testimonial(State(state): State<Shared>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field.file_name().map(ToOwned::to_owned);
        let content_type = field.content_type().map(ToOwned::to_owned);
        let bytes = field.bytes().await.unwrap();
        let text = file_name.is_none().then(|| String::from_utf8_lossy(&bytes).into_owned());
        parts.push(Received { name, file_name, content_type, text, len: bytes.len() });
    }

    let text = |name: &str| parts.iter().find(|p| p.name == name).and_then(|p| p.text.clone());
    if text("comment").is_some_and(|c| c.len() > 40) {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "success": false, "message": "Comment is too long" })),
        );
    }

    let mut backend = state.lock().unwrap();
    let mut record = json!({
        "name": text("name"),
        "designation": text("designation"),
        "comment": text("comment"),
        "testimonialImage": "https://cdn.example.com/t.png",
    });
    match text("id") {
        Some(id) => {
            let existing = backend
                .testimonials
                .iter_mut()
                .find(|r| id_text(r) == id)
                .unwrap();
            record["id"] = existing["id"].clone();
            *existing = record;
        }
        None => {
            backend.next_id += 1;
            record["id"] = json!(backend.next_id);
            backend.testimonials.push(record);
        }
    }
    backend.uploads.push(parts);
    (StatusCode::OK, Json(json!({ "success": true, "message": "Saved" })))
}

fn id_text(record: &Value) -> String {
    record["id"].as_str().map_or_else(|| record["id"].to_string(), ToOwned::to_owned)
}

async fn delete_testimonial(State(state): State<Shared>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let mut backend = state.lock().unwrap();
    let before = backend.testimonials.len();
    backend.testimonials.retain(|r| id_text(r) != id);
    if backend.testimonials.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Testimonial not found" })),
        );
    }
    backend.deleted.push(id);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn resubmit_reviews(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let mut backend = state.lock().unwrap();
    backend.testimonials = body["reviews"].as_array().cloned().unwrap_or_default();
    backend.resubmitted.push(body);
    StatusCode::NO_CONTENT
}

async fn about_unavailable() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Database unavailable" })),
    )
}

async fn portfolio_refused() -> Json<Value> {
    Json(json!({ "success": false, "message": "Session expired" }))
}

async fn spawn_backend(seed: Vec<Value>) -> (String, Shared) {
    let next_id = seed.iter().filter_map(|r| r["id"].as_u64()).max().unwrap_or(0);
    let state: Shared = Arc::new(Mutex::new(Backend { testimonials: seed, next_id, ..Backend::default() }));

    let app = Router::new()
        .route("/api/admin/get-testimonials", get(list_testimonials))
        .route("/api/admin/add-testimonials", post(add_testimonial))
        .route("/api/admin/delete-testimonials/{id}", delete(delete_testimonial))
        .route("/api/admin/add-reviews", post(resubmit_reviews))
        .route("/api/admin/get-aboutUs-info", get(about_unavailable))
        .route("/api/admin/get-portfolio-data", get(portfolio_refused))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn controller(base_url: &str, spec: ResourceSpec) -> ResourceController {
    let api = HttpApi::new(ClientConfig::new(base_url)).unwrap();
    ResourceController::new(spec, Arc::new(api))
}

/// Reviews against a backend that deletes by id.
fn by_id_reviews() -> ResourceSpec {
    let mut spec = ResourceSpec::reviews();
    spec.delete = DeleteContract::ById { path: "/api/admin/delete-testimonials/{id}".into() };
    spec
}

fn seed() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Ana", "designation": "CEO", "comment": "Great", "testimonialImage": "https://cdn.example.com/a.png"}),
        json!({"id": 2, "name": "Ben", "designation": "CTO", "comment": "Fast", "testimonialImage": {"image": "https://cdn.example.com/b.png", "id": 9}}),
    ]
}

fn ids(c: &ResourceController) -> Vec<String> {
    c.records().iter().filter_map(|r| r.id.as_ref().map(ToString::to_string)).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn load_reads_named_collection_and_media() {
    let (url, _) = spawn_backend(seed()).await;
    let c = controller(&url, ResourceSpec::reviews());

    c.load().await.unwrap();

    let records = c.records();
    assert_eq!(ids(&c), vec!["1", "2"]);
    assert_eq!(records[0].media("testimonialImage")[0].url, "https://cdn.example.com/a.png");
    assert_eq!(records[1].media("testimonialImage")[0].id, Some(RecordId::from(9)));
}

#[tokio::test]
async fn create_sends_multipart_without_id() {
    let (url, backend) = spawn_backend(vec![]).await;
    let c = controller(&url, ResourceSpec::reviews());

    c.set_draft_field("name", "Dana").unwrap();
    c.set_draft_field("designation", "Florist").unwrap();
    c.set_draft_field("comment", "Lovely photos").unwrap();
    c.attach_files("testimonialImage", vec![LocalFile::from_bytes("dana.webp", vec![1, 2, 3, 4])])
        .unwrap();
    c.submit().await.unwrap();

    let uploads = backend.lock().unwrap().uploads.clone();
    assert_eq!(uploads.len(), 1);
    let names: Vec<&str> = uploads[0].iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["name", "designation", "comment", "testimonialImage"]);
    let image = &uploads[0][3];
    assert_eq!(image.file_name.as_deref(), Some("dana.webp"));
    assert_eq!(image.content_type.as_deref(), Some("image/webp"));
    assert_eq!(image.len, 4);

    assert_eq!(ids(&c), vec!["1"]);
    assert_eq!(c.records()[0].text("name").as_deref(), Some("Dana"));
}

#[tokio::test]
async fn edit_sends_id_discriminator_first() {
    let (url, backend) = spawn_backend(seed()).await;
    let c = controller(&url, ResourceSpec::reviews());
    c.load().await.unwrap();

    c.begin_edit_by_id(&RecordId::from(2)).unwrap();
    c.set_draft_field("comment", "Fast and kind").unwrap();
    c.attach_files("testimonialImage", vec![LocalFile::from_bytes("ben.png", vec![0])]).unwrap();
    c.submit().await.unwrap();

    let uploads = backend.lock().unwrap().uploads.clone();
    assert_eq!(uploads[0][0].name, "id");
    assert_eq!(uploads[0][0].text.as_deref(), Some("2"));
    assert_eq!(c.mode(), Mode::Create);
    assert_eq!(c.records()[1].text("comment").as_deref(), Some("Fast and kind"));
}

#[tokio::test]
async fn multi_file_role_repeats_form_field() {
    let (url, backend) = spawn_backend(vec![]).await;
    let mut spec = ResourceSpec::reviews();
    spec.attachments[0].multiplicity = sitedesk::Multiplicity::Multiple;
    let c = controller(&url, spec);

    c.set_draft_field("name", "Eve").unwrap();
    c.set_draft_field("designation", "Baker").unwrap();
    c.set_draft_field("comment", "Nice").unwrap();
    c.attach_files(
        "testimonialImage",
        vec![LocalFile::from_bytes("1.jpg", vec![1]), LocalFile::from_bytes("2.jpg", vec![2, 2])],
    )
    .unwrap();
    c.submit().await.unwrap();

    let uploads = backend.lock().unwrap().uploads.clone();
    let files: Vec<_> = uploads[0]
        .iter()
        .filter(|p| p.name == "testimonialImage")
        .map(|p| p.file_name.clone().unwrap())
        .collect();
    assert_eq!(files, vec!["1.jpg", "2.jpg"]);
}

#[tokio::test]
async fn server_rejection_message_reaches_user() {
    let (url, backend) = spawn_backend(vec![]).await;
    let c = controller(&url, ResourceSpec::reviews());

    c.set_draft_field("name", "Fay").unwrap();
    c.set_draft_field("designation", "Tailor").unwrap();
    c.set_draft_field("comment", "A comment that is far too long for this backend").unwrap();
    c.attach_files("testimonialImage", vec![LocalFile::from_bytes("f.png", vec![0])]).unwrap();
    let err = c.submit().await.unwrap_err();

    assert_eq!(err, ControllerError::Server { status: Some(413), message: "Comment is too long".into() });
    assert_eq!(c.last_error().map(|e| e.to_string()).as_deref(), Some("Comment is too long"));
    assert_eq!(c.draft().field("name"), Some("Fay"));
    assert!(backend.lock().unwrap().uploads.is_empty());
}

#[tokio::test]
async fn delete_by_id_hits_path_and_reconciles() {
    let (url, backend) = spawn_backend(seed()).await;
    let c = controller(&url, by_id_reviews());
    c.load().await.unwrap();

    c.delete(Some(&RecordId::from(1))).await.unwrap();

    assert_eq!(backend.lock().unwrap().deleted, vec!["1".to_owned()]);
    assert_eq!(ids(&c), vec!["2"]);
    c.load().await.unwrap();
    assert_eq!(ids(&c), vec!["2"]);
}

#[tokio::test]
async fn failed_optimistic_delete_restores_list() {
    let (url, _) = spawn_backend(seed()).await;
    let c = controller(&url, by_id_reviews());
    c.load().await.unwrap();
    // Removed behind the client's back, so the delete 404s.
    let api = HttpApi::new(ClientConfig::new(&url)).unwrap();
    api.delete(c.spec(), sitedesk::DeleteRequest::ById(RecordId::from(2))).await.unwrap();

    let err = c.delete(Some(&RecordId::from(2))).await.unwrap_err();

    assert_eq!(err.to_string(), "Testimonial not found");
    assert_eq!(ids(&c), vec!["1"]);
}

#[tokio::test]
async fn reviews_delete_posts_remaining_records() {
    let (url, backend) = spawn_backend(seed()).await;
    let c = controller(&url, ResourceSpec::reviews());
    c.load().await.unwrap();

    c.delete(Some(&RecordId::from(1))).await.unwrap();

    let resubmitted = backend.lock().unwrap().resubmitted.clone();
    assert_eq!(resubmitted, vec![json!({ "reviews": [seed()[1].clone()] })]);
    assert_eq!(ids(&c), vec!["2"]);
    c.load().await.unwrap();
    assert_eq!(ids(&c), vec!["2"]);
}

#[tokio::test]
async fn delete_by_id_encodes_reserved_characters() {
    let (url, backend) = spawn_backend(vec![json!({"id": "a b/c?d", "name": "Odd"}), json!({"id": "a b"})]).await;
    let c = controller(&url, by_id_reviews());
    c.load().await.unwrap();

    c.delete(Some(&RecordId::new("a b/c?d"))).await.unwrap();

    assert_eq!(backend.lock().unwrap().deleted, vec!["a b/c?d".to_owned()]);
    assert_eq!(ids(&c), vec!["a b"]);
}

#[tokio::test]
async fn http_failure_status_carries_server_message() {
    let (url, _) = spawn_backend(vec![]).await;
    let c = controller(&url, ResourceSpec::about());

    let err = c.load().await.unwrap_err();

    assert_eq!(err, ControllerError::Server { status: Some(500), message: "Database unavailable".into() });
    assert!(err.retryable());
    assert!(c.records().is_empty());
}

#[tokio::test]
async fn success_false_envelope_is_server_error() {
    let (url, _) = spawn_backend(vec![]).await;
    let c = controller(&url, ResourceSpec::portfolio());

    let err = c.load().await.unwrap_err();

    assert_eq!(err, ControllerError::Server { status: None, message: "Session expired".into() });
}

#[tokio::test]
async fn missing_route_reports_status() {
    let (url, _) = spawn_backend(vec![]).await;
    let mut spec = ResourceSpec::reviews();
    spec.list_path = "/api/admin/nope".into();
    let c = controller(&url, spec);

    let err = c.load().await.unwrap_err();

    assert_eq!(err, ControllerError::Server { status: Some(404), message: "request failed with HTTP 404".into() });
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let c = controller(&format!("http://{addr}"), ResourceSpec::reviews());

    let err = c.load().await.unwrap_err();

    assert_eq!(err.code(), "E_NETWORK");
    assert!(err.retryable());
}
