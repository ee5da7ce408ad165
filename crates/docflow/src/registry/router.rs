use crate::error::DomainError;
use crate::linkage::SourceSubmission;
use crate::notify::{Notifier, TaskSink};
use crate::registry::domain::{ContentSnapshot, DocumentId, DocumentKind, OutgoingAction, SubjectRef};
use crate::registry::incoming::{IncomingDraft, IncomingTransition};
use crate::registry::outgoing::OutgoingDraft;
use crate::registry::service::DocumentRegistry;
use crate::registry::store::DocumentStore;
use crate::signature::SignatureId;
use crate::template::DocumentTemplate;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// HTTP surface over the document registry. Mounted by the api service
/// alongside its own health and metrics routes.
pub fn registry_router<S, N, T>(registry: Arc<DocumentRegistry<S, N, T>>) -> Router
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
    T: TaskSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/incoming",
            post(create_incoming::<S, N, T>).get(list_incoming::<S, N, T>),
        )
        .route("/api/v1/incoming/:id", get(fetch_incoming::<S, N, T>))
        .route(
            "/api/v1/incoming/:id/transition",
            post(transition_incoming::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing",
            post(create_outgoing::<S, N, T>).get(list_outgoing::<S, N, T>),
        )
        .route("/api/v1/outgoing/:id", get(fetch_outgoing::<S, N, T>))
        .route(
            "/api/v1/outgoing/:id/transition",
            post(transition_outgoing::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing/:id/flow/advance",
            post(advance_flow::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing/:id/signature",
            post(attach_signature::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing/:id/signature/sign",
            post(sign_outgoing::<S, N, T>),
        )
        .route(
            "/api/v1/signatures/:id/verify",
            post(verify_signature::<S, N, T>),
        )
        .route(
            "/api/v1/signatures/:id/revoke",
            post(revoke_signature::<S, N, T>),
        )
        .route(
            "/api/v1/documents/:kind/:id/content",
            post(record_edit::<S, N, T>),
        )
        .route(
            "/api/v1/documents/:kind/:id/versions",
            get(list_versions::<S, N, T>),
        )
        .route(
            "/api/v1/documents/:kind/:id/versions/diff",
            get(diff_versions::<S, N, T>),
        )
        .route(
            "/api/v1/documents/:kind/:id/versions/:number/restore",
            post(restore_version::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing/:id/approvals",
            get(approval_trail::<S, N, T>),
        )
        .route("/api/v1/submissions", post(register_submission::<S, N, T>))
        .route(
            "/api/v1/templates",
            post(register_template::<S, N, T>).get(list_templates::<S, N, T>),
        )
        .route(
            "/api/v1/outgoing/:id/template",
            post(apply_template::<S, N, T>),
        )
        .with_state(registry)
}

type Registry<S, N, T> = State<Arc<DocumentRegistry<S, N, T>>>;

fn error_response(err: DomainError) -> Response {
    let status = match err {
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::State { .. } | DomainError::Uniqueness(_) => StatusCode::CONFLICT,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn respond<V: serde::Serialize>(result: Result<V, DomainError>, status: StatusCode) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => error_response(err),
    }
}

fn parse_kind(kind: &str) -> Result<DocumentKind, DomainError> {
    match kind {
        "incoming" => Ok(DocumentKind::Incoming),
        "outgoing" => Ok(DocumentKind::Outgoing),
        other => Err(DomainError::validation(format!(
            "unknown document kind '{other}'"
        ))),
    }
}

async fn create_incoming<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Json(draft): Json<IncomingDraft>,
) -> Response {
    respond(registry.create_incoming(draft), StatusCode::CREATED)
}

async fn list_incoming<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
) -> Response {
    (StatusCode::OK, Json(registry.list_incoming())).into_response()
}

async fn fetch_incoming<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
) -> Response {
    respond(registry.fetch_incoming(DocumentId(id)), StatusCode::OK)
}

async fn transition_incoming<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(transition): Json<IncomingTransition>,
) -> Response {
    let today = Utc::now().date_naive();
    respond(
        registry.transition_incoming(DocumentId(id), transition, today),
        StatusCode::OK,
    )
}

async fn create_outgoing<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Json(draft): Json<OutgoingDraft>,
) -> Response {
    respond(registry.create_outgoing(draft), StatusCode::CREATED)
}

async fn list_outgoing<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
) -> Response {
    (StatusCode::OK, Json(registry.list_outgoing())).into_response()
}

async fn fetch_outgoing<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
) -> Response {
    respond(registry.fetch_outgoing(DocumentId(id)), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct OutgoingTransitionRequest {
    action: OutgoingAction,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

async fn transition_outgoing<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(request): Json<OutgoingTransitionRequest>,
) -> Response {
    let id = DocumentId(id);
    let today = Utc::now().date_naive();
    let actor = request.actor.as_deref().unwrap_or("system");
    let result = match request.action {
        OutgoingAction::Submit => registry.submit_outgoing(id, actor, today),
        OutgoingAction::ApproveHead => registry.approve_head(id, actor, today),
        OutgoingAction::ApproveDirector => registry.approve_director(id, actor, today),
        OutgoingAction::ApproveSingle => registry.approve_single(id, actor, today),
        OutgoingAction::Reject => registry.reject_outgoing(id, actor, request.comment, today),
        OutgoingAction::MarkSent => registry.mark_sent(id, today),
        OutgoingAction::Cancel => registry.cancel_outgoing(id, today),
    };
    respond(result, StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct AdvanceFlowRequest {
    #[serde(default)]
    value: i64,
    #[serde(default)]
    actor: Option<String>,
}

async fn advance_flow<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdvanceFlowRequest>,
) -> Response {
    let today = Utc::now().date_naive();
    let actor = request.actor.as_deref().unwrap_or("system");
    respond(
        registry.advance_flow(DocumentId(id), request.value, actor, today),
        StatusCode::OK,
    )
}

#[derive(Debug, Deserialize)]
struct AttachSignatureRequest {
    signer_name: String,
    #[serde(default)]
    signer_title: Option<String>,
    #[serde(default)]
    signature_image_ref: Option<String>,
}

async fn attach_signature<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachSignatureRequest>,
) -> Response {
    respond(
        registry.attach_signature(
            DocumentId(id),
            &request.signer_name,
            request.signer_title,
            request.signature_image_ref,
        ),
        StatusCode::CREATED,
    )
}

async fn sign_outgoing<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
) -> Response {
    respond(registry.sign_outgoing(DocumentId(id)), StatusCode::OK)
}

async fn verify_signature<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
) -> Response {
    respond(registry.verify_signature(SignatureId(id)), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct RevokeSignatureRequest {
    reason: String,
}

async fn revoke_signature<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(request): Json<RevokeSignatureRequest>,
) -> Response {
    respond(
        registry.revoke_signature(SignatureId(id), &request.reason),
        StatusCode::OK,
    )
}

#[derive(Debug, Deserialize)]
struct RecordEditRequest {
    subject: String,
    #[serde(default)]
    note: Option<String>,
    change_note: String,
    actor: String,
}

async fn record_edit<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(request): Json<RecordEditRequest>,
) -> Response {
    let result = parse_kind(&kind).and_then(|kind| {
        registry.record_edit(
            SubjectRef::new(kind, DocumentId(id)),
            ContentSnapshot {
                subject: request.subject,
                note: request.note,
            },
            &request.change_note,
            &request.actor,
        )
    });
    respond(result, StatusCode::CREATED)
}

async fn list_versions<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Response {
    let result =
        parse_kind(&kind).map(|kind| registry.versions().list(&SubjectRef::new(kind, DocumentId(id))));
    respond(result, StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    from: u32,
    to: u32,
}

async fn diff_versions<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(query): Query<DiffQuery>,
) -> Response {
    let result = parse_kind(&kind).map(|kind| {
        registry
            .versions()
            .diff(&SubjectRef::new(kind, DocumentId(id)), query.from, query.to)
    });
    respond(result, StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    actor: String,
}

async fn restore_version<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path((kind, id, number)): Path<(String, Uuid, u32)>,
    Json(request): Json<RestoreRequest>,
) -> Response {
    let result = parse_kind(&kind).and_then(|kind| {
        registry.restore_version(SubjectRef::new(kind, DocumentId(id)), number, &request.actor)
    });
    respond(result, StatusCode::CREATED)
}

async fn approval_trail<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
) -> Response {
    (
        StatusCode::OK,
        Json(registry.trail().entries_for(DocumentId(id))),
    )
        .into_response()
}

async fn register_template<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Json(template): Json<DocumentTemplate>,
) -> Response {
    respond(registry.templates().register(template), StatusCode::CREATED)
}

async fn list_templates<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
) -> Response {
    (StatusCode::OK, Json(registry.templates().list())).into_response()
}

#[derive(Debug, Deserialize)]
struct ApplyTemplateRequest {
    code: String,
    #[serde(default)]
    actor: Option<String>,
}

async fn apply_template<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyTemplateRequest>,
) -> Response {
    let actor = request.actor.as_deref().unwrap_or("system");
    respond(
        registry.apply_template(DocumentId(id), &request.code, actor),
        StatusCode::OK,
    )
}

async fn register_submission<S: DocumentStore, N: Notifier, T: TaskSink>(
    State(registry): Registry<S, N, T>,
    Json(submission): Json<SourceSubmission>,
) -> Response {
    let today = Utc::now().date_naive();
    respond(
        registry.register_source_submission(&submission, today),
        StatusCode::CREATED,
    )
}
