//! Chat Routes
//!
//! - GET /api/v1/chat - Auth gate plus the rendered page
//! - GET /api/v1/chat/messages - Current feed
//! - POST /api/v1/chat/messages - Post or edit a message

use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;

use super::authorization;
use crate::api::dto::{ChatPageResponse, FeedResponse, MessageDto, SubmitRequest, SubmitResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::AuthProvider;
use crate::chat::{ChatView, GateOutcome, MessageDraft, NoticeBoard, SubmitOutcome};
use crate::routing::RouteState;
use crate::store::DocumentId;

/// GET /api/v1/chat
///
/// Runs the auth gate with the request's query string. Signed-out visitors
/// are redirected to the login route; edit links pre-fill the draft.
pub async fn chat_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let auth = Arc::new(state.sessions.request_auth(authorization(&headers)));
    let route = Arc::new(RouteState::from_query_string(query.as_deref().unwrap_or("")));
    let page = state.chat_page(auth, route.clone(), Arc::new(NoticeBoard::new()));

    if page.check_user().await == GateOutcome::Redirected {
        let target = route
            .last_navigation()
            .unwrap_or_else(|| state.settings.login_route.clone());
        return Redirect::to(&target).into_response();
    }

    let view = ChatView {
        draft: page.draft().await,
        messages: state.feed.messages(),
    };
    Json(ChatPageResponse::from(&view)).into_response()
}

/// GET /api/v1/chat/messages
pub async fn list_messages(State(state): State<Arc<AppState>>) -> Json<FeedResponse> {
    let messages: Vec<MessageDto> = state.feed.messages().iter().map(MessageDto::from).collect();
    Json(FeedResponse {
        count: messages.len(),
        messages,
    })
}

/// POST /api/v1/chat/messages
///
/// Posts a new message, or edits the one named by `id`.
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let auth = Arc::new(state.sessions.request_auth(authorization(&headers)));
    if auth.current_user().is_none() {
        return Err(ApiError::Unauthorized("Sign in to post a message".to_string()));
    }

    let draft = match request.id {
        Some(raw) => {
            let id = DocumentId::parse(raw).map_err(|e| ApiError::Validation(e.to_string()))?;
            MessageDraft::editing(id, request.comment)
        }
        None => MessageDraft::new(request.comment),
    };

    let notices = Arc::new(NoticeBoard::new());
    let page = state.chat_page(auth, Arc::new(RouteState::default()), notices.clone());
    page.set_draft(draft).await;

    let (status, label, id) = match page.submit_message().await? {
        SubmitOutcome::Created(id) => (StatusCode::CREATED, "created", id),
        SubmitOutcome::Updated(id) => (StatusCode::OK, "updated", id),
    };

    Ok((
        status,
        Json(SubmitResponse {
            status: label.to_string(),
            id: id.to_string(),
            notices: notices.take(),
        }),
    ))
}
