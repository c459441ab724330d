//! Guestbook chat page
//!
//! Owns the form draft and the live feed. Submitting validates the draft
//! and issues exactly one store write; the visible list only changes when
//! the feed subscription delivers the store's new result set.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::feed::LiveFeed;
use super::message::{create_payload, update_payload, Message, MessageDraft};
use super::notify::Notice;
use super::validation::{validate_comment, ValidationError};
use super::PageContext;
use crate::auth::AuthState;
use crate::routing::Navigator;
use crate::store::{DocumentId, DocumentPath, StoreError, StoreResult};

/// What a successful submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(DocumentId),
    Updated(DocumentId),
}

/// Why a submit issued no write, or why the write failed
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Sign in to post a message")]
    Unauthenticated,

    #[error("Could not save message: {0}")]
    Transport(#[from] StoreError),
}

/// Result of running the auth gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Auth state still loading; nothing done
    Pending,
    /// No user; navigated to the login route
    Redirected,
    /// User present; draft pre-filled from the URL
    Prefilled,
    /// User present; nothing to pre-fill
    Ready,
}

/// Rendered page state
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub draft: MessageDraft,
    pub messages: Vec<Message>,
}

impl ChatView {
    /// Feed lines as displayed, newest first
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(Message::display_line).collect()
    }
}

/// The chat page component
pub struct ChatPage {
    ctx: PageContext,
    draft: Arc<RwLock<MessageDraft>>,
    feed: Option<LiveFeed>,
    auth_task: Option<JoinHandle<()>>,
}

impl ChatPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            draft: Arc::new(RwLock::new(MessageDraft::default())),
            feed: None,
            auth_task: None,
        }
    }

    /// Run the auth gate, start the feed and follow auth changes
    pub async fn mount(&mut self) -> StoreResult<GateOutcome> {
        if self.auth_task.is_some() {
            let outcome = self.check_user().await;
            self.mount_feed().await?;
            return Ok(outcome);
        }

        // Subscribe before reading so no change slips between the two
        let mut auth = self.ctx.auth.watch();
        let current = auth.borrow_and_update().clone();
        let outcome = self.on_auth_change(&current).await;

        self.mount_feed().await?;

        let navigator = Arc::clone(&self.ctx.navigator);
        let draft = Arc::clone(&self.draft);
        let login_route = self.ctx.settings.login_route.clone();

        self.auth_task = Some(tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                let state = auth.borrow_and_update().clone();
                let outcome = run_gate(&state, navigator.as_ref(), &draft, &login_route).await;
                tracing::debug!(outcome = ?outcome, "Auth state changed");
            }
        }));

        Ok(outcome)
    }

    async fn mount_feed(&mut self) -> StoreResult<()> {
        if self.feed.is_none() {
            self.feed = Some(LiveFeed::mount(self.ctx.store.as_ref(), &self.ctx.settings).await?);
        }
        Ok(())
    }

    /// Tear down the feed subscription and the auth watcher
    pub async fn unmount(&mut self) {
        if let Some(task) = self.auth_task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(mut feed) = self.feed.take() {
            feed.unmount().await;
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.feed.is_some()
    }

    /// Run the auth gate against the provider's current state
    pub async fn check_user(&self) -> GateOutcome {
        self.on_auth_change(&self.ctx.auth.state()).await
    }

    /// React to an authentication state
    pub async fn on_auth_change(&self, state: &AuthState) -> GateOutcome {
        run_gate(
            state,
            self.ctx.navigator.as_ref(),
            &self.draft,
            &self.ctx.settings.login_route,
        )
        .await
    }

    /// Input change handler
    pub async fn set_comment(&self, comment: impl Into<String>) {
        self.draft.write().await.comment = comment.into();
    }

    pub async fn set_draft(&self, draft: MessageDraft) {
        *self.draft.write().await = draft;
    }

    pub async fn draft(&self) -> MessageDraft {
        self.draft.read().await.clone()
    }

    /// Feed contents, empty until mounted
    pub fn messages(&self) -> Vec<Message> {
        self.feed.as_ref().map(LiveFeed::messages).unwrap_or_default()
    }

    /// Receiver for feed changes, if mounted
    pub fn feed_watch(&self) -> Option<tokio::sync::watch::Receiver<Vec<Message>>> {
        self.feed.as_ref().map(LiveFeed::watch)
    }

    pub async fn render(&self) -> ChatView {
        ChatView {
            draft: self.draft().await,
            messages: self.messages(),
        }
    }

    /// Form submit handler
    ///
    /// Creates a message when the draft has no id, otherwise updates the
    /// message the draft points at. Every outcome is also reported to the
    /// notifier.
    pub async fn submit_message(&self) -> Result<SubmitOutcome, SubmitError> {
        let result = self.submit_draft().await;

        match &result {
            Ok(SubmitOutcome::Created(id)) => {
                tracing::info!(id = %id, "Message posted");
                self.ctx.notifier.notify(Notice::success("Message posted"));
            }
            Ok(SubmitOutcome::Updated(id)) => {
                tracing::info!(id = %id, "Message updated");
                self.ctx.notifier.notify(Notice::success("Message updated"));
            }
            Err(SubmitError::Validation(e)) => {
                tracing::warn!(reason = %e, "Message rejected");
                self.ctx.notifier.notify(Notice::error(e.to_string()));
            }
            Err(e @ SubmitError::Unauthenticated) => {
                tracing::warn!("Submit without a signed-in user");
                self.ctx.notifier.notify(Notice::error(e.to_string()));
            }
            Err(e @ SubmitError::Transport(_)) => {
                tracing::error!(error = %e, "Message write failed");
                self.ctx.notifier.notify(Notice::error(e.to_string()));
            }
        }

        result
    }

    async fn submit_draft(&self) -> Result<SubmitOutcome, SubmitError> {
        let draft = self.draft().await;
        validate_comment(&draft.comment, self.ctx.settings.max_comment_len)?;

        let collection = &self.ctx.settings.collection;
        match draft.id {
            Some(id) => {
                let path = DocumentPath::new(collection.clone(), id.clone())?;
                self.ctx
                    .store
                    .update(&path, update_payload(&draft.comment))
                    .await?;
                Ok(SubmitOutcome::Updated(id))
            }
            None => {
                let author = self
                    .ctx
                    .auth
                    .current_user()
                    .ok_or(SubmitError::Unauthenticated)?;
                let id = self
                    .ctx
                    .store
                    .create(collection, create_payload(&draft.comment, &author))
                    .await?;
                *self.draft.write().await = MessageDraft::default();
                Ok(SubmitOutcome::Created(id))
            }
        }
    }
}

impl Drop for ChatPage {
    fn drop(&mut self) {
        if let Some(task) = self.auth_task.take() {
            task.abort();
        }
    }
}

/// The auth gate: redirect when signed out, pre-fill edits from the URL
async fn run_gate(
    state: &AuthState,
    navigator: &dyn Navigator,
    draft: &RwLock<MessageDraft>,
    login_route: &str,
) -> GateOutcome {
    if state.loading {
        return GateOutcome::Pending;
    }

    if state.user.is_none() {
        navigator.navigate(login_route);
        return GateOutcome::Redirected;
    }

    let params = navigator.current_query_params();
    let Some(raw_id) = params.get("id") else {
        return GateOutcome::Ready;
    };

    match DocumentId::parse(raw_id.as_str()) {
        Ok(id) => {
            let comment = params.get("comment").cloned().unwrap_or_default();
            *draft.write().await = MessageDraft::editing(id, comment);
            GateOutcome::Prefilled
        }
        Err(e) => {
            tracing::warn!(id = %raw_id, error = %e, "Ignoring malformed edit link");
            GateOutcome::Ready
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthHandle, AuthProvider, User};
    use crate::chat::notify::{NoticeBoard, NoticeLevel};
    use crate::chat::ChatSettings;
    use crate::routing::{RouteState, LOGIN_ROUTE};
    use crate::store::{
        DocumentSnapshot, DocumentStore, FieldValue, Fields, MemoryStore, Query, QuerySnapshot,
        StoreStats, Subscription,
    };
    use async_trait::async_trait;

    struct Harness {
        store: Arc<MemoryStore>,
        auth: Arc<AuthHandle>,
        route: Arc<RouteState>,
        notices: Arc<NoticeBoard>,
    }

    impl Harness {
        fn new(auth: AuthHandle, query: &str) -> Self {
            Self {
                store: Arc::new(MemoryStore::in_memory()),
                auth: Arc::new(auth),
                route: Arc::new(RouteState::from_query_string(query)),
                notices: Arc::new(NoticeBoard::new()),
            }
        }

        fn signed_in() -> Self {
            Self::new(AuthHandle::signed_in(ada()), "")
        }

        fn page(&self) -> ChatPage {
            ChatPage::new(PageContext {
                store: self.store.clone(),
                auth: self.auth.clone(),
                navigator: self.route.clone(),
                notifier: self.notices.clone(),
                settings: ChatSettings::default(),
            })
        }

        async fn writes(&self) -> u64 {
            self.store.stats().await.unwrap().writes
        }
    }

    fn ada() -> User {
        User::new("u1")
            .display_name("Ada")
            .photo_url("https://img/ada.png")
            .email("ada@example.com")
    }

    #[tokio::test]
    async fn test_submit_creates_one_record_with_profile() {
        let h = Harness::signed_in();
        let page = h.page();

        page.set_comment("hello").await;
        let outcome = page.submit_message().await.unwrap();
        let SubmitOutcome::Created(id) = outcome else {
            panic!("expected a create");
        };

        assert_eq!(h.writes().await, 1);
        let doc = h
            .store
            .get(&DocumentPath::new("chats", id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_str("comment"), Some("hello"));
        assert_eq!(doc.get_str("user"), Some("u1"));
        assert_eq!(doc.get_str("avatar"), Some("https://img/ada.png"));
        assert_eq!(doc.get_str("username"), Some("Ada"));
        assert_eq!(doc.get_str("email"), Some("ada@example.com"));
        assert!(doc.get("timestamp").and_then(FieldValue::as_timestamp).is_some());

        // The form is cleared after a create
        assert_eq!(page.draft().await, MessageDraft::default());
        assert_eq!(h.notices.take()[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_invalid_comments_issue_no_writes() {
        let h = Harness::signed_in();
        let page = h.page();

        page.set_comment("").await;
        assert!(matches!(
            page.submit_message().await,
            Err(SubmitError::Validation(ValidationError::Empty))
        ));

        page.set_comment("x".repeat(1001)).await;
        assert!(matches!(
            page.submit_message().await,
            Err(SubmitError::Validation(ValidationError::TooLong { .. }))
        ));

        assert_eq!(h.writes().await, 0);
        // Rejected text stays in the form
        assert_eq!(page.draft().await.comment.len(), 1001);
        let notices = h.notices.take();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_draft_with_id_updates_in_place() {
        let h = Harness::signed_in();
        let page = h.page();

        page.set_comment("original").await;
        let SubmitOutcome::Created(id) = page.submit_message().await.unwrap() else {
            panic!("expected a create");
        };
        let path = DocumentPath::new("chats", id.clone()).unwrap();
        let before = h.store.get(&path).await.unwrap().unwrap();

        page.set_draft(MessageDraft::editing(id.clone(), "edited")).await;
        let outcome = page.submit_message().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Updated(id));

        let stats = h.store.stats().await.unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.writes, 2);

        let after = h.store.get(&path).await.unwrap().unwrap();
        assert_eq!(after.get_str("comment"), Some("edited"));
        assert_eq!(after.get_str("username"), Some("Ada"));
        assert!(
            after.get("timestamp").and_then(FieldValue::as_timestamp)
                > before.get("timestamp").and_then(FieldValue::as_timestamp)
        );
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_is_transport_error() {
        let h = Harness::signed_in();
        let page = h.page();

        page.set_draft(MessageDraft::editing(DocumentId::parse("ghost").unwrap(), "x"))
            .await;
        assert!(matches!(
            page.submit_message().await,
            Err(SubmitError::Transport(StoreError::NotFound(_)))
        ));
        assert_eq!(h.writes().await, 0);
    }

    #[tokio::test]
    async fn test_create_requires_user() {
        let h = Harness::new(AuthHandle::signed_out(), "");
        let page = h.page();

        page.set_comment("hello").await;
        assert!(matches!(
            page.submit_message().await,
            Err(SubmitError::Unauthenticated)
        ));
        assert_eq!(h.writes().await, 0);
    }

    #[tokio::test]
    async fn test_scenario_hello_appears_first_in_feed() {
        let h = Harness::signed_in();
        let mut page = h.page();
        page.mount().await.unwrap();
        let mut feed = page.feed_watch().unwrap();

        page.set_comment("hello").await;
        page.submit_message().await.unwrap();
        feed.changed().await.unwrap();

        let view = page.render().await;
        assert_eq!(view.lines()[0], "Ada: hello");
        page.unmount().await;
    }

    #[tokio::test]
    async fn test_no_optimistic_insert_after_unmount() {
        let h = Harness::signed_in();
        let mut page = h.page();
        page.mount().await.unwrap();
        let feed = page.feed_watch().unwrap();
        assert_eq!(h.store.listener_count(), 1);

        page.unmount().await;
        assert_eq!(h.store.listener_count(), 0);

        page.set_comment("after unmount").await;
        page.submit_message().await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(h.writes().await, 1);
        assert!(!matches!(feed.has_changed(), Ok(true)));
        assert!(feed.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_gate_redirects_signed_out_visitor() {
        let h = Harness::new(AuthHandle::signed_out(), "id=m1&comment=hi");
        let mut page = h.page();

        let outcome = page.mount().await.unwrap();
        assert_eq!(outcome, GateOutcome::Redirected);
        assert_eq!(h.route.last_navigation().as_deref(), Some(LOGIN_ROUTE));
        // No pre-fill for a redirected visitor
        assert_eq!(page.draft().await, MessageDraft::default());
        page.unmount().await;
    }

    /// Provider whose direct read lags behind its watch channel
    struct LaggingAuth {
        stale: AuthState,
        live: AuthHandle,
    }

    impl AuthProvider for LaggingAuth {
        fn state(&self) -> AuthState {
            self.stale.clone()
        }

        fn watch(&self) -> tokio::sync::watch::Receiver<AuthState> {
            self.live.watch()
        }
    }

    #[tokio::test]
    async fn test_mount_gates_on_watched_state() {
        let route = Arc::new(RouteState::default());
        let mut page = ChatPage::new(PageContext {
            store: Arc::new(MemoryStore::in_memory()),
            auth: Arc::new(LaggingAuth {
                stale: AuthState::loading(),
                live: AuthHandle::signed_out(),
            }),
            navigator: route.clone(),
            notifier: Arc::new(NoticeBoard::new()),
            settings: ChatSettings::default(),
        });

        let outcome = page.mount().await.unwrap();
        assert_eq!(outcome, GateOutcome::Redirected);
        assert_eq!(route.last_navigation().as_deref(), Some(LOGIN_ROUTE));
        page.unmount().await;
    }

    #[tokio::test]
    async fn test_gate_waits_while_loading() {
        let h = Harness::new(AuthHandle::loading(), "");
        let page = h.page();

        assert_eq!(page.check_user().await, GateOutcome::Pending);
        assert!(h.route.history().is_empty());
    }

    #[tokio::test]
    async fn test_gate_prefills_edit_link() {
        let h = Harness::new(AuthHandle::signed_in(ada()), "id=m1&comment=fix%20typo");
        let page = h.page();

        assert_eq!(page.check_user().await, GateOutcome::Prefilled);
        let draft = page.draft().await;
        assert_eq!(draft.id.as_ref().map(DocumentId::as_str), Some("m1"));
        assert_eq!(draft.comment, "fix typo");
    }

    #[tokio::test]
    async fn test_gate_reacts_to_auth_changes_after_mount() {
        let h = Harness::new(AuthHandle::loading(), "");
        let mut page = h.page();
        assert_eq!(page.mount().await.unwrap(), GateOutcome::Pending);

        let mut watcher = h.auth.watch();
        h.auth.set_user(None);
        watcher.changed().await.unwrap();

        // Let the watcher task process the change
        for _ in 0..10 {
            if h.route.last_navigation().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.route.last_navigation().as_deref(), Some(LOGIN_ROUTE));
        page.unmount().await;
    }

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn create(&self, _: &str, _: Fields) -> StoreResult<DocumentId> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        async fn update(&self, _: &DocumentPath, _: Fields) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        async fn get(&self, _: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>> {
            Ok(None)
        }
        async fn query(&self, _: &Query) -> StoreResult<QuerySnapshot> {
            Ok(QuerySnapshot::default())
        }
        async fn subscribe(&self, _: Query) -> StoreResult<Subscription> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        async fn stats(&self) -> StoreResult<StoreStats> {
            Ok(StoreStats::default())
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let notices = Arc::new(NoticeBoard::new());
        let page = ChatPage::new(PageContext {
            store: Arc::new(BrokenStore),
            auth: Arc::new(AuthHandle::signed_in(ada())),
            navigator: Arc::new(RouteState::default()),
            notifier: notices.clone(),
            settings: ChatSettings::default(),
        });

        page.set_comment("hello").await;
        assert!(matches!(
            page.submit_message().await,
            Err(SubmitError::Transport(_))
        ));
        // A failed create keeps the draft
        assert_eq!(page.draft().await.comment, "hello");
        assert_eq!(notices.take()[0].level, NoticeLevel::Error);
    }
}
