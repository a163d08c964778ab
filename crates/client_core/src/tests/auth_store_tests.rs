use super::*;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use uuid::Uuid;

use shared::{domain::UserId, protocol::Page};

use crate::{session::MemorySessionStore, AppContext, Settings};

#[derive(Clone)]
struct AuthServerState {
    role: Arc<Mutex<UserRole>>,
    fail_login: Arc<Mutex<bool>>,
    fail_logout: Arc<Mutex<bool>>,
    drafts_auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl AuthServerState {
    fn new() -> Self {
        Self {
            role: Arc::new(Mutex::new(UserRole::Editor)),
            fail_login: Arc::new(Mutex::new(false)),
            fail_logout: Arc::new(Mutex::new(false)),
            drafts_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn sample_user(role: UserRole) -> User {
    User {
        id: UserId(Uuid::new_v4()),
        email: "staff@example.com".to_string(),
        full_name: Some("Sam Staff".to_string()),
        role,
        created_at: "2024-05-01T10:00:00Z".parse().expect("timestamp"),
    }
}

fn auth_response(role: UserRole) -> AuthResponse {
    AuthResponse {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        user: sample_user(role),
    }
}

async fn handle_login(
    State(state): State<AuthServerState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<shared::error::ApiErrorBody>)> {
    if *state.fail_login.lock().await || request.password.is_empty() {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(shared::error::ApiErrorBody::new(
                401,
                "Invalid email or password",
            )),
        ));
    }
    let role = *state.role.lock().await;
    let mut response = auth_response(role);
    response.user.email = request.email;
    Ok(Json(response))
}

async fn handle_register(
    State(state): State<AuthServerState>,
    Json(request): Json<RegisterRequest>,
) -> Json<AuthResponse> {
    let role = *state.role.lock().await;
    let mut response = auth_response(role);
    response.user.email = request.email;
    response.user.full_name = request.full_name;
    Json(response)
}

async fn handle_logout(State(state): State<AuthServerState>) -> StatusCode {
    if *state.fail_logout.lock().await {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn handle_drafts(
    State(state): State<AuthServerState>,
    headers: HeaderMap,
) -> Json<Page<shared::protocol::DraftSummary>> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.drafts_auth_headers.lock().await.push(auth);
    Json(Page {
        content: Vec::new(),
        total_elements: 0,
        total_pages: 0,
        size: 100,
        number: 0,
        first: true,
        last: true,
    })
}

async fn spawn_auth_server() -> (String, AuthServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = AuthServerState::new();
    let app = Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/register", post(handle_register))
        .route("/auth/logout", post(handle_logout))
        .route("/editor/drafts", get(handle_drafts))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn settings_for(server_url: &str) -> Settings {
    Settings {
        server_url: server_url.to_string(),
        database_url: "sqlite::memory:".to_string(),
        request_timeout_secs: 5,
    }
}

async fn context_for(server_url: &str) -> (AppContext, Arc<MemorySessionStore>) {
    let memory = Arc::new(MemorySessionStore::new());
    let context = AppContext::with_persistence(
        &settings_for(server_url),
        memory.clone() as Arc<dyn SessionPersistence>,
    )
    .await
    .expect("context");
    (context, memory)
}

#[tokio::test]
async fn login_persists_session_and_authenticates() {
    let (server_url, _state) = spawn_auth_server().await;
    let (context, memory) = context_for(&server_url).await;

    let user = context
        .auth
        .login("staff@example.com", "hunter2")
        .await
        .expect("login");
    assert_eq!(user.role, UserRole::Editor);

    let snapshot = context.auth.snapshot().await;
    assert!(snapshot.is_authenticated);
    assert_eq!(
        snapshot.user.as_ref().map(|u| u.email.as_str()),
        Some("staff@example.com")
    );

    let persisted = memory.current().await.expect("persisted session");
    assert_eq!(persisted.access_token, "access-1");
    assert_eq!(persisted.refresh_token, "refresh-1");
    assert_eq!(persisted.user.email, "staff@example.com");
}

#[tokio::test]
async fn login_failure_surfaces_envelope_message() {
    let (server_url, state) = spawn_auth_server().await;
    *state.fail_login.lock().await = true;
    let (context, memory) = context_for(&server_url).await;

    let err = context
        .auth
        .login("staff@example.com", "wrong")
        .await
        .expect_err("must fail");

    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(memory.current().await.is_none());
    assert!(!context.auth.snapshot().await.is_authenticated);
}

#[tokio::test]
async fn login_attaches_bearer_to_subsequent_requests() {
    let (server_url, state) = spawn_auth_server().await;
    let (context, _memory) = context_for(&server_url).await;

    context
        .auth
        .login("staff@example.com", "hunter2")
        .await
        .expect("login");
    context.drafts.fetch_drafts().await;

    let headers = state.drafts_auth_headers.lock().await;
    assert_eq!(headers.as_slice(), [Some("Bearer access-1".to_string())]);
}

#[tokio::test]
async fn editor_sees_create_affordance_on_empty_list_and_viewer_does_not() {
    let (server_url, state) = spawn_auth_server().await;

    let (editor_context, _) = context_for(&server_url).await;
    editor_context
        .auth
        .login("editor@example.com", "hunter2")
        .await
        .expect("login");
    editor_context.drafts.fetch_drafts().await;
    let drafts = editor_context.drafts.snapshot().await;
    assert!(drafts.drafts.is_empty());
    assert!(editor_context.auth.is_editor().await);

    *state.role.lock().await = UserRole::Viewer;
    let (viewer_context, _) = context_for(&server_url).await;
    viewer_context
        .auth
        .login("viewer@example.com", "hunter2")
        .await
        .expect("login");
    viewer_context.drafts.fetch_drafts().await;
    let drafts = viewer_context.drafts.snapshot().await;
    assert!(drafts.drafts.is_empty());
    assert!(!viewer_context.auth.is_editor().await);
    assert!(!viewer_context.auth.is_admin().await);
}

#[tokio::test]
async fn register_persists_session() {
    let (server_url, _state) = spawn_auth_server().await;
    let (context, memory) = context_for(&server_url).await;

    let user = context
        .auth
        .register("new@example.com", "hunter2", Some("New Staff".to_string()))
        .await
        .expect("register");

    assert_eq!(user.email, "new@example.com");
    assert_eq!(
        memory.current().await.map(|s| s.user.email),
        Some("new@example.com".to_string())
    );
    assert!(context.auth.snapshot().await.is_authenticated);
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let (server_url, state) = spawn_auth_server().await;
    *state.fail_logout.lock().await = true;
    let (context, memory) = context_for(&server_url).await;
    context
        .auth
        .login("staff@example.com", "hunter2")
        .await
        .expect("login");

    let result = context.auth.logout().await;
    assert!(result.is_err(), "the server failure still propagates");

    assert!(memory.current().await.is_none(), "durable session cleared");
    let snapshot = context.auth.snapshot().await;
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.user.is_none());

    // Subsequent requests go out unauthenticated.
    context.drafts.fetch_drafts().await;
    let headers = state.drafts_auth_headers.lock().await;
    assert_eq!(headers.as_slice(), [None]);
}

#[tokio::test]
async fn restore_rehydrates_persisted_session() {
    let (server_url, state) = spawn_auth_server().await;
    let memory = Arc::new(
        MemorySessionStore::seeded(PersistedSession {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            user: sample_user(UserRole::Admin),
        })
        .await,
    );

    let context = AppContext::with_persistence(
        &settings_for(&server_url),
        memory as Arc<dyn SessionPersistence>,
    )
    .await
    .expect("context");

    let snapshot = context.auth.snapshot().await;
    assert!(snapshot.is_authenticated);
    assert!(snapshot.is_admin());
    assert!(snapshot.is_editor());

    context.drafts.fetch_drafts().await;
    let headers = state.drafts_auth_headers.lock().await;
    assert_eq!(headers.as_slice(), [Some("Bearer access-1".to_string())]);
}

#[test]
fn role_gates_derive_from_cached_user() {
    let mut state = AuthState::default();
    assert!(!state.is_editor());
    assert!(!state.is_admin());

    state.user = Some(sample_user(UserRole::Admin));
    assert!(state.is_editor());
    assert!(state.is_admin());

    state.user = Some(sample_user(UserRole::Editor));
    assert!(state.is_editor());
    assert!(!state.is_admin());

    state.user = Some(sample_user(UserRole::Viewer));
    assert!(!state.is_editor());

    state.user = Some(sample_user(UserRole::User));
    assert!(!state.is_editor());
}
