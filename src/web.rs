use crate::bridge::{Bridge, BridgeConfig, BridgeReply};
use crate::pages::Page;
use crate::pdf::{PLAN_FILENAME, render_plan_pdf};
use crate::prompts::{
    self, ABOUT_BLURB, DAILY_TIPS, DietaryPreference, Doctor, MealPlanRequest, NutritionGoal,
    PagePrompt, TEAM, TeamMember,
};
use crate::session::{
    DEFAULT_WEIGHT_KG, SessionStore, WEIGHT_RANGE_KG, generate_session_id, is_valid_session_id,
};
use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use cookie::{Cookie, SameSite};
use markdown::{Options as MarkdownOptions, to_html, to_html_with_options};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;
use std::fmt::{self, Write as _};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
pub const SESSION_COOKIE: &str = "healthmate_session";

#[derive(Clone)]
pub struct AppState {
    pub bridge: Bridge,
    pub sessions: SessionStore,
    pub theme: WebTheme,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

impl FromStr for WebTheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tailwind" => Ok(WebTheme::Tailwind),
            "bootstrap" => Ok(WebTheme::Bootstrap),
            other => Err(format!(
                "unknown theme {other:?} (expected `tailwind` or `bootstrap`)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    shell_class: &'static str,
    nav_class: &'static str,
    nav_link_class: &'static str,
    nav_active_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    section_title_class: &'static str,
    panel_class: &'static str,
    label_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
    success_class: &'static str,
    info_class: &'static str,
    warning_class: &'static str,
    error_class: &'static str,
    grid_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-slate-50 text-slate-900",
                shell_class: "min-h-screen flex",
                nav_class: "w-64 shrink-0 bg-white border-r border-slate-200 p-2 space-y-1",
                nav_link_class: "block rounded-md px-3 py-2 text-base hover:bg-[#ffc13b]",
                nav_active_class: "block rounded-md px-3 py-2 text-base bg-[#ff6e40] text-white font-semibold",
                main_class: "flex-1 flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-4xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
                headline_class: "text-4xl font-extrabold tracking-tight",
                lede_class: "text-lg text-slate-600",
                section_title_class: "text-xl font-semibold mb-2",
                panel_class: "bg-white shadow rounded p-4 prose prose-slate max-w-none",
                label_class: "block text-sm font-medium text-slate-700 mb-1",
                input_class: "w-full rounded-md border border-slate-300 px-3 py-2",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors",
                success_class: "rounded-md border border-green-300 bg-green-50 text-green-900 p-4",
                info_class: "rounded-md border border-sky-300 bg-sky-50 text-sky-900 p-4",
                warning_class: "rounded-md border border-amber-300 bg-amber-50 text-amber-900 p-4",
                error_class: "rounded-md border border-red-300 bg-red-50 text-red-900 p-4",
                grid_class: "grid gap-4 md:grid-cols-2",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                shell_class: "d-flex min-vh-100",
                nav_class: "nav nav-pills flex-column bg-white border-end p-2",
                nav_link_class: "nav-link",
                nav_active_class: "nav-link active",
                main_class: "container py-5",
                card_class: "mx-auto col-lg-10",
                eyebrow_class: "text-uppercase text-muted mb-2",
                headline_class: "display-5 fw-bold",
                lede_class: "lead mb-4",
                section_title_class: "h4 mb-2",
                panel_class: "card card-body",
                label_class: "form-label",
                input_class: "form-control",
                button_class: "btn btn-primary btn-lg px-4 py-2",
                success_class: "alert alert-success",
                info_class: "alert alert-info",
                warning_class: "alert alert-warning",
                error_class: "alert alert-danger",
                grid_class: "row row-cols-1 row-cols-md-2 g-4",
            },
        }
    }

    fn notice(&self, kind: NoticeKind, message: impl Into<String>) -> Notice {
        let class = match kind {
            NoticeKind::Success => self.success_class,
            NoticeKind::Warning => self.warning_class,
            NoticeKind::Error => self.error_class,
        };
        Notice {
            class,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NoticeKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Notice {
    class: &'static str,
    message: String,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub bridge: BridgeConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        bridge: Bridge::from_config(&config.bridge),
        sessions: SessionStore::default(),
        theme: config.theme,
    });
    let router = build_router(state);
    if config.bridge.api_key.trim().is_empty() {
        warn!("no API key configured; AI pages will show the fallback reply");
    }
    info!(
        %config.addr,
        theme = ?config.theme,
        model = %config.bridge.model,
        api = %config.bridge.api_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(Page::Home.path(), get(home))
        .route(Page::DoctorChat.path(), get(chat_page).post(chat_submit))
        .route(
            Page::SymptomChecker.path(),
            get(symptoms_page).post(symptoms_submit),
        )
        .route(
            Page::NutritionPlanner.path(),
            get(nutrition_page).post(nutrition_submit),
        )
        .route("/nutrition/plan.pdf", get(nutrition_pdf))
        .route(
            Page::HealthProgress.path(),
            get(progress_page).post(progress_submit),
        )
        .route(
            Page::MentalHealthSupport.path(),
            get(mental_health_page).post(mental_health_submit),
        )
        .route(Page::FindDoctor.path(), get(doctors_page).post(doctors_submit))
        .route(Page::About.path(), get(about))
        .route("/go", get(navigate))
        .route("/api/session", get(api_session))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Session binding for one request; issues a fresh cookie when the client has none.
struct SessionCookie {
    id: String,
    fresh: bool,
}

impl SessionCookie {
    fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| Cookie::parse(pair.trim()).ok())
            .find(|cookie| cookie.name() == SESSION_COOKIE && is_valid_session_id(cookie.value()))
            .map(|cookie| cookie.value().to_string());
        match existing {
            Some(id) => Self { id, fresh: false },
            None => Self {
                id: generate_session_id(),
                fresh: true,
            },
        }
    }

    fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.fresh {
            let cookie = Cookie::build((SESSION_COOKIE, self.id.as_str()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => warn!(error = %err, "failed to encode session cookie"),
            }
        }
        response
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "healthmate-web" }))
}

#[derive(Debug, Deserialize)]
struct NavigateParams {
    page: Option<String>,
}

async fn navigate(Query(params): Query<NavigateParams>) -> Redirect {
    let page = Page::select(params.page.as_deref());
    Redirect::to(page.path())
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    let tip_prompt = prompts::tip_of_the_day();
    let tip = ask(&state.bridge, &tip_prompt, &chrome, &mut notices).await;
    let word_prompt = prompts::word_of_the_day();
    let word = ask(&state.bridge, &word_prompt, &chrome, &mut notices).await;
    let tips = DAILY_TIPS
        .into_iter()
        .enumerate()
        .map(|(idx, text)| TipCard {
            text,
            delay_secs: idx * 2,
        })
        .collect();
    let body = HomeTemplate {
        chrome,
        tips,
        tip_html: render_reply(&tip),
        word_html: render_reply(&word),
    };
    Html(compose(&state, Page::Home, notices, body))
}

async fn chat_page(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let html = render_chat(&state, &session.id, Vec::new());
    session.respond(Html(html))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatForm {
    prompt: String,
}

async fn chat_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    match prompts::doctor_chat(&form.prompt) {
        Ok(prompt) => {
            let reply = ask(&state.bridge, &prompt, &chrome, &mut notices).await;
            state.sessions.with_session(&session.id, |current| {
                current.chat.record_exchange(prompt.prompt, reply.text)
            });
        }
        Err(missing) => notices.push(chrome.notice(NoticeKind::Warning, missing.warning)),
    }
    let html = render_chat(&state, &session.id, notices);
    session.respond(Html(html))
}

fn render_chat(state: &AppState, session_id: &str, notices: Vec<Notice>) -> String {
    let chrome = Chrome::new(state.theme);
    let history = state.sessions.snapshot(session_id).chat;
    let bubbles = history
        .turns()
        .iter()
        .map(|turn| ChatBubble {
            speaker: turn.role.label(),
            is_user: turn.role.is_user(),
            html: render_markdown_str(&turn.content).unwrap_or_default(),
        })
        .collect();
    let body = ChatTemplate { chrome, bubbles };
    compose(state, Page::DoctorChat, notices, body)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SymptomForm {
    symptoms: String,
}

async fn symptoms_page(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_ask_page(&state, AskPage::symptoms(), "", None, Vec::new()))
}

async fn symptoms_submit(
    State(state): State<SharedState>,
    Form(form): Form<SymptomForm>,
) -> impl IntoResponse {
    let built = prompts::symptom_check(&form.symptoms);
    Html(answer_ask_page(&state, AskPage::symptoms(), &form.symptoms, built).await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeelingForm {
    feeling: String,
}

async fn mental_health_page(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_ask_page(&state, AskPage::mental_health(), "", None, Vec::new()))
}

async fn mental_health_submit(
    State(state): State<SharedState>,
    Form(form): Form<FeelingForm>,
) -> impl IntoResponse {
    let built = prompts::mental_health(&form.feeling);
    Html(answer_ask_page(&state, AskPage::mental_health(), &form.feeling, built).await)
}

/// Single-textarea pages: the symptom checker and mental-health support.
#[derive(Debug, Clone, Copy)]
struct AskPage {
    page: Page,
    field: &'static str,
    label: &'static str,
    button: &'static str,
}

impl AskPage {
    fn symptoms() -> Self {
        Self {
            page: Page::SymptomChecker,
            field: "symptoms",
            label: "Enter your symptoms:",
            button: "Check",
        }
    }

    fn mental_health() -> Self {
        Self {
            page: Page::MentalHealthSupport,
            field: "feeling",
            label: "How are you feeling today?",
            button: "Get Advice",
        }
    }
}

async fn answer_ask_page(
    state: &AppState,
    form_page: AskPage,
    input: &str,
    built: Result<PagePrompt, prompts::MissingInput>,
) -> String {
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    let reply_html = match built {
        Ok(prompt) => {
            let reply = ask(&state.bridge, &prompt, &chrome, &mut notices).await;
            render_reply(&reply)
        }
        Err(missing) => {
            notices.push(chrome.notice(NoticeKind::Warning, missing.warning));
            None
        }
    };
    render_ask_page(state, form_page, input, reply_html, notices)
}

fn render_ask_page(
    state: &AppState,
    form_page: AskPage,
    input: &str,
    reply_html: Option<String>,
    notices: Vec<Notice>,
) -> String {
    let chrome = Chrome::new(state.theme);
    let body = AskTemplate {
        chrome,
        action: form_page.page.path(),
        field: form_page.field,
        label: form_page.label,
        button: form_page.button,
        value: input,
        reply_html,
    };
    compose(state, form_page.page, notices, body)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NutritionForm {
    goal: String,
    preference: String,
    allergies: String,
    additional_info: String,
}

impl NutritionForm {
    fn goal(&self) -> Option<NutritionGoal> {
        choice_or_default(&self.goal, NutritionGoal::from_label)
    }

    fn preference(&self) -> Option<DietaryPreference> {
        choice_or_default(&self.preference, DietaryPreference::from_label)
    }
}

/// A missing select value means the first option; an unknown one is rejected.
fn choice_or_default<T: Default>(raw: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    if raw.trim().is_empty() {
        Some(T::default())
    } else {
        parse(raw)
    }
}

#[derive(Debug, Default, Deserialize)]
struct NutritionParams {
    missing_plan: Option<u8>,
}

async fn nutrition_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<NutritionParams>,
) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    if params.missing_plan.is_some() {
        notices.push(chrome.notice(
            NoticeKind::Warning,
            "Generate a meal plan before downloading the PDF.",
        ));
    }
    let html = render_nutrition(
        &state,
        &session.id,
        &NutritionForm::default(),
        None,
        notices,
    );
    session.respond(Html(html))
}

async fn nutrition_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<NutritionForm>,
) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    let (goal, preference) = match (form.goal(), form.preference()) {
        (Some(goal), Some(preference)) => (goal, preference),
        (goal, _) => {
            let warning = if goal.is_none() {
                "Please choose a valid nutrition goal."
            } else {
                "Please choose a valid dietary preference."
            };
            notices.push(chrome.notice(NoticeKind::Warning, warning));
            let html = render_nutrition(&state, &session.id, &form, None, notices);
            return session.respond(Html(html));
        }
    };
    let request = MealPlanRequest {
        goal,
        preference,
        allergies: Some(form.allergies.clone()),
        additional_info: Some(form.additional_info.clone()),
    };
    let prompt = prompts::meal_plan(&request);
    let reply = ask(&state.bridge, &prompt, &chrome, &mut notices).await;
    notices.push(chrome.notice(
        NoticeKind::Success,
        "Here’s your personalized meal plan:",
    ));
    if !reply.is_fallback() {
        let plan = reply.text.clone();
        state
            .sessions
            .with_session(&session.id, |current| current.nutrition_plans.push(plan));
    }
    let html = render_nutrition(&state, &session.id, &form, render_reply(&reply), notices);
    session.respond(Html(html))
}

fn render_nutrition(
    state: &AppState,
    session_id: &str,
    form: &NutritionForm,
    plan_html: Option<String>,
    notices: Vec<Notice>,
) -> String {
    let chrome = Chrome::new(state.theme);
    let saved_plans = state.sessions.snapshot(session_id).nutrition_plans.len();
    let chosen_goal = form.goal().unwrap_or_default();
    let chosen_preference = form.preference().unwrap_or_default();
    let goals = NutritionGoal::ALL
        .iter()
        .map(|goal| SelectOption {
            label: goal.label(),
            selected: *goal == chosen_goal,
        })
        .collect();
    let preferences = DietaryPreference::ALL
        .iter()
        .map(|pref| SelectOption {
            label: pref.label(),
            selected: *pref == chosen_preference,
        })
        .collect();
    let body = NutritionTemplate {
        chrome,
        goals,
        preferences,
        allergies: &form.allergies,
        additional_info: &form.additional_info,
        plan_html,
        saved_plans,
    };
    compose(state, Page::NutritionPlanner, notices, body)
}

async fn nutrition_pdf(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let plans = state.sessions.snapshot(&session.id).nutrition_plans;
    if plans.is_empty() {
        return session.respond(Redirect::to("/nutrition?missing_plan=1"));
    }
    match render_plan_pdf(&plans.combined()) {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{PLAN_FILENAME}\"");
            session.respond((
                [
                    (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            ))
        }
        Err(err) => {
            warn!(error = %err, plans = plans.len(), "nutrition plan export failed");
            session.respond(ApiError::internal(err.to_string()))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeightForm {
    weight: String,
}

async fn progress_page(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let html = render_progress(&state, &session.id, DEFAULT_WEIGHT_KG, Vec::new());
    session.respond(Html(html))
}

async fn progress_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<WeightForm>,
) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let chrome = Chrome::new(state.theme);
    let raw = form.weight.trim();
    let parsed = if raw.is_empty() {
        Ok(DEFAULT_WEIGHT_KG)
    } else {
        raw.parse::<f64>()
    };
    let mut notices = Vec::new();
    let mut shown = DEFAULT_WEIGHT_KG;
    match parsed {
        Ok(kg) => {
            shown = kg;
            let logged = state
                .sessions
                .with_session(&session.id, |current| current.weights.log(kg));
            match logged {
                Ok(kg) => notices.push(chrome.notice(
                    NoticeKind::Success,
                    format!("Weight logged: {} kg", format_kg(kg)),
                )),
                Err(err) => notices.push(chrome.notice(NoticeKind::Warning, err.to_string())),
            }
        }
        Err(_) => notices.push(chrome.notice(
            NoticeKind::Warning,
            "Please enter your weight as a number.",
        )),
    }
    let html = render_progress(&state, &session.id, shown, notices);
    session.respond(Html(html))
}

fn render_progress(
    state: &AppState,
    session_id: &str,
    current_weight: f64,
    notices: Vec<Notice>,
) -> String {
    let chrome = Chrome::new(state.theme);
    let weights = state.sessions.snapshot(session_id).weights;
    let body = ProgressTemplate {
        chrome,
        min_kg: format_kg(*WEIGHT_RANGE_KG.start()),
        max_kg: format_kg(*WEIGHT_RANGE_KG.end()),
        current_kg: format_kg(current_weight),
        chart_svg: weight_chart_svg(weights.entries()),
        entry_count: weights.entries().len(),
    };
    compose(state, Page::HealthProgress, notices, body)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DoctorForm {
    location: String,
}

async fn doctors_page(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_doctors(&state, "", None, Vec::new()))
}

async fn doctors_submit(
    State(state): State<SharedState>,
    Form(form): Form<DoctorForm>,
) -> impl IntoResponse {
    let chrome = Chrome::new(state.theme);
    let mut notices = Vec::new();
    let doctors = match prompts::doctors_near(&form.location) {
        Ok((location, doctors)) => {
            notices.push(chrome.notice(
                NoticeKind::Success,
                format!("Showing doctors near {location}:"),
            ));
            Some(doctors)
        }
        Err(missing) => {
            notices.push(chrome.notice(NoticeKind::Warning, missing.warning));
            None
        }
    };
    Html(render_doctors(&state, &form.location, doctors, notices))
}

fn render_doctors(
    state: &AppState,
    location: &str,
    doctors: Option<&'static [Doctor]>,
    notices: Vec<Notice>,
) -> String {
    let chrome = Chrome::new(state.theme);
    let body = DoctorsTemplate {
        chrome,
        location,
        doctors: doctors.unwrap_or_default(),
    };
    compose(state, Page::FindDoctor, notices, body)
}

async fn about(State(state): State<SharedState>) -> impl IntoResponse {
    let chrome = Chrome::new(state.theme);
    let body = AboutTemplate {
        chrome,
        blurb: ABOUT_BLURB,
        team: &TEAM,
    };
    Html(compose(&state, Page::About, Vec::new(), body))
}

async fn api_session(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionCookie::from_headers(&headers);
    let snapshot = state.sessions.snapshot(&session.id);
    session.respond(Json(snapshot))
}

async fn ask(
    bridge: &Bridge,
    prompt: &PagePrompt,
    chrome: &Chrome,
    notices: &mut Vec<Notice>,
) -> BridgeReply {
    let reply = bridge.ask(&prompt.prompt, prompt.system_role).await;
    if let Some(error) = &reply.error {
        notices.push(chrome.notice(NoticeKind::Error, error.clone()));
    }
    reply
}

fn compose(state: &AppState, page: Page, notices: Vec<Notice>, body: impl Template) -> String {
    let chrome = Chrome::new(state.theme);
    let nav = Page::ALL
        .iter()
        .map(|entry| NavLink {
            label: entry.label(),
            icon: entry.icon(),
            href: nav_href(*entry),
            active: *entry == page,
        })
        .collect();
    body.render()
        .and_then(|body| {
            LayoutTemplate {
                chrome,
                title: page.label(),
                heading: page.title(),
                nav,
                notices,
                body,
            }
            .render()
        })
        .unwrap_or_else(|err| render_error_page(state.theme, err.to_string()))
}

fn nav_href(page: Page) -> String {
    format!(
        "/go?page={}",
        utf8_percent_encode(page.label(), NON_ALPHANUMERIC)
    )
}

fn render_error_page(theme: WebTheme, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = match theme {
        WebTheme::Tailwind => (
            r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#,
            "",
        ),
        WebTheme::Bootstrap => (
            r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">"#,
            r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" integrity="sha384-FKyoEForCGlyvwx9Hj09JcYn3nv7wiPVlz7YYwJrWVcXK/BmnVDxM+D2scQbITxI" crossorigin="anonymous"></script>"#,
        ),
    };
    let message = html_escape(&message.into());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>AI HealthMate • Error</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">Something went wrong</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Back to home</a>
      </div>
    </main>
  </body>
</html>"#,
        css_tag = css_tag,
        js_tag = js_tag,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        message = message,
    )
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn format_kg(kg: f64) -> String {
    if kg.fract() == 0.0 {
        format!("{kg:.1}")
    } else {
        format!("{kg}")
    }
}

const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 240.0;
const CHART_PADDING: f64 = 24.0;

/// Line chart of the weight series, one point per entry in logged order.
fn weight_chart_svg(entries: &[f64]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let min = entries.iter().copied().fold(f64::INFINITY, f64::min);
    let max = entries.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(1.0);
    let plot_width = CHART_WIDTH - 2.0 * CHART_PADDING;
    let plot_height = CHART_HEIGHT - 2.0 * CHART_PADDING;
    let step = if entries.len() > 1 {
        plot_width / (entries.len() - 1) as f64
    } else {
        0.0
    };
    let points: Vec<(f64, f64)> = entries
        .iter()
        .enumerate()
        .map(|(idx, kg)| {
            let x = if entries.len() > 1 {
                CHART_PADDING + step * idx as f64
            } else {
                CHART_WIDTH / 2.0
            };
            let y = CHART_HEIGHT - CHART_PADDING - (kg - min) / span * plot_height;
            (x, y)
        })
        .collect();

    let mut svg = String::with_capacity(256 + entries.len() * 96);
    let _ = write!(
        svg,
        r##"<svg id="weight-chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" role="img" aria-label="Weight history">"##
    );
    let _ = write!(
        svg,
        r##"<text x="4" y="{top:.1}" font-size="10">{max_kg}</text><text x="4" y="{bottom:.1}" font-size="10">{min_kg}</text>"##,
        top = CHART_PADDING,
        bottom = CHART_HEIGHT - CHART_PADDING,
        max_kg = format_kg(max),
        min_kg = format_kg(min),
    );
    let polyline = points
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#ff6e40" stroke-width="2" points="{polyline}"/>"##
    );
    for (idx, ((x, y), kg)) in points.iter().zip(entries).enumerate() {
        let _ = write!(
            svg,
            r##"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="#302b63" data-kg="{kg}"><title>Entry {n}: {label} kg</title></circle>"##,
            n = idx + 1,
            label = format_kg(*kg),
        );
    }
    svg.push_str("</svg>");
    Some(svg)
}

fn render_reply(reply: &BridgeReply) -> Option<String> {
    render_markdown_str(&reply.text)
}

fn markdown_options() -> MarkdownOptions {
    // Model output is untrusted: keep the GFM defaults, which escape raw HTML.
    MarkdownOptions::gfm()
}

fn render_markdown_str(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let options = markdown_options();
    let html = to_html_with_options(trimmed, &options).unwrap_or_else(|_| to_html(trimmed));
    Some(html)
}

struct NavLink {
    label: &'static str,
    icon: &'static str,
    href: String,
    active: bool,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>AI HealthMate • {{ title }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" integrity="sha384-FKyoEForCGlyvwx9Hj09JcYn3nv7wiPVlz7YYwJrWVcXK/BmnVDxM+D2scQbITxI" crossorigin="anonymous"></script>
    {% endif %}
    <style>
      .tip-container {
        border: 2px solid #ff5733;
        padding: 15px;
        border-radius: 10px;
        color: white;
        background-color: #302b63;
        text-align: center;
        font-weight: bold;
        opacity: 0;
        animation: tip-in 0.6s ease-out forwards;
      }
      @keyframes tip-in { to { opacity: 1; } }
    </style>
  </head>
  <body class="{{ chrome.body_class }}">
    <div class="{{ chrome.shell_class }}">
      <nav class="{{ chrome.nav_class }}" aria-label="Navigation">
        <p class="{{ chrome.eyebrow_class }} px-3 pt-2">Navigation</p>
        {% for link in nav %}
        <a href="{{ link.href }}" class="{% if link.active %}{{ chrome.nav_active_class }}{% else %}{{ chrome.nav_link_class }}{% endif %}"{% if link.active %} aria-current="page"{% endif %}>{{ link.icon }} {{ link.label }}</a>
        {% endfor %}
      </nav>
      <main class="{{ chrome.main_class }}">
        <div class="{{ chrome.card_class }}">
          <h1 class="{{ chrome.headline_class }}">{{ heading }}</h1>
          {% for notice in notices %}
          <div class="{{ notice.class }}" role="alert">{{ notice.message }}</div>
          {% endfor %}
          {{ body|safe }}
        </div>
      </main>
    </div>
  </body>
</html>"#,
    ext = "html"
)]
struct LayoutTemplate {
    chrome: Chrome,
    title: &'static str,
    heading: &'static str,
    nav: Vec<NavLink>,
    notices: Vec<Notice>,
    body: String,
}

struct TipCard {
    text: &'static str,
    delay_secs: usize,
}

#[derive(Template)]
#[template(
    source = r#"<p class="{{ chrome.lede_class }}">Welcome to your AI-powered healthcare companion.</p>
<section id="daily-tips" class="space-y-3">
  {% for tip in tips %}
  <div class="tip-container mb-3" style="animation-delay: {{ tip.delay_secs }}s">{{ tip.text }}</div>
  {% endfor %}
</section>
<section id="tip-of-the-day">
  <h2 class="{{ chrome.section_title_class }}">🌟 Health Tip of the Day</h2>
  <div class="{{ chrome.success_class }}">
    {% if tip_html.is_some() %}{{ tip_html.as_ref().unwrap()|safe }}{% endif %}
  </div>
</section>
<section id="word-of-the-day">
  <h2 class="{{ chrome.section_title_class }}">🩺 Word of the Day</h2>
  <div class="{{ chrome.info_class }}">
    {% if word_html.is_some() %}{{ word_html.as_ref().unwrap()|safe }}{% endif %}
  </div>
</section>"#,
    ext = "html"
)]
struct HomeTemplate {
    chrome: Chrome,
    tips: Vec<TipCard>,
    tip_html: Option<String>,
    word_html: Option<String>,
}

struct ChatBubble {
    speaker: &'static str,
    is_user: bool,
    html: String,
}

#[derive(Template)]
#[template(
    source = r#"<section id="chat-history" class="space-y-3">
  {% for bubble in bubbles %}
  <article class="{{ chrome.panel_class }}{% if bubble.is_user %} border-start border-4{% endif %}" data-role="{{ bubble.speaker }}">
    <p class="{{ chrome.eyebrow_class }}">{% if bubble.is_user %}🧑 You{% else %}🤖 AI Doctor{% endif %}</p>
    {{ bubble.html|safe }}
  </article>
  {% endfor %}
</section>
<form method="post" action="/chat" class="space-y-3">
  <label for="prompt" class="{{ chrome.label_class }}">Describe your symptoms:</label>
  <input id="prompt" name="prompt" type="text" class="{{ chrome.input_class }}" autocomplete="off" autofocus />
  <button type="submit" class="{{ chrome.button_class }} mt-2">Send</button>
</form>"#,
    ext = "html"
)]
struct ChatTemplate {
    chrome: Chrome,
    bubbles: Vec<ChatBubble>,
}

#[derive(Template)]
#[template(
    source = r#"<form method="post" action="{{ action }}" class="space-y-3">
  <label for="{{ field }}" class="{{ chrome.label_class }}">{{ label }}</label>
  <textarea id="{{ field }}" name="{{ field }}" rows="5" class="{{ chrome.input_class }}">{{ value }}</textarea>
  <button type="submit" class="{{ chrome.button_class }} mt-2">{{ button }}</button>
</form>
{% if reply_html.is_some() %}
<section id="ai-reply" class="{{ chrome.panel_class }}">{{ reply_html.as_ref().unwrap()|safe }}</section>
{% endif %}"#,
    ext = "html"
)]
struct AskTemplate<'a> {
    chrome: Chrome,
    action: &'static str,
    field: &'static str,
    label: &'static str,
    button: &'static str,
    value: &'a str,
    reply_html: Option<String>,
}

struct SelectOption {
    label: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(
    source = r#"<p class="{{ chrome.lede_class }}">Get personalized meal plans based on your dietary preferences and goals.</p>
<form method="post" action="/nutrition" class="space-y-3">
  <div>
    <label for="goal" class="{{ chrome.label_class }}">What is your primary goal?</label>
    <select id="goal" name="goal" class="{{ chrome.input_class }}">
      {% for option in goals %}
      <option value="{{ option.label }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
      {% endfor %}
    </select>
  </div>
  <div>
    <label for="preference" class="{{ chrome.label_class }}">Dietary Preference:</label>
    <select id="preference" name="preference" class="{{ chrome.input_class }}">
      {% for option in preferences %}
      <option value="{{ option.label }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
      {% endfor %}
    </select>
  </div>
  <div>
    <label for="allergies" class="{{ chrome.label_class }}">Any food allergies? (Optional)</label>
    <input id="allergies" name="allergies" type="text" class="{{ chrome.input_class }}" value="{{ allergies }}" />
  </div>
  <div>
    <label for="additional_info" class="{{ chrome.label_class }}">Any specific health conditions or requirements? (Optional)</label>
    <textarea id="additional_info" name="additional_info" rows="3" class="{{ chrome.input_class }}">{{ additional_info }}</textarea>
  </div>
  <button type="submit" class="{{ chrome.button_class }} mt-2">Generate Meal Plan</button>
</form>
{% if plan_html.is_some() %}
<section id="meal-plan" class="{{ chrome.panel_class }}">{{ plan_html.as_ref().unwrap()|safe }}</section>
{% endif %}
{% if saved_plans > 0 %}
<p><a href="/nutrition/plan.pdf" class="{{ chrome.button_class }}" download>Download Nutrition Plan ({{ saved_plans }} saved)</a></p>
{% endif %}"#,
    ext = "html"
)]
struct NutritionTemplate<'a> {
    chrome: Chrome,
    goals: Vec<SelectOption>,
    preferences: Vec<SelectOption>,
    allergies: &'a str,
    additional_info: &'a str,
    plan_html: Option<String>,
    saved_plans: usize,
}

#[derive(Template)]
#[template(
    source = r#"<form method="post" action="/progress" class="space-y-3">
  <label for="weight" class="{{ chrome.label_class }}">Enter your current weight (kg):</label>
  <input id="weight" name="weight" type="number" step="0.1" min="{{ min_kg }}" max="{{ max_kg }}" value="{{ current_kg }}" class="{{ chrome.input_class }}" />
  <button type="submit" class="{{ chrome.button_class }} mt-2">Log Weight</button>
</form>
<section id="weight-history" class="{{ chrome.panel_class }}">
  {% if chart_svg.is_some() %}
  <p class="{{ chrome.eyebrow_class }}">{{ entry_count }} entries</p>
  {{ chart_svg.as_ref().unwrap()|safe }}
  {% else %}
  <p>No data available.</p>
  {% endif %}
</section>"#,
    ext = "html"
)]
struct ProgressTemplate {
    chrome: Chrome,
    min_kg: String,
    max_kg: String,
    current_kg: String,
    chart_svg: Option<String>,
    entry_count: usize,
}

#[derive(Template)]
#[template(
    source = r#"<form method="post" action="/doctors" class="space-y-3">
  <label for="location" class="{{ chrome.label_class }}">Enter your city or zip code:</label>
  <input id="location" name="location" type="text" class="{{ chrome.input_class }}" value="{{ location }}" />
  <button type="submit" class="{{ chrome.button_class }} mt-2">Find Doctors</button>
</form>
{% if doctors.len() > 0 %}
<section id="doctor-list" class="space-y-3">
  {% for doc in doctors %}
  <article class="{{ chrome.panel_class }}">
    <p><strong>👨‍⚕️ {{ doc.name }}</strong><br />
    <em>Specialty:</em> {{ doc.specialty }}<br />
    <em>Contact:</em> 📞 {{ doc.contact }}</p>
  </article>
  {% endfor %}
</section>
{% endif %}"#,
    ext = "html"
)]
struct DoctorsTemplate<'a> {
    chrome: Chrome,
    location: &'a str,
    doctors: &'static [Doctor],
}

#[derive(Template)]
#[template(
    source = r#"<p class="{{ chrome.lede_class }}">{{ blurb }}</p>
<section id="team" class="{{ chrome.grid_class }}">
  {% for member in team %}
  <article class="{{ chrome.panel_class }} text-center">
    <img src="{{ member.image }}" alt="{{ member.name }}" width="150" class="mx-auto rounded" />
    <h3 class="{{ chrome.section_title_class }}">{{ member.name }}</h3>
    <p class="{{ chrome.eyebrow_class }}">{{ member.role }}</p>
    <p><a href="{{ member.linkedin }}">LinkedIn</a> | <a href="{{ member.github }}">GitHub</a></p>
  </article>
  {% endfor %}
</section>"#,
    ext = "html"
)]
struct AboutTemplate {
    chrome: Chrome,
    blurb: &'static str,
    team: &'static [TeamMember],
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::bridge::{
        BridgeError, CompletionClient, CompletionRequest, DEFAULT_MODEL, FALLBACK_REPLY,
    };
    use async_trait::async_trait;
    use axum::{body, body::Body, http::Request};
    use parking_lot::Mutex;
    use tower::ServiceExt;

    struct ScriptedClient {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn answering(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, BridgeError> {
            let user = request
                .messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default();
            self.prompts.lock().push(user);
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => Err(BridgeError::Status {
                    status: 503,
                    body: "upstream down".into(),
                }),
            }
        }
    }

    fn test_router(client: Arc<ScriptedClient>, theme: WebTheme) -> Router {
        let state = Arc::new(AppState {
            bridge: Bridge::new(client, DEFAULT_MODEL),
            sessions: SessionStore::default(),
            theme,
        });
        build_router(state)
    }

    const SESSION: &str = "abcdefghijklmnopqrstuvwx";

    fn session_cookie() -> String {
        format!("{SESSION_COOKIE}={SESSION}")
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, session_cookie())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_session(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, session_cookie())
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> String {
        let response = router.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_success(), "status {}", response.status());
        body_text(response).await
    }

    async fn session_json(router: &Router) -> serde_json::Value {
        let body = send(router, get_with_session("/api/session")).await;
        serde_json::from_str(&body).unwrap()
    }

    fn section<'a>(html: &'a str, id: &str) -> &'a str {
        let marker = format!("<section id=\"{id}\"");
        let start = html.find(&marker).expect("section present");
        let end = html[start..].find("</section>").expect("section closed") + start;
        &html[start..end]
    }

    #[tokio::test]
    async fn empty_inputs_warn_without_calling_the_model() {
        let client = ScriptedClient::answering("unused");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let cases = [
            ("/symptoms", "symptoms=", "Please enter your symptoms to analyze."),
            ("/symptoms", "symptoms=+++", "Please enter your symptoms to analyze."),
            ("/mental-health", "feeling=", "Please describe your feelings."),
            ("/chat", "prompt=", "Please describe your symptoms."),
            ("/doctors", "location=", "Please enter your location."),
        ];
        for (uri, form, warning) in cases {
            let html = send(&router, form_post(uri, form)).await;
            assert!(html.contains(warning), "{uri} should warn");
        }
        assert_eq!(client.calls(), 0);
        assert_eq!(session_json(&router).await["chat"], json!([]));
    }

    #[tokio::test]
    async fn symptom_checker_renders_model_reply() {
        let client = ScriptedClient::answering("Likely a **common cold**.");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let html = send(&router, form_post("/symptoms", "symptoms=runny+nose")).await;
        assert!(html.contains("<strong>common cold</strong>"));
        assert_eq!(
            client.prompts.lock().as_slice(),
            ["Analyze the following symptoms: runny nose"]
        );
    }

    #[tokio::test]
    async fn model_failure_shows_fallback_and_notice() {
        let client = ScriptedClient::failing();
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let html = send(&router, form_post("/mental-health", "feeling=anxious")).await;
        assert!(html.contains(FALLBACK_REPLY));
        assert!(html.contains("AI Error: HTTP 503: upstream down"));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn model_output_html_is_escaped() {
        let client = ScriptedClient::answering("<script>alert(1)</script>");
        let router = test_router(client, WebTheme::Tailwind);
        let html = send(&router, form_post("/symptoms", "symptoms=x")).await;
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn chat_history_alternates_user_and_assistant() {
        let client = ScriptedClient::answering("Rest and hydrate.");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        for message in ["cough", "fever", "headache"] {
            send(&router, form_post("/chat", &format!("prompt={message}"))).await;
        }
        let session = session_json(&router).await;
        let turns = session["chat"].as_array().unwrap();
        assert_eq!(turns.len(), 6);
        for (idx, turn) in turns.iter().enumerate() {
            let expected = if idx % 2 == 0 { "user" } else { "assistant" };
            assert_eq!(turn["role"], expected);
        }
        assert_eq!(turns[0]["content"], "cough");
        assert_eq!(turns[4]["content"], "headache");
        assert_eq!(client.calls(), 3);

        let html = send(&router, get_with_session("/chat")).await;
        assert_eq!(section(&html, "chat-history").matches("data-role=").count(), 6);
    }

    #[tokio::test]
    async fn weight_series_keeps_logged_order() {
        let client = ScriptedClient::answering("unused");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let logged = ["82.5", "81", "83.25", "80"];
        for kg in logged {
            let html = send(&router, form_post("/progress", &format!("weight={kg}"))).await;
            assert!(html.contains("Weight logged:"));
        }
        let rejected = send(&router, form_post("/progress", "weight=12")).await;
        assert!(rejected.contains("Weight must be between"));

        let session = session_json(&router).await;
        assert_eq!(session["weights"], json!([82.5, 81.0, 83.25, 80.0]));

        let html = send(&router, get_with_session("/progress")).await;
        let chart = section(&html, "weight-history");
        let plotted: Vec<f64> = chart
            .split("data-kg=\"")
            .skip(1)
            .map(|rest| rest[..rest.find('"').unwrap()].parse().unwrap())
            .collect();
        assert_eq!(plotted, vec![82.5, 81.0, 83.25, 80.0]);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn progress_without_entries_says_no_data() {
        let router = test_router(ScriptedClient::answering("unused"), WebTheme::Tailwind);
        let html = send(&router, get_with_session("/progress")).await;
        assert!(html.contains("No data available."));
        assert!(html.contains("value=\"70.0\""));
    }

    #[tokio::test]
    async fn doctor_directory_is_static() {
        let client = ScriptedClient::answering("unused");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let mumbai = send(&router, form_post("/doctors", "location=Mumbai")).await;
        let zip = send(&router, form_post("/doctors", "location=94110")).await;
        assert!(mumbai.contains("Showing doctors near Mumbai:"));
        assert_eq!(section(&mumbai, "doctor-list"), section(&zip, "doctor-list"));
        assert_eq!(section(&zip, "doctor-list").matches("<article").count(), 5);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn about_page_ignores_input() {
        let router = test_router(ScriptedClient::answering("unused"), WebTheme::Tailwind);
        let plain = send(&router, get_with_session("/about")).await;
        let with_query = send(&router, get_with_session("/about?location=Delhi&q=x")).await;
        assert_eq!(plain, with_query);
        assert!(plain.contains("Dr. Alice"));
        assert!(plain.contains("John Doe"));
    }

    #[tokio::test]
    async fn home_asks_for_tip_and_word() {
        let client = ScriptedClient::answering("Walk after meals.");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let html = send(&router, get_with_session("/")).await;
        assert_eq!(
            client.prompts.lock().as_slice(),
            [
                prompts::TIP_OF_THE_DAY_PROMPT,
                prompts::WORD_OF_THE_DAY_PROMPT
            ]
        );
        assert!(section(&html, "tip-of-the-day").contains("Walk after meals."));
        assert_eq!(section(&html, "daily-tips").matches("tip-container").count(), 3);
    }

    #[tokio::test]
    async fn nutrition_plan_is_saved_and_exported() {
        let client = ScriptedClient::answering("Breakfast: oats\nLunch: dal");
        let router = test_router(client.clone(), WebTheme::Tailwind);

        let early = router
            .clone()
            .oneshot(get_with_session("/nutrition/plan.pdf"))
            .await
            .unwrap();
        assert_eq!(early.status(), StatusCode::SEE_OTHER);
        let location = early.headers()[header::LOCATION].to_str().unwrap().to_string();
        let bounced = send(&router, get_with_session(&location)).await;
        assert!(bounced.contains("Generate a meal plan before downloading the PDF."));
        assert!(client.prompts.lock().is_empty());

        let html = send(
            &router,
            form_post(
                "/nutrition",
                "goal=Heart+Health&preference=Vegan&allergies=soy&additional_info=",
            ),
        )
        .await;
        assert!(html.contains("personalized meal plan:"));
        assert!(html.contains("/nutrition/plan.pdf"));
        assert_eq!(
            client.prompts.lock().as_slice(),
            ["Create a heart health meal plan that is vegan. Avoid soy."]
        );

        let response = router
            .clone()
            .oneshot(get_with_session("/nutrition/plan.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains(PLAN_FILENAME)
        );
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn failed_meal_plan_is_not_saved() {
        let router = test_router(ScriptedClient::failing(), WebTheme::Tailwind);
        send(&router, form_post("/nutrition", "goal=Muscle+Gain")).await;
        let session = session_json(&router).await;
        assert_eq!(session["nutrition_plans"], json!([]));
    }

    #[tokio::test]
    async fn unknown_meal_plan_choices_warn_in_page() {
        let client = ScriptedClient::answering("unused");
        let router = test_router(client.clone(), WebTheme::Tailwind);
        let cases = [
            ("goal=Keto&preference=Vegan", "Please choose a valid nutrition goal."),
            (
                "goal=Weight+Loss&preference=Carnivore",
                "Please choose a valid dietary preference.",
            ),
        ];
        for (body, warning) in cases {
            let html = send(&router, form_post("/nutrition", body)).await;
            assert!(html.contains(warning), "missing warning for {body}");
            assert!(!html.contains("id=\"meal-plan\""));
        }
        assert!(client.prompts.lock().is_empty());
        assert_eq!(session_json(&router).await["nutrition_plans"], json!([]));
    }

    #[tokio::test]
    async fn navigation_dispatches_labels() {
        let router = test_router(ScriptedClient::answering("unused"), WebTheme::Tailwind);
        for (query, target) in [
            ("Find%20Doctor", "/doctors"),
            ("Doctor+Chat", "/chat"),
            ("Nonsense", "/"),
        ] {
            let response = router
                .clone()
                .oneshot(
                    Request::get(format!("/go?page={query}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], target);
        }
    }

    #[tokio::test]
    async fn first_visit_issues_session_cookie() {
        let router = test_router(ScriptedClient::answering("unused"), WebTheme::Tailwind);
        let response = router
            .clone()
            .oneshot(Request::get("/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        assert!(cookie.contains("HttpOnly"));

        let returning = router
            .clone()
            .oneshot(get_with_session("/progress"))
            .await
            .unwrap();
        assert!(returning.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn bootstrap_theme_renders_bootstrap_chrome() {
        let router = test_router(ScriptedClient::answering("unused"), WebTheme::Bootstrap);
        let html = send(&router, get_with_session("/about")).await;
        assert!(html.contains("bootstrap.min.css"));
        assert!(html.contains("nav-link active"));
        assert!(!html.contains("@tailwindcss/browser"));
    }

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Bootstrap".parse::<WebTheme>(), Ok(WebTheme::Bootstrap));
        assert!("material".parse::<WebTheme>().is_err());
    }

    #[test]
    fn nav_links_encode_labels() {
        assert_eq!(nav_href(Page::DoctorChat), "/go?page=Doctor%20Chat");
    }

    #[test]
    fn format_kg_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(format_kg(70.0), "70.0");
        assert_eq!(format_kg(81.25), "81.25");
    }

    #[test]
    fn single_entry_chart_has_one_point() {
        let svg = weight_chart_svg(&[72.0]).unwrap();
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(weight_chart_svg(&[]).is_none());
    }
}
