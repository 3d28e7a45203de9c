use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Draft Clock.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::timer::start_timer,
        crate::routes::timer::pause_timer,
        crate::routes::timer::resume_timer,
        crate::routes::timer::stop_timer,
        crate::routes::timer::reset_timer,
        crate::routes::timer::get_timer,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionCreatedResponse,
            crate::dto::session::SessionSummary,
            crate::dto::timer::TimerDurationRequest,
            crate::dto::timer::TimerSnapshot,
            crate::dto::timer::TimerStatusDto,
            crate::dto::push::TimerPush,
            crate::dto::ws::ViewerInboundMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Draft session lifecycle"),
        (name = "timer", description = "Organizer-driven timer commands"),
        (name = "viewers", description = "WebSocket operations for viewer clients"),
    )
)]
pub struct ApiDoc;
