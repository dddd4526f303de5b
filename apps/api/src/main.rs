use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{AppointmentStore, BookingService, InMemoryAppointmentStore, SupabaseAppointmentStore};
use notification_cell::{EmailNotifier, Notifier};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use triage_cell::{
    InMemorySessionStore, OpenAiReplyGenerator, ReplyGenerator, SessionStore, SupabaseSessionStore,
    TriageService, TriageSettings,
};

fn print_config_report(config: &AppConfig) {
    println!("Required configuration:");
    for (key, present) in config.required_key_report() {
        println!("  {:<36} {}", key, if present { "SET" } else { "MISSING" });
    }
    println!(
        "  {:<36} {}",
        "SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY",
        if config.is_database_configured() { "SET" } else { "MISSING (in-memory storage)" }
    );
    println!(
        "  {:<36} {}",
        "OPENAI_API_KEY",
        if config.is_ai_configured() { "SET" } else { "MISSING (canned replies)" }
    );
}

fn build_services(config: &AppConfig) -> (Arc<TriageService>, Arc<BookingService>) {
    let settings = TriageSettings::from_config(config);

    let (sessions, appointments): (Arc<dyn SessionStore>, Arc<dyn AppointmentStore>) =
        if config.is_database_configured() {
            let supabase = Arc::new(SupabaseClient::new(config));
            (
                Arc::new(SupabaseSessionStore::new(supabase.clone(), settings.session_ttl)),
                Arc::new(SupabaseAppointmentStore::new(supabase)),
            )
        } else {
            (
                Arc::new(InMemorySessionStore::new(settings.session_ttl)),
                Arc::new(InMemoryAppointmentStore::new()),
            )
        };

    let notifier: Option<Arc<dyn Notifier>> = match EmailNotifier::new(config) {
        Ok(notifier) => Some(Arc::new(notifier)),
        Err(e) => {
            warn!("Email notifications disabled: {}", e);
            None
        }
    };

    let replies: Option<Arc<dyn ReplyGenerator>> = if config.is_ai_configured() {
        info!("Conversational replies enabled with model {}", config.openai_model);
        Some(Arc::new(OpenAiReplyGenerator::new(config)))
    } else {
        None
    };

    let booking = Arc::new(BookingService::new(config, appointments, notifier));
    let triage = Arc::new(TriageService::new(sessions, booking.clone(), replies, settings));
    (triage, booking)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    if std::env::args().any(|arg| arg == "--check-config") {
        print_config_report(&AppConfig::from_env());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Medikah intake API server");

    let config = AppConfig::from_env();
    let (triage, booking) = build_services(&config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(triage, booking)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
