use bridges_realtime::{
    ConnectionState, Credentials, InboundEvent, InboundEventKind, IntentKind, RealtimeSession,
    SessionOptions, SharedCredentials,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Connect to a live backend and print every inbound event for a minute
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing to see logs
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridges_realtime=debug".into()),
        )
        .init();

    let token = std::env::var("BRIDGES_ACCESS_TOKEN").expect("BRIDGES_ACCESS_TOKEN must be set in .env");
    let room = std::env::var("BRIDGES_ROOM").unwrap_or_else(|_| "group:demo".to_string());

    let options = SessionOptions::from_env()?;
    println!("📡 Connecting to: {}\n", options.endpoint);

    let auth = Arc::new(SharedCredentials::new(Credentials::authenticated(token)));
    let session = RealtimeSession::new(options, auth.clone())?;

    for kind in InboundEventKind::ALL {
        session.on(kind, |event| match event {
            InboundEvent::UserTyping(typing) => {
                println!("✏️  {} typing in {}: {}", typing.user_id, typing.room_id, typing.is_typing)
            }
            other => println!("📨 {:?}", other),
        });
    }

    let mut states = session.state_changes();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            println!("🔌 state: {}", state);
            if state == ConnectionState::AuthRejected {
                println!("❌ token rejected, refresh it and call connect() again");
            }
        }
    });

    session.join_room(&room);
    session.connect();

    tokio::time::sleep(Duration::from_secs(3)).await;
    if session.is_connected() {
        session.emit(IntentKind::TypingStart, json!({ "room_id": room }));
        tokio::time::sleep(Duration::from_secs(2)).await;
        session.emit(IntentKind::TypingStop, json!({ "room_id": room }));
    }

    println!("⏳ Listening for 60 seconds...\n");
    tokio::time::sleep(Duration::from_secs(60)).await;

    let unread = session.unread().counts();
    println!(
        "📬 unread: {} message(s), {} notification(s)",
        unread.messages, unread.notifications
    );

    // Logout
    auth.clear();
    session.shutdown();
    println!("👋 Done");
    Ok(())
}
