use std::net::SocketAddr;

use clap::Parser;
use msisdn_auth::cli::{
    Args, build_config, init_logging, load_codec, load_key_provider, open_database, seed_admin,
    take_admin_password,
};
use msisdn_auth::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let admin_password = take_admin_password();

    let Some(provider) = load_key_provider(args.key_dir.as_deref()) else {
        std::process::exit(1);
    };

    let Some(codec) = load_codec(
        &*provider,
        args.key_algorithm,
        args.refresh_token_hours,
        args.store_timeout(),
    )
    .await
    else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let config = build_config(&args, db, codec);

    if let Some(username) = args.admin_username.as_deref() {
        let session = config.session_service();
        if !seed_admin(&session, username, admin_password.as_deref()).await {
            std::process::exit(1);
        }
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
