use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use travel_client::{
    config::{DataPaths, ServerConfig},
    lifecycle::{Action, Reducer, State, Store},
    network::{
        client::RequestExecutor, service::NetworkService, transport::ReqwestTransport,
        types::RequestError,
    },
    storage::{
        ACCESS_TOKEN, CacheStore, CredentialStore, FileCache, JsonSessionStore, REFRESH_TOKEN,
        SessionFlags,
    },
};

/// Command line client for the travel app backend.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// URL scheme of the backend
    #[arg(long, env = "TRAVEL_API_SCHEME", default_value = ServerConfig::DEFAULT_SCHEME)]
    scheme: String,

    /// Host name of the backend
    #[arg(long, env = "TRAVEL_API_HOST", default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Backend port, only used by debug builds unless --force-port is set
    #[arg(long, env = "TRAVEL_API_PORT")]
    port: Option<u16>,

    /// Use --port in release builds too
    #[arg(long)]
    force_port: bool,

    /// Directory holding the session file and the cache
    #[arg(long, env = "TRAVEL_DATA_DIR", default_value = ".travel")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a confirmation code by email
    SendCode {
        #[arg(short, long)]
        email: String,
    },
    /// Sign in with a confirmation code and store the tokens
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        code: String,
    },
    /// Show the signed in user
    User,
    /// List all routes, or show a single one
    Routes {
        id: Option<u64>,
    },
    /// List all map objects, or show a single one
    MapObjects {
        id: Option<u64>,
    },
    /// Delete the account remotely and wipe local data
    DeleteAccount,
    /// Remove downloaded files and cached routes
    ClearCache,
    /// Print the size of downloaded files
    CacheSize,
}

type Service = NetworkService<RequestExecutor<ReqwestTransport>, JsonSessionStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let server = ServerConfig {
        scheme: args.scheme,
        host: args.host,
        port: args.port,
        include_port: args.force_port || cfg!(debug_assertions),
        ..ServerConfig::default()
    };
    let paths = DataPaths::under(&args.data_dir);
    log::debug!("Using {:?} with data in {:?}", server, paths);

    let session = Arc::new(JsonSessionStore::open(&paths.session_file).with_context(|| {
        format!(
            "Failed to open session '{}'",
            paths.session_file.display()
        )
    })?);
    let cache = FileCache::new(&paths.cache_root);
    let transport = ReqwestTransport::new(&server)?;
    let service: Service = NetworkService::new(
        RequestExecutor::new(transport, server.include_port),
        session.clone(),
        server,
    );

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling.");
            ctrl_c_token.cancel();
        }
    });

    match args.command {
        Command::SendCode { email } => {
            service
                .send_confirmation_code(&email, cancellation_token)
                .await?;
            println!("Confirmation code sent to {}.", email);
        }
        Command::Login { email, code } => {
            let auth = service
                .auth(&email, &code, cancellation_token)
                .await?
                .ok_or(RequestError::Decode)?;
            session.set_credential(ACCESS_TOKEN, &auth.access_token)?;
            session.set_credential(REFRESH_TOKEN, &auth.refresh_token)?;
            session.set_needs_reauth(false)?;
            println!("Signed in as {}.", email);
        }
        Command::User => print_json(&service.get_user(cancellation_token).await?)?,
        Command::Routes { id: Some(id) } => {
            print_json(&service.get_full_way_object(id, cancellation_token).await?)?
        }
        Command::Routes { id: None } => {
            print_json(&service.get_app_routes(cancellation_token).await?)?
        }
        Command::MapObjects { id: Some(id) } => {
            print_json(&service.get_full_map_object(id, cancellation_token).await?)?
        }
        Command::MapObjects { id: None } => {
            print_json(&service.get_map_objects(cancellation_token).await?)?
        }
        Command::DeleteAccount => {
            delete_account(session, cache, service, cancellation_token).await?
        }
        Command::ClearCache => clear_cache(session, cache, service, cancellation_token).await?,
        Command::CacheSize => println!("{}", cache.size_all_files()),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn delete_account(
    session: Arc<JsonSessionStore>,
    cache: FileCache,
    service: Service,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    if session.needs_reauth() {
        anyhow::bail!("Not signed in.");
    }
    let reducer = Reducer::new(session.clone(), cache);
    let initial = State {
        is_show_delete_profile_modal: true,
        ..State::default()
    };
    let (store, handle) = Store::new(reducer, service, initial);

    let screen = async {
        handle.send(Action::DeleteUser).await?;
        let state = handle
            .wait_for(|s| s.is_show_error_modal || session.needs_reauth())
            .await?;
        cancellation_token.cancel();
        anyhow::Ok(state)
    };
    let (_, state) = tokio::join!(store.run(cancellation_token.clone()), screen);

    let state = state?;
    match state.error_message {
        Some(message) if state.is_show_error_modal => {
            anyhow::bail!("Account deletion failed: {}", message)
        }
        _ => println!("Account deleted."),
    }
    Ok(())
}

async fn clear_cache(
    session: Arc<JsonSessionStore>,
    cache: FileCache,
    service: Service,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let reducer = Reducer::new(session, cache);
    let initial = State {
        is_show_cache_delete_modal: true,
        ..State::default()
    };
    let (store, handle) = Store::new(reducer, service, initial);

    let screen = async {
        handle.send(Action::DeleteCache).await?;
        let state = handle
            .wait_for(|s| s.is_show_successfully_delete_cache_modal)
            .await?;
        cancellation_token.cancel();
        anyhow::Ok(state)
    };
    let (_, state) = tokio::join!(store.run(cancellation_token.clone()), screen);

    if state?.is_successfully_deleted_cache {
        println!("Cache cleared.");
    } else {
        // the success modal is shown whatever the wipe reported
        println!("Cache cleared, but some files could not be removed.");
    }
    Ok(())
}
