use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use chrono::NaiveDateTime;
use log::info;
use sqlx::SqlitePool;

mod auth;
mod config;
mod db;
mod errors;
mod routes;
mod structs;
#[cfg(test)]
mod test_support;
mod utils;

use config::Config;
use errors::AppError;

#[derive(Debug, Clone)]
pub struct AppState {
    db_pool: SqlitePool,
    config: Config,
    clock: fn() -> NaiveDateTime,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        AppState {
            db_pool,
            config,
            clock: local_now,
        }
    }

    /// Replaces the wall clock, e.g. to pin "today" for due generation.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let session = SessionMiddleware::builder(
        CookieSessionStore::default(),
        state.config.session_key.clone(),
    )
    .cookie_secure(state.config.cookie_secure)
    .build();

    App::new()
        // enable automatic response compression - usually register this first
        .wrap(middleware::Compress::default())
        .wrap(IdentityMiddleware::default())
        .wrap(session)
        // enable logger - always register Actix Web Logger middleware last
        .wrap(middleware::Logger::default())
        .app_data(Data::new(state))
        .configure(routes::configure)
        .default_service(web::to(routes::not_found_handler))
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let db_pool = db::connect(&config.database_url).await?;
    db::migrate(&db_pool).await?;
    info!("Database migrated successfully");

    if !config.room_numbers.is_empty() {
        db::seed_rooms(&db_pool, &config.room_numbers).await?;
    }

    let bind = (config.bind_addr.clone(), config.port);
    info!("Starting HTTP server on http://{}:{}/", bind.0, bind.1);

    let state = AppState::new(db_pool, config);
    HttpServer::new(move || build_app(state.clone()))
        .bind(bind)?
        .run()
        .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    run().await.map_err(|e| {
        log::error!("FATAL: {}", e);
        std::io::Error::from(e)
    })
}
