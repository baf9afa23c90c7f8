use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, rt, web, App, HttpServer};
use log::{error, info};

use todo_backend::{config::Config, db, jobs::RedisJobDispatcher, routes, AppError, AppState};

fn startup_error(err: AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let pool = db::connect(&config).await.map_err(startup_error)?;
    db::migrate(&pool).await.map_err(startup_error)?;

    let jobs = RedisJobDispatcher::new(&config.redis_url, &config.job_queue, config.queue_timeout())
        .map_err(startup_error)?;
    let state = web::Data::new(AppState::postgres(pool, Arc::new(jobs), &config));

    let tokens = state.tokens.clone();
    let mut purge_interval = tokio::time::interval(config.session_purge_interval());
    rt::spawn(async move {
        loop {
            purge_interval.tick().await;
            if let Err(e) = tokens.purge_expired().await {
                error!("Session purge failed: {}", e);
            }
        }
    });

    info!("Starting todo-backend server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
