use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use kiosk_backend::{
    config::Config,
    database::{apply_pending_restore, create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 打开数据库前先应用暂存的恢复文件
    let db_path = config.database.sqlite_path();
    if let Some(path) = db_path.as_deref() {
        match apply_pending_restore(path) {
            Ok(true) => log::warn!("Database restored from staged backup"),
            Ok(false) => {}
            Err(e) => log::error!("Failed to apply staged restore: {e}"),
        }
    }

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let user_service = UserService::new(pool.clone());
    user_service
        .ensure_bootstrap_admin(&config.bootstrap.admin_password)
        .await
        .expect("Failed to create bootstrap admin");

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // 创建服务
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let menu_service = MenuService::new(pool.clone(), config.kiosk.clone());
    let cart_service = CartService::new(pool.clone(), config.kiosk.clone());
    let order_service =
        OrderService::new(pool.clone(), config.kiosk.clone(), cart_service.clone());
    let customer_service = CustomerService::new(pool.clone());
    let report_service = ReportService::new(pool.clone(), config.kiosk.clone());
    let backup_service = BackupService::new(pool.clone(), &config.backup, db_path);

    // 启动后台任务
    tasks::spawn_all(backup_service.clone(), &config.backup);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(menu_service.clone()))
            .app_data(web::Data::new(cart_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(customer_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .app_data(web::Data::new(backup_service.clone()))
            .configure(swagger_config)
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::menu_config)
                    .configure(handlers::cart_config)
                    .configure(handlers::order_config)
                    .configure(handlers::customer_config)
                    .configure(handlers::report_config)
                    .configure(handlers::backup_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
