use actix_cors::Cors;

/// 收银台前端与后端同机部署，放开来源；导出 CSV 时前端需要读取 Content-Disposition
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec![actix_web::http::header::CONTENT_DISPOSITION])
        .max_age(3600)
}
