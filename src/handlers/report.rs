use crate::models::*;
use crate::services::ReportService;
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/reports/sales/{period}",
    tag = "report",
    params(("period" = ReportPeriod, Path, description = "daily / weekly / monthly"), ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "按周期汇总的销售额", body = [SalesSummaryRow])
    )
)]
pub async fn sales_summary(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    path: web::Path<ReportPeriod>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service
        .sales_summary(path.into_inner(), &query)
        .await
    {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/items",
    tag = "report",
    params(ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜品销量", body = [ItemSalesRow])
    )
)]
pub async fn item_sales(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service.item_sales(&query).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/customers",
    tag = "report",
    params(ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "顾客消费分析", body = [CustomerAnalysisRow])
    )
)]
pub async fn customer_analysis(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service.customer_analysis(&query).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/menu-performance",
    tag = "report",
    params(ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜品利润表现", body = [MenuPerformanceRow])
    )
)]
pub async fn menu_performance(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service.menu_performance(&query).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/payment-modes",
    tag = "report",
    params(ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "支付方式分布", body = [PaymentModeRow])
    )
)]
pub async fn payment_breakdown(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service.payment_breakdown(&query).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/export.csv",
    tag = "report",
    params(ReportQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单导出", content_type = "text/csv", body = String)
    )
)]
pub async fn export_orders(
    report_service: web::Data<ReportService>,
    user: AuthUser,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Reports)?;
    match report_service.export_orders_csv(&query).await {
        Ok(csv) => Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"orders.csv\"",
            ))
            .body(csv)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn report_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("/sales/{period}", web::get().to(sales_summary))
            .route("/items", web::get().to(item_sales))
            .route("/customers", web::get().to(customer_analysis))
            .route("/menu-performance", web::get().to(menu_performance))
            .route("/payment-modes", web::get().to(payment_breakdown))
            .route("/export.csv", web::get().to(export_orders)),
    );
}
