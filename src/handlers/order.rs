use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = SubmitOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "下单成功", body = OrderResponse),
        (status = 400, description = "购物车为空、库存不足或顾客信息不合法")
    )
)]
pub async fn submit_order(
    order_service: web::Data<OrderService>,
    user: AuthUser,
    request: web::Json<SubmitOrderRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match order_service.submit_order(&user, request.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "order",
    params(OrderQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单列表（新到旧）", body = PaginatedOrderResponse)
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    user: AuthUser,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match order_service.list_orders(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/today",
    tag = "order",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "今日订单", body = TodayOrdersResponse)
    )
)]
pub async fn today_orders(
    order_service: web::Data<OrderService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match order_service.today_orders().await {
        Ok(today) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": today }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "order",
    params(("id" = i64, Path, description = "订单ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单详情", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match order_service.get_order(path.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(submit_order))
            .route("", web::get().to(list_orders))
            .route("/today", web::get().to(today_orders))
            .route("/{id}", web::get().to(get_order)),
    );
}
