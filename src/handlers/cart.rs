use crate::models::*;
use crate::services::CartService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/cart",
    tag = "cart",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前购物车及金额预览", body = CartView)
    )
)]
pub async fn get_cart(cart_service: web::Data<CartService>, user: AuthUser) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match cart_service.view(user.id).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": view }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cart/lines",
    tag = "cart",
    request_body = AddCartLineRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已加入购物车", body = CartView),
        (status = 400, description = "数量或配料不合法"),
        (status = 404, description = "菜品不存在")
    )
)]
pub async fn add_line(
    cart_service: web::Data<CartService>,
    user: AuthUser,
    request: web::Json<AddCartLineRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match cart_service.add_line(user.id, request.into_inner()).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": view }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/cart/lines/{line_id}",
    tag = "cart",
    params(("line_id" = Uuid, Path, description = "购物车行ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已移除", body = CartView),
        (status = 404, description = "行不存在")
    )
)]
pub async fn remove_line(
    cart_service: web::Data<CartService>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    match cart_service.remove_line(user.id, path.into_inner()).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": view }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/cart",
    tag = "cart",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "购物车已清空")
    )
)]
pub async fn clear_cart(cart_service: web::Data<CartService>, user: AuthUser) -> Result<HttpResponse> {
    user.require(Page::Orders)?;
    cart_service.clear(user.id).await;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Cart cleared")))
}

pub fn cart_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(get_cart))
            .route("", web::delete().to(clear_cart))
            .route("/lines", web::post().to(add_line))
            .route("/lines/{line_id}", web::delete().to(remove_line)),
    );
}
