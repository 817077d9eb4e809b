use crate::models::*;
use crate::services::MenuService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ToppingQuery {
    pub available_only: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/menu/items",
    tag = "menu",
    params(MenuQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜单列表", body = [MenuItemResponse])
    )
)]
pub async fn list_items(
    menu_service: web::Data<MenuService>,
    _user: AuthUser,
    query: web::Query<MenuQuery>,
) -> Result<HttpResponse> {
    match menu_service.list_items(&query).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/menu/categories",
    tag = "menu",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "分类列表", body = [String])
    )
)]
pub async fn list_categories(
    menu_service: web::Data<MenuService>,
    _user: AuthUser,
) -> Result<HttpResponse> {
    match menu_service.list_categories().await {
        Ok(categories) => Ok(HttpResponse::Ok().json(ApiResponse::success(categories))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/menu/items/{id}",
    tag = "menu",
    params(("id" = i64, Path, description = "菜品ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜品详情", body = MenuItemResponse),
        (status = 404, description = "菜品不存在")
    )
)]
pub async fn get_item(
    menu_service: web::Data<MenuService>,
    _user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match menu_service.get_item(path.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/menu/items",
    tag = "menu",
    request_body = CreateMenuItemRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = MenuItemResponse),
        (status = 400, description = "参数错误或同分类下重名"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_item(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    request: web::Json<CreateMenuItemRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service.create_item(request.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/menu/items/{id}",
    tag = "menu",
    params(("id" = i64, Path, description = "菜品ID")),
    request_body = UpdateMenuItemRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = MenuItemResponse),
        (status = 404, description = "菜品不存在")
    )
)]
pub async fn update_item(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateMenuItemRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service
        .update_item(path.into_inner(), request.into_inner())
        .await
    {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/menu/items/{id}/availability",
    tag = "menu",
    params(("id" = i64, Path, description = "菜品ID")),
    request_body = SetAvailabilityRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已更新", body = MenuItemResponse)
    )
)]
pub async fn set_availability(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<SetAvailabilityRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service
        .set_availability(path.into_inner(), request.is_available)
        .await
    {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/menu/items/{id}/restock",
    tag = "menu",
    params(("id" = i64, Path, description = "菜品ID")),
    request_body = RestockRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "库存已调整", body = MenuItemResponse),
        (status = 400, description = "库存不能为负")
    )
)]
pub async fn restock(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<RestockRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service.restock(path.into_inner(), request.delta).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/menu/low-stock",
    tag = "menu",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "低库存菜品", body = [MenuItemResponse])
    )
)]
pub async fn low_stock(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service.low_stock().await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/menu/import",
    tag = "menu",
    request_body(content = String, content_type = "text/csv", description = "category,item,price,cost,stock"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "导入完成", body = CsvImportResult),
        (status = 400, description = "CSV 格式错误，整批不导入")
    )
)]
pub async fn import_csv(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    body: String,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service.import_csv(&body).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/toppings",
    tag = "menu",
    params(ToppingQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "配料列表", body = [ToppingResponse])
    )
)]
pub async fn list_toppings(
    menu_service: web::Data<MenuService>,
    _user: AuthUser,
    query: web::Query<ToppingQuery>,
) -> Result<HttpResponse> {
    match menu_service
        .list_toppings(query.available_only.unwrap_or(false))
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/toppings",
    tag = "menu",
    request_body = CreateToppingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = ToppingResponse)
    )
)]
pub async fn create_topping(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    request: web::Json<CreateToppingRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service.create_topping(request.into_inner()).await {
        Ok(topping) => Ok(HttpResponse::Ok().json(ApiResponse::success(topping))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/toppings/{id}",
    tag = "menu",
    params(("id" = i64, Path, description = "配料ID")),
    request_body = UpdateToppingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = ToppingResponse),
        (status = 404, description = "配料不存在")
    )
)]
pub async fn update_topping(
    menu_service: web::Data<MenuService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateToppingRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Inventory)?;
    match menu_service
        .update_topping(path.into_inner(), request.into_inner())
        .await
    {
        Ok(topping) => Ok(HttpResponse::Ok().json(ApiResponse::success(topping))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn menu_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/menu")
            .route("/items", web::get().to(list_items))
            .route("/items", web::post().to(create_item))
            .route("/categories", web::get().to(list_categories))
            .route("/low-stock", web::get().to(low_stock))
            .route("/import", web::post().to(import_csv))
            .route("/items/{id}", web::get().to(get_item))
            .route("/items/{id}", web::put().to(update_item))
            .route("/items/{id}/availability", web::put().to(set_availability))
            .route("/items/{id}/restock", web::post().to(restock)),
    )
    .service(
        web::scope("/toppings")
            .route("", web::get().to(list_toppings))
            .route("", web::post().to(create_topping))
            .route("/{id}", web::put().to(update_topping)),
    );
}
