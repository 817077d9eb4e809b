use crate::models::*;
use crate::services::CustomerService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/customers",
    tag = "customer",
    params(CustomerQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "顾客列表", body = PaginatedCustomerResponse)
    )
)]
pub async fn list_customers(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    query: web::Query<CustomerQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service.list_customers(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers",
    tag = "customer",
    request_body = CreateCustomerRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = CustomerResponse),
        (status = 400, description = "手机号已存在或参数错误")
    )
)]
pub async fn create_customer(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    request: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service.create_customer(request.into_inner()).await {
        Ok(customer) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": customer }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/customers/outstanding",
    tag = "customer",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "未结清赊账汇总", body = OutstandingSummary)
    )
)]
pub async fn outstanding(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service.outstanding().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/customers/{id}",
    tag = "customer",
    params(("id" = i64, Path, description = "顾客ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "顾客详情", body = CustomerResponse),
        (status = 404, description = "顾客不存在")
    )
)]
pub async fn get_customer(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service.get_customer(path.into_inner()).await {
        Ok(customer) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": customer }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/customers/{id}",
    tag = "customer",
    params(("id" = i64, Path, description = "顾客ID")),
    request_body = UpdateCustomerRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = CustomerResponse),
        (status = 404, description = "顾客不存在")
    )
)]
pub async fn update_customer(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateCustomerRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service
        .update_customer(path.into_inner(), request.into_inner())
        .await
    {
        Ok(customer) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": customer }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers/{id}/payments",
    tag = "customer",
    params(("id" = i64, Path, description = "顾客ID")),
    request_body = RecordPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "还款已记录", body = CreditUpdateResponse),
        (status = 400, description = "金额不合法或超过未结清余额")
    )
)]
pub async fn record_payment(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service
        .record_payment(path.into_inner(), request.into_inner(), &user)
        .await
    {
        Ok(update) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": update }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers/{id}/adjustments",
    tag = "customer",
    params(("id" = i64, Path, description = "顾客ID")),
    request_body = AdjustBalanceRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "余额已调整", body = CreditUpdateResponse),
        (status = 403, description = "仅管理员可调整")
    )
)]
pub async fn adjust_balance(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<AdjustBalanceRequest>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service
        .adjust_balance(path.into_inner(), request.into_inner(), &user)
        .await
    {
        Ok(update) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": update }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/customers/{id}/ledger",
    tag = "customer",
    params(("id" = i64, Path, description = "顾客ID"), LedgerQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "赊账流水（新到旧）", body = PaginatedCreditEntryResponse),
        (status = 404, description = "顾客不存在")
    )
)]
pub async fn ledger(
    customer_service: web::Data<CustomerService>,
    user: AuthUser,
    path: web::Path<i64>,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse> {
    user.require(Page::Customers)?;
    match customer_service.ledger(path.into_inner(), &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn customer_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customers")
            .route("", web::get().to(list_customers))
            .route("", web::post().to(create_customer))
            .route("/outstanding", web::get().to(outstanding))
            .route("/{id}", web::get().to(get_customer))
            .route("/{id}", web::put().to(update_customer))
            .route("/{id}/payments", web::post().to(record_payment))
            .route("/{id}/adjustments", web::post().to(adjust_balance))
            .route("/{id}/ledger", web::get().to(ledger)),
    );
}
