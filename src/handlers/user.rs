use crate::models::*;
use crate::services::UserService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/users",
    tag = "user",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户列表", body = [UserResponse]),
        (status = 403, description = "仅管理员可操作")
    )
)]
pub async fn list_users(
    user_service: web::Data<UserService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require_admin()?;
    match user_service.list_users(&user).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "user",
    request_body = CreateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建成功", body = UserResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "仅管理员可操作")
    )
)]
pub async fn create_user(
    user_service: web::Data<UserService>,
    user: AuthUser,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    user.require_admin()?;
    match user_service.create_user(&user, request.into_inner()).await {
        Ok(created) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": created }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "user",
    params(("id" = i64, Path, description = "用户ID")),
    request_body = UpdateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = UserResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn update_user(
    user_service: web::Data<UserService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse> {
    user.require_admin()?;
    match user_service
        .update_user(&user, path.into_inner(), request.into_inner())
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": updated }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}/active",
    tag = "user",
    params(("id" = i64, Path, description = "用户ID")),
    request_body = SetActiveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "状态已更新", body = UserResponse),
        (status = 400, description = "不能停用自己")
    )
)]
pub async fn set_active(
    user_service: web::Data<UserService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<SetActiveRequest>,
) -> Result<HttpResponse> {
    user.require_admin()?;
    match user_service
        .set_active(&user, path.into_inner(), request.is_active)
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": updated }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}/password",
    tag = "user",
    params(("id" = i64, Path, description = "用户ID")),
    request_body = ResetPasswordRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "密码已重置"),
        (status = 400, description = "密码不符合要求")
    )
)]
pub async fn reset_password(
    user_service: web::Data<UserService>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    user.require_admin()?;
    let target = path.into_inner();
    match user_service
        .reset_password(&user, target, &request.new_password)
        .await
    {
        Ok(()) => {
            log::info!("Password of user {target} reset by {}", user.username);
            Ok(HttpResponse::Ok().json(ApiResponse::message("Password reset")))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}/active", web::put().to(set_active))
            .route("/{id}/password", web::put().to(reset_password)),
    );
}
