use crate::models::*;
use crate::services::BackupService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/backups",
    tag = "backup",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "备份列表（新到旧）", body = [BackupInfo])
    )
)]
pub async fn list_backups(
    backup_service: web::Data<BackupService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require(Page::Backup)?;
    match backup_service.list_backups().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/backups",
    tag = "backup",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "备份已创建", body = BackupInfo)
    )
)]
pub async fn create_backup(
    backup_service: web::Data<BackupService>,
    user: AuthUser,
) -> Result<HttpResponse> {
    user.require(Page::Backup)?;
    match backup_service.create_backup().await {
        Ok(info) => {
            log::info!("Backup {} created by {}", info.name, user.username);
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": info })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/backups/{name}",
    tag = "backup",
    params(("name" = String, Path, description = "备份文件名")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已删除"),
        (status = 404, description = "备份不存在")
    )
)]
pub async fn delete_backup(
    backup_service: web::Data<BackupService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    user.require(Page::Backup)?;
    match backup_service.delete_backup(&path).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::message("Backup deleted"))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/backups/{name}/restore",
    tag = "backup",
    params(("name" = String, Path, description = "备份文件名")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已暂存，重启后生效", body = RestoreResponse),
        (status = 404, description = "备份不存在")
    )
)]
pub async fn restore_backup(
    backup_service: web::Data<BackupService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    user.require(Page::Backup)?;
    match backup_service.stage_restore(&path).await {
        Ok(staged) => {
            log::warn!(
                "Restore of {} staged by {}, restart required",
                staged.name,
                user.username
            );
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": staged })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn backup_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/backups")
            .route("", web::get().to(list_backups))
            .route("", web::post().to(create_backup))
            .route("/{name}", web::delete().to(delete_backup))
            .route("/{name}/restore", web::post().to(restore_backup)),
    );
}
