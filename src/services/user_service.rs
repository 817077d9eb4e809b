use crate::entities::{UserRole, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthUser, CreateUserRequest, Page, UpdateUserRequest, UserResponse, effective_pages,
};
use crate::utils::{generate_password, hash_password, validate_password};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 首次启动时创建管理员账号。
    ///
    /// 配置了 `bootstrap.admin_password` 则使用之，否则生成随机密码并在 warn 级别输出一次。
    pub async fn ensure_bootstrap_admin(&self, configured_password: &str) -> AppResult<bool> {
        if users::Entity::find().count(&self.pool).await? > 0 {
            return Ok(false);
        }

        let password = if configured_password.is_empty() {
            let generated = generate_password(12);
            log::warn!(
                "No users found; created '{BOOTSTRAP_ADMIN_USERNAME}' with generated password: {generated} (change it after first login)"
            );
            generated
        } else {
            validate_password(configured_password)?;
            log::info!("No users found; created '{BOOTSTRAP_ADMIN_USERNAME}' from configured password");
            configured_password.to_string()
        };

        self.insert_user(
            BOOTSTRAP_ADMIN_USERNAME,
            &password,
            Some("Administrator".to_string()),
            UserRole::Admin,
            &Page::ALL,
        )
        .await?;
        Ok(true)
    }

    pub async fn list_users(&self, actor: &AuthUser) -> AppResult<Vec<UserResponse>> {
        actor.require_admin()?;
        let list = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserResponse> {
        Ok(self.get_user(user_id).await?.into())
    }

    pub async fn create_user(
        &self,
        actor: &AuthUser,
        req: CreateUserRequest,
    ) -> AppResult<UserResponse> {
        actor.require_admin()?;
        let username = validate_username(&req.username)?;
        validate_password(&req.password)?;

        let exists = users::Entity::find()
            .filter(users::Column::Username.eq(username.as_str()))
            .count(&self.pool)
            .await?
            > 0;
        if exists {
            return Err(AppError::ValidationError(format!(
                "Username '{username}' already exists"
            )));
        }

        let model = self
            .insert_user(
                &username,
                &req.password,
                clean_optional(req.full_name),
                req.role,
                &req.pages,
            )
            .await?;
        log::info!("User created: {} ({})", model.username, model.role);
        Ok(model.into())
    }

    async fn insert_user(
        &self,
        username: &str,
        password: &str,
        full_name: Option<String>,
        role: UserRole,
        pages: &[Page],
    ) -> AppResult<users::Model> {
        let now = Utc::now();
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password(password)?),
            full_name: Set(full_name),
            role: Set(role),
            pages: Set(Page::join(&effective_pages(role, pages))),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(model)
    }

    pub async fn update_user(
        &self,
        actor: &AuthUser,
        user_id: i64,
        req: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        actor.require_admin()?;
        let user = self.get_user(user_id).await?;

        let role = req.role.unwrap_or(user.role);
        if user.role == UserRole::Admin && role != UserRole::Admin {
            if actor.id == user_id {
                return Err(AppError::ValidationError(
                    "You cannot remove your own admin role".to_string(),
                ));
            }
            self.ensure_other_active_admin(user_id).await?;
        }
        let pages = match &req.pages {
            Some(pages) => pages.clone(),
            None => Page::split(&user.pages),
        };

        let mut am = user.into_active_model();
        if let Some(full_name) = req.full_name {
            am.full_name = Set(clean_optional(Some(full_name)));
        }
        am.role = Set(role);
        am.pages = Set(Page::join(&effective_pages(role, &pages)));
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;
        Ok(updated.into())
    }

    pub async fn set_active(
        &self,
        actor: &AuthUser,
        user_id: i64,
        is_active: bool,
    ) -> AppResult<UserResponse> {
        actor.require_admin()?;
        let user = self.get_user(user_id).await?;
        if !is_active {
            if actor.id == user_id {
                return Err(AppError::ValidationError(
                    "You cannot deactivate your own account".to_string(),
                ));
            }
            if user.role == UserRole::Admin {
                self.ensure_other_active_admin(user_id).await?;
            }
        }

        let mut am = user.into_active_model();
        am.is_active = Set(is_active);
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;
        log::info!(
            "User {} {} by {}",
            updated.username,
            if is_active { "activated" } else { "deactivated" },
            actor.username
        );
        Ok(updated.into())
    }

    pub async fn reset_password(
        &self,
        actor: &AuthUser,
        user_id: i64,
        new_password: &str,
    ) -> AppResult<()> {
        actor.require_admin()?;
        validate_password(new_password)?;
        let user = self.get_user(user_id).await?;
        self.store_password(user, new_password).await
    }

    pub(crate) async fn store_password(&self, user: users::Model, password: &str) -> AppResult<()> {
        let mut am = user.into_active_model();
        am.password_hash = Set(hash_password(password)?);
        am.updated_at = Set(Utc::now());
        am.update(&self.pool).await?;
        Ok(())
    }

    async fn ensure_other_active_admin(&self, excluding: i64) -> AppResult<()> {
        let others = users::Entity::find()
            .filter(users::Column::Role.eq(UserRole::Admin))
            .filter(users::Column::IsActive.eq(true))
            .filter(users::Column::Id.ne(excluding))
            .count(&self.pool)
            .await?;
        if others == 0 {
            return Err(AppError::ValidationError(
                "At least one active admin must remain".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() || username.len() > 50 {
        return Err(AppError::ValidationError(
            "Username must be between 1 and 50 characters".to_string(),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::ValidationError(
            "Username must not contain spaces".to_string(),
        ));
    }
    Ok(username.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::test_db;
    use crate::utils::verify_password;

    fn admin_actor(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: "admin".into(),
            role: UserRole::Admin,
            pages: Page::ALL.to_vec(),
        }
    }

    fn staff_actor(id: i64, pages: Vec<Page>) -> AuthUser {
        AuthUser {
            id,
            username: "ravi".into(),
            role: UserRole::Staff,
            pages,
        }
    }

    fn staff_request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "counter2024".to_string(),
            full_name: Some("Counter Staff".to_string()),
            role: UserRole::Staff,
            pages: vec![Page::Orders],
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_once() {
        let svc = UserService::new(test_db().await);
        assert!(svc.ensure_bootstrap_admin("kiosk2024").await.unwrap());
        assert!(!svc.ensure_bootstrap_admin("kiosk2024").await.unwrap());

        let list = svc.list_users(&admin_actor(0)).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].username, BOOTSTRAP_ADMIN_USERNAME);
        assert_eq!(list[0].role, UserRole::Admin);
        assert_eq!(list[0].pages.len(), Page::ALL.len());

        let model = svc.get_user(list[0].id).await.unwrap();
        assert!(verify_password("kiosk2024", &model.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_generates_password_when_unset() {
        let svc = UserService::new(test_db().await);
        assert!(svc.ensure_bootstrap_admin("").await.unwrap());
        let model = svc.get_user(svc.list_users(&admin_actor(0)).await.unwrap()[0].id).await.unwrap();
        assert!(!verify_password("admin123", &model.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_user_validations() {
        let svc = UserService::new(test_db().await);
        let created = svc.create_user(&admin_actor(0), staff_request("ravi")).await.unwrap();
        assert_eq!(created.pages, vec![Page::Orders]);
        assert!(created.is_active);

        assert!(matches!(
            svc.create_user(&admin_actor(0), staff_request("ravi")).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(svc.create_user(&admin_actor(0), staff_request("  ")).await.is_err());

        let mut weak = staff_request("sita");
        weak.password = "short".into();
        assert!(svc.create_user(&admin_actor(0), weak).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_self_or_last_admin() {
        let svc = UserService::new(test_db().await);
        svc.ensure_bootstrap_admin("kiosk2024").await.unwrap();
        let admin_id = svc.list_users(&admin_actor(0)).await.unwrap()[0].id;
        let staff = svc.create_user(&admin_actor(0), staff_request("ravi")).await.unwrap();

        assert!(svc.set_active(&admin_actor(admin_id), admin_id, false).await.is_err());
        // 另一位管理员也不能停用唯一的管理员
        assert!(svc.set_active(&admin_actor(999), admin_id, false).await.is_err());

        let deactivated = svc
            .set_active(&admin_actor(admin_id), staff.id, false)
            .await
            .unwrap();
        assert!(!deactivated.is_active);
    }

    #[tokio::test]
    async fn test_update_user_pages_and_role() {
        let svc = UserService::new(test_db().await);
        svc.ensure_bootstrap_admin("kiosk2024").await.unwrap();
        let admin_id = svc.list_users(&admin_actor(0)).await.unwrap()[0].id;
        let staff = svc.create_user(&admin_actor(0), staff_request("ravi")).await.unwrap();

        let updated = svc
            .update_user(
                &admin_actor(admin_id),
                staff.id,
                UpdateUserRequest {
                    pages: Some(vec![Page::Orders, Page::Inventory]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.pages, vec![Page::Orders, Page::Inventory]);

        let promoted = svc
            .update_user(
                &admin_actor(admin_id),
                staff.id,
                UpdateUserRequest {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
        assert_eq!(promoted.pages.len(), Page::ALL.len());
    }

    #[tokio::test]
    async fn test_reset_password() {
        let svc = UserService::new(test_db().await);
        let staff = svc.create_user(&admin_actor(0), staff_request("ravi")).await.unwrap();
        assert!(svc.reset_password(&admin_actor(0), staff.id, "weak").await.is_err());
        svc.reset_password(&admin_actor(0), staff.id, "newpass2024").await.unwrap();
        let model = svc.get_user(staff.id).await.unwrap();
        assert!(verify_password("newpass2024", &model.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_staff_cannot_manage_users() {
        let svc = UserService::new(test_db().await);
        svc.ensure_bootstrap_admin("kiosk2024").await.unwrap();
        let admin_id = svc.list_users(&admin_actor(0)).await.unwrap()[0].id;
        let staff = svc
            .create_user(&admin_actor(admin_id), staff_request("ravi"))
            .await
            .unwrap();
        // 即便令牌里带着 Manage 页面，员工也不能管理账号
        let actor = staff_actor(staff.id, vec![Page::Manage, Page::Orders]);

        let promote = UpdateUserRequest {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_user(&actor, staff.id, promote).await,
            Err(AppError::PermissionDenied)
        ));
        let mut new_admin = staff_request("sita");
        new_admin.role = UserRole::Admin;
        assert!(matches!(
            svc.create_user(&actor, new_admin).await,
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(
            svc.reset_password(&actor, admin_id, "takeover2024").await,
            Err(AppError::PermissionDenied)
        ));
        assert!(svc.set_active(&actor, admin_id, false).await.is_err());
        assert!(svc.list_users(&actor).await.is_err());

        let unchanged = svc.get_user(staff.id).await.unwrap();
        assert_eq!(unchanged.role, UserRole::Staff);
        let admin = svc.get_user(admin_id).await.unwrap();
        assert!(verify_password("kiosk2024", &admin.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_staff_pages_drop_admin_only_entries() {
        let svc = UserService::new(test_db().await);
        let mut req = staff_request("ravi");
        req.pages = vec![Page::Orders, Page::Manage, Page::Backup];
        let created = svc.create_user(&admin_actor(0), req).await.unwrap();
        assert_eq!(created.pages, vec![Page::Orders]);
    }
}
