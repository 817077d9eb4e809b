use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, AuthUser, ChangePasswordRequest, LoginRequest, TokenResponse};
use crate::services::UserService;
use crate::utils::{JwtService, validate_password, verify_password};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    user_service: UserService,
}

impl AuthService {
    pub fn new(pool: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self {
            user_service: UserService::new(pool.clone()),
            pool,
            jwt_service,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let username = request.username.trim();
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.pool)
            .await?;

        let user = match user {
            Some(user) if verify_password(&request.password, &user.password_hash)? => user,
            _ => {
                log::warn!("Failed login attempt for username '{username}'");
                return Err(AppError::AuthError(
                    "Invalid username or password".to_string(),
                ));
            }
        };

        if !user.is_active {
            log::warn!("Login rejected for inactive user '{username}'");
            return Err(AppError::AuthError("Account is disabled".to_string()));
        }

        let mut am = user.into_active_model();
        am.last_login_at = Set(Some(Utc::now()));
        let user = am.update(&self.pool).await?;

        let auth_user = AuthUser::from(&user);
        let access_token = self.jwt_service.generate_access_token(&auth_user)?;
        let refresh_token = self.jwt_service.generate_refresh_token(&auth_user)?;
        log::info!("User '{}' logged in", user.username);

        Ok(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    /// 用刷新令牌换新的访问令牌；角色和页面权限取自数据库当前值
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<TokenResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id = claims.to_auth_user()?.id;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;
        if !user.is_active {
            return Err(AppError::AuthError("Account is disabled".to_string()));
        }

        let access_token = self
            .jwt_service
            .generate_access_token(&AuthUser::from(&user))?;
        Ok(TokenResponse {
            access_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let user = self.user_service.get_user(user_id).await?;
        if !verify_password(&request.old_password, &user.password_hash)? {
            return Err(AppError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(&request.new_password)?;
        let username = user.username.clone();
        self.user_service
            .store_password(user, &request.new_password)
            .await?;
        log::info!("User '{username}' changed password");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::models::{CreateUserRequest, Page};
    use crate::database::test_support::test_db;

    async fn setup() -> (AuthService, UserService, JwtService) {
        let db = test_db().await;
        let jwt = JwtService::new("test-secret", 300, 600);
        let users = UserService::new(db.clone());
        users.ensure_bootstrap_admin("kiosk2024").await.unwrap();
        let admin = AuthUser {
            id: 0,
            username: "admin".into(),
            role: UserRole::Admin,
            pages: vec![],
        };
        users
            .create_user(&admin, CreateUserRequest {
                username: "ravi".into(),
                password: "counter2024".into(),
                full_name: None,
                role: UserRole::Staff,
                pages: vec![Page::Orders, Page::Customers],
            })
            .await
            .unwrap();
        (AuthService::new(db, jwt.clone()), users, jwt)
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_tokens_with_pages() {
        let (auth, _, jwt) = setup().await;
        let resp = auth.login(login("ravi", "counter2024")).await.unwrap();
        assert!(resp.user.last_login_at.is_some());

        let claims = jwt.verify_access_token(&resp.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Staff);
        assert_eq!(claims.pages, vec![Page::Orders, Page::Customers]);
        assert!(jwt.verify_refresh_token(&resp.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password_and_inactive_user() {
        let (auth, users, _) = setup().await;
        assert!(matches!(
            auth.login(login("ravi", "wrong")).await,
            Err(AppError::AuthError(_))
        ));
        assert!(auth.login(login("nobody", "counter2024")).await.is_err());

        let admin = AuthUser {
            id: 0,
            username: "admin".into(),
            role: UserRole::Admin,
            pages: vec![],
        };
        let ravi = users
            .list_users(&admin)
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.username == "ravi")
            .unwrap();
        users.set_active(&admin, ravi.id, false).await.unwrap();
        assert!(auth.login(login("ravi", "counter2024")).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_uses_current_permissions() {
        let (auth, _, jwt) = setup().await;
        let resp = auth.login(login("admin", "kiosk2024")).await.unwrap();

        let refreshed = auth.refresh_token(&resp.refresh_token).await.unwrap();
        let claims = jwt.verify_access_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Admin);

        // 访问令牌不能用于刷新
        assert!(auth.refresh_token(&resp.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (auth, _, _) = setup().await;
        let resp = auth.login(login("ravi", "counter2024")).await.unwrap();
        let user_id = resp.user.id;

        let wrong_old = ChangePasswordRequest {
            old_password: "nope".into(),
            new_password: "fresh2025x".into(),
        };
        assert!(auth.change_password(user_id, wrong_old).await.is_err());

        let ok = ChangePasswordRequest {
            old_password: "counter2024".into(),
            new_password: "fresh2025x".into(),
        };
        auth.change_password(user_id, ok).await.unwrap();
        assert!(auth.login(login("ravi", "fresh2025x")).await.is_ok());
        assert!(auth.login(login("ravi", "counter2024")).await.is_err());
    }
}
