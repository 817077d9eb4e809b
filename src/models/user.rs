use crate::entities::{UserRole, user_entity};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 页面权限；管理员默认拥有全部页面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Page {
    Orders,
    Customers,
    Inventory,
    Reports,
    Manage,
    Backup,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Orders,
        Page::Customers,
        Page::Inventory,
        Page::Reports,
        Page::Manage,
        Page::Backup,
    ];

    /// 员工可被授予的页面；Manage 与 Backup 仅管理员可用
    pub const STAFF: [Page; 4] = [Page::Orders, Page::Customers, Page::Inventory, Page::Reports];

    pub fn is_admin_only(&self) -> bool {
        !Page::STAFF.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Orders => "Orders",
            Page::Customers => "Customers",
            Page::Inventory => "Inventory",
            Page::Reports => "Reports",
            Page::Manage => "Manage",
            Page::Backup => "Backup",
        }
    }

    pub fn parse(s: &str) -> AppResult<Page> {
        Page::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::ValidationError(format!("Unknown page: {s}")))
    }

    /// `users.pages` 列的存储格式
    pub fn join(pages: &[Page]) -> String {
        pages.iter().map(Page::as_str).collect::<Vec<_>>().join(",")
    }

    /// 忽略无法识别的页面名（旧数据）
    pub fn split(stored: &str) -> Vec<Page> {
        let mut pages = Vec::new();
        for part in stored.split(',').filter(|s| !s.trim().is_empty()) {
            if let Ok(page) = Page::parse(part)
                && !pages.contains(&page)
            {
                pages.push(page);
            }
        }
        pages
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 认证中间件写入请求扩展的当前用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub pages: Vec<Page>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_access(&self, page: Page) -> bool {
        self.is_admin() || (!page.is_admin_only() && self.pages.contains(&page))
    }

    pub fn require(&self, page: Page) -> AppResult<()> {
        if self.can_access(page) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl From<&user_entity::Model> for AuthUser {
    fn from(user: &user_entity::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            pages: effective_pages(user.role, &Page::split(&user.pages)),
        }
    }
}

pub fn effective_pages(role: UserRole, pages: &[Page]) -> Vec<Page> {
    match role {
        UserRole::Admin => Page::ALL.to_vec(),
        UserRole::Staff => {
            let mut allowed = Vec::new();
            for page in pages {
                if !page.is_admin_only() && !allowed.contains(page) {
                    allowed.push(*page);
                }
            }
            allowed
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "kiosk2024")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "ravi")]
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub pages: Option<Vec<Page>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub pages: Vec<Page>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(user: user_entity::Model) -> Self {
        let pages = effective_pages(user.role, &Page::split(&user.pages));
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            pages,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}
