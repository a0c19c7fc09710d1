//! 用户认证和授权系统
//!
//! 密码加盐哈希存储，登录后签发带服务端过期时间的会话令牌。

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use clinic_core::{ClinicError, Result, StaffRole};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers::{ApiError, Result as ApiResult};
use crate::server::AppState;

/// 认证用户信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
}

/// 存储的用户记录
#[derive(Debug, Clone)]
struct StoredUser {
    user: AuthUser,
    salt: String,
    password_hash: String,
}

/// 会话
#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// 登录请求
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthUser,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// 认证服务
pub struct AuthService {
    users: RwLock<HashMap<String, StoredUser>>,
    sessions: RwLock<HashMap<String, Session>>,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new() -> Self {
        Self::with_token_ttl(24)
    }

    pub fn with_token_ttl(token_ttl_hours: i64) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            token_ttl_hours,
        }
    }

    /// 创建用户
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        role: StaffRole,
    ) -> Result<AuthUser> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(ClinicError::Validation(format!(
                "User {} already exists",
                username
            )));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user = AuthUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_login: None,
        };

        users.insert(
            username.to_string(),
            StoredUser {
                user: user.clone(),
                password_hash: hash_password(&salt, password),
                salt,
            },
        );

        info!("Created user {}", username);
        Ok(user)
    }

    /// 初始化默认账号；部署后应立即修改密码
    pub async fn init_default_users(&self) {
        let defaults = [
            ("admin", "admin", "System Administrator", StaffRole::Admin),
            ("reception", "reception", "Front Desk", StaffRole::Receptionist),
            ("cashier", "cashier", "Cashier Desk", StaffRole::Cashier),
        ];

        for (username, password, full_name, role) in defaults {
            if let Err(e) = self.add_user(username, password, full_name, role).await {
                warn!("Skipping default user {}: {}", username, e);
            }
        }

        info!("Initialized default users");
    }

    /// 用户登录
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let users = self.users.read().await;

        let stored = users
            .get(&request.username)
            .ok_or_else(|| ClinicError::Validation("Invalid username or password".to_string()))?;

        if !stored.user.is_active {
            return Err(ClinicError::Validation("Account is disabled".to_string()));
        }

        if hash_password(&stored.salt, &request.password) != stored.password_hash {
            return Err(ClinicError::Validation(
                "Invalid username or password".to_string(),
            ));
        }
        drop(users);

        let token = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let expires_at = chrono::Utc::now() + chrono::Duration::hours(self.token_ttl_hours);

        self.sessions.write().await.insert(
            token.clone(),
            Session {
                username: request.username.clone(),
                expires_at,
            },
        );

        // 更新最后登录时间
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&request.username)
            .ok_or_else(|| ClinicError::Internal("User vanished during login".to_string()))?;
        stored.user.last_login = Some(chrono::Utc::now());
        let user = stored.user.clone();

        Ok(LoginResponse {
            token,
            user,
            expires_at,
        })
    }

    /// 验证会话令牌
    pub async fn verify_token(&self, token: &str) -> Result<AuthUser> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(token).cloned()
        };

        let session =
            session.ok_or_else(|| ClinicError::Permission("Invalid token".to_string()))?;

        if session.expires_at < chrono::Utc::now() {
            self.sessions.write().await.remove(token);
            return Err(ClinicError::Permission("Token has expired".to_string()));
        }

        let users = self.users.read().await;
        let stored = users
            .get(&session.username)
            .ok_or_else(|| ClinicError::Permission("User not found".to_string()))?;

        if !stored.user.is_active {
            return Err(ClinicError::Permission("Account is disabled".to_string()));
        }

        Ok(stored.user.clone())
    }

    /// 注销会话
    pub async fn logout(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// 获取所有用户（管理员功能）
    pub async fn get_all_users(&self) -> Vec<AuthUser> {
        self.users
            .read()
            .await
            .values()
            .map(|stored| stored.user.clone())
            .collect()
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

/// 加盐哈希密码
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 校验用户角色
pub fn require_role(user: &AuthUser, allowed: &[StaffRole]) -> Result<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ClinicError::Permission(format!(
            "Role {:?} is not allowed to perform this action",
            user.role
        )))
    }
}

/// 认证中间件
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    // 从请求头获取token
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(ApiError::from(ClinicError::Permission(
                "Missing token".to_string(),
            )));
        }
    };

    let user = state.auth.verify_token(token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// 登录处理器
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Login attempt for user: {}", request.username);

    let response = state.auth.login(request).await.map_err(|e| {
        warn!("Login failed: {}", e);
        e
    })?;

    state
        .audit
        .record(&response.user.username, "auth.login", "session", None)
        .await;
    Ok(Json(response))
}

/// 获取当前用户信息
pub async fn get_current_user(request: Request) -> ApiResult<impl IntoResponse> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ClinicError::Permission("User not authenticated".to_string()))?;

    Ok(Json(user.clone()))
}

/// 获取所有用户（仅管理员）
pub async fn get_all_users_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    let users = state.auth.get_all_users().await;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_and_verify() {
        let auth = AuthService::new();
        auth.add_user("reception", "secret", "Front Desk", StaffRole::Receptionist)
            .await
            .unwrap();

        let response = auth
            .login(LoginRequest {
                username: "reception".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        let user = auth.verify_token(&response.token).await.unwrap();
        assert_eq!(user.username, "reception");
        assert_eq!(user.role, StaffRole::Receptionist);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let auth = AuthService::new();
        auth.add_user("reception", "secret", "Front Desk", StaffRole::Receptionist)
            .await
            .unwrap();

        assert!(auth
            .login(LoginRequest {
                username: "reception".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .is_err());

        assert!(auth.verify_token("no-such-token").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let auth = AuthService::with_token_ttl(-1);
        auth.add_user("cashier", "secret", "Cashier", StaffRole::Cashier)
            .await
            .unwrap();

        let response = auth
            .login(LoginRequest {
                username: "cashier".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert!(auth.verify_token(&response.token).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let auth = AuthService::new();
        auth.add_user("admin", "secret", "Admin", StaffRole::Admin)
            .await
            .unwrap();

        let response = auth
            .login(LoginRequest {
                username: "admin".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        auth.logout(&response.token).await;
        assert!(auth.verify_token(&response.token).await.is_err());
    }

    #[test]
    fn test_require_role() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            username: "nurse".to_string(),
            full_name: "Nurse".to_string(),
            role: StaffRole::Nurse,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_login: None,
        };

        assert!(require_role(&user, &[StaffRole::Nurse, StaffRole::Doctor]).is_ok());
        assert!(require_role(&user, &[StaffRole::Admin]).is_err());
    }

    #[test]
    fn test_hash_depends_on_salt() {
        assert_ne!(hash_password("salt1", "pw"), hash_password("salt2", "pw"));
        assert_eq!(hash_password("salt1", "pw"), hash_password("salt1", "pw"));
    }
}
