use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub kiosk: KioskConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// 为空时启动阶段生成随机密钥
    #[serde(default)]
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// 税率 (basis points, 10000 = 100%)
    #[serde(default)]
    pub tax_rate_bp: i64,
    /// 报表按本地时间分组
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_topping_categories")]
    pub topping_categories: Vec<String>,
    /// 每消费多少 paise 积 1 分，0 表示不积分
    #[serde(default = "default_loyalty_spend_per_point")]
    pub loyalty_spend_per_point: i64,
    #[serde(default = "default_min_stock")]
    pub default_min_stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub dir: String,
    /// 0 disables the automatic backup task
    #[serde(default)]
    pub auto_interval_hours: u64,
    #[serde(default = "default_backup_keep")]
    pub keep: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_password: String,
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_topping_categories() -> Vec<String> {
    vec!["Sandwich".to_string(), "Maggi".to_string()]
}

fn default_loyalty_spend_per_point() -> i64 {
    1000
}

fn default_min_stock() -> i32 {
    5
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_backup_keep() -> usize {
    14
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            tax_rate_bp: 0,
            utc_offset_minutes: 0,
            topping_categories: default_topping_categories(),
            loyalty_spend_per_point: default_loyalty_spend_per_point(),
            default_min_stock: default_min_stock(),
        }
    }
}

impl KioskConfig {
    pub fn allows_toppings(&self, category: &str) -> bool {
        self.topping_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }

    pub fn utc_offset(&self) -> chrono::FixedOffset {
        use chrono::Offset;
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or(chrono::Utc.fix())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            auto_interval_hours: 0,
            keep: default_backup_keep(),
        }
    }
}

impl DatabaseConfig {
    /// SQLite 文件路径（`sqlite://food_orders.db?mode=rwc` -> `food_orders.db`），内存库返回 None
    pub fn sqlite_path(&self) -> Option<std::path::PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(std::path::PathBuf::from(path))
    }
}

impl JwtConfig {
    /// 未配置密钥时生成一次性随机密钥，重启后旧令牌全部失效
    pub fn ensure_secret(&mut self) {
        if !self.secret.trim().is_empty() {
            return;
        }
        self.secret = crate::utils::generate_password(48);
        log::warn!(
            "JWT_SECRET is not set; using a random secret, issued tokens will not survive a restart"
        );
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Config::from_env_defaults(),
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        config.jwt.ensure_secret();

        Ok(config)
    }

    fn from_env_defaults() -> Self {
        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: get_env("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite://food_orders.db?mode=rwc".to_string()),
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 5u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET").unwrap_or_default(),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 43_200i64),
                refresh_token_expires_in: get_env_parse("JWT_REFRESH_EXPIRES_IN", 604_800i64),
            },
            kiosk: KioskConfig::default(),
            backup: BackupConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("KIOSK_TAX_RATE_BP")
            && let Ok(n) = v.parse()
        {
            self.kiosk.tax_rate_bp = n;
        }
        if let Ok(v) = env::var("KIOSK_UTC_OFFSET_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.kiosk.utc_offset_minutes = n;
        }
        if let Ok(v) = env::var("KIOSK_TOPPING_CATEGORIES") {
            self.kiosk.topping_categories = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("BACKUP_DIR") {
            self.backup.dir = v;
        }
        if let Ok(v) = env::var("BACKUP_AUTO_INTERVAL_HOURS")
            && let Ok(n) = v.parse()
        {
            self.backup.auto_interval_hours = n;
        }
        if let Ok(v) = env::var("BACKUP_KEEP")
            && let Ok(n) = v.parse()
        {
            self.backup.keep = n;
        }
        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = v;
        }
    }
}
