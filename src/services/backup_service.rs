use crate::config::BackupConfig;
use crate::database::staged_restore_path;
use crate::error::{AppError, AppResult};
use crate::models::{BackupInfo, RestoreResponse};
use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const AUTO_PREFIX: &str = "auto_";

fn backup_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"^(auto_)?backup_(\d{8}_\d{6})(?:_(\d{1,3}))?\.db$")
            .expect("valid backup name regex")
    })
}

pub fn is_valid_backup_name(name: &str) -> bool {
    backup_name_regex().is_match(name)
}

/// 创建顺序：时间戳，再按同一秒内的序号（无序号的最早）
fn creation_key(name: &str) -> (String, u32) {
    let Some(caps) = backup_name_regex().captures(name) else {
        return (String::new(), 0);
    };
    let stamp = caps.get(2).map_or("", |m| m.as_str()).to_string();
    let seq = caps
        .get(3)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map_or(0, |n| n + 1);
    (stamp, seq)
}

#[derive(Clone)]
pub struct BackupService {
    pool: DatabaseConnection,
    dir: PathBuf,
    keep: usize,
    /// None 表示内存数据库，不支持恢复
    db_path: Option<PathBuf>,
}

impl BackupService {
    pub fn new(pool: DatabaseConnection, config: &BackupConfig, db_path: Option<PathBuf>) -> Self {
        Self {
            pool,
            dir: PathBuf::from(&config.dir),
            keep: config.keep,
            db_path,
        }
    }

    /// `VACUUM INTO backups/backup_YYYYMMDD_HHMMSS.db`
    pub async fn create_backup(&self) -> AppResult<BackupInfo> {
        self.snapshot("").await
    }

    /// 自动备份，并只保留最近 `keep` 份自动备份
    pub async fn create_auto_backup(&self) -> AppResult<BackupInfo> {
        let info = self.snapshot(AUTO_PREFIX).await?;
        let removed = self.prune_auto_backups().await?;
        if removed > 0 {
            log::info!("Pruned {removed} old automatic backups");
        }
        Ok(info)
    }

    async fn snapshot(&self, prefix: &str) -> AppResult<BackupInfo> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut name = format!("{prefix}backup_{stamp}.db");
        let mut n = 1;
        while tokio::fs::try_exists(self.dir.join(&name)).await? {
            if n > 999 {
                return Err(AppError::InternalError(
                    "Too many backups in the same second".to_string(),
                ));
            }
            name = format!("{prefix}backup_{stamp}_{n}.db");
            n += 1;
        }
        let path = self.dir.join(&name);

        let target = path.to_string_lossy().replace('\'', "''");
        let backend = self.pool.get_database_backend();
        self.pool
            .execute(Statement::from_string(backend, format!("VACUUM INTO '{target}'")))
            .await?;

        let info = describe(&path, name).await?;
        log::info!("Backup created: {} ({} bytes)", info.name, info.size_bytes);
        Ok(info)
    }

    /// 最新的在前
    pub async fn list_backups(&self) -> AppResult<Vec<BackupInfo>> {
        let mut list = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(list),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_valid_backup_name(&name) {
                continue;
            }
            list.push(describe(&entry.path(), name).await?);
        }
        list.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| creation_key(&b.name).cmp(&creation_key(&a.name)))
        });
        Ok(list)
    }

    pub async fn delete_backup(&self, name: &str) -> AppResult<()> {
        let path = self.resolve(name).await?;
        tokio::fs::remove_file(&path).await?;
        log::info!("Backup deleted: {name}");
        Ok(())
    }

    /// 把备份复制为 `<db>.restore`，下次启动时在打开连接池之前替换数据库
    pub async fn stage_restore(&self, name: &str) -> AppResult<RestoreResponse> {
        let db_path = self.db_path.as_ref().ok_or_else(|| {
            AppError::ConfigError("Restore requires a file-backed SQLite database".to_string())
        })?;
        let source = self.resolve(name).await?;

        let staged = staged_restore_path(db_path);
        let mut tmp = staged.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::copy(&source, &tmp).await?;
        tokio::fs::rename(&tmp, &staged).await?;

        log::warn!(
            "Restore from {name} staged at {}; it will be applied on the next restart",
            staged.display()
        );
        Ok(RestoreResponse {
            name: name.to_string(),
            restart_required: true,
        })
    }

    pub async fn prune_auto_backups(&self) -> AppResult<usize> {
        let mut autos: Vec<BackupInfo> = self
            .list_backups()
            .await?
            .into_iter()
            .filter(|b| b.name.starts_with(AUTO_PREFIX))
            .collect();
        autos.sort_by_cached_key(|b| std::cmp::Reverse(creation_key(&b.name)));

        let mut removed = 0;
        for old in autos.iter().skip(self.keep.max(1)) {
            tokio::fs::remove_file(self.dir.join(&old.name)).await?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        if !is_valid_backup_name(name) {
            return Err(AppError::ValidationError(format!(
                "Invalid backup name: {name}"
            )));
        }
        let path = self.dir.join(name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(AppError::NotFound(format!("Backup {name} not found")));
        }
        Ok(path)
    }
}

async fn describe(path: &Path, name: String) -> AppResult<BackupInfo> {
    let meta = tokio::fs::metadata(path).await?;
    let modified_at = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(BackupInfo {
        name,
        size_bytes: meta.len(),
        modified_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{file_db, test_db};

    fn config(dir: &Path, keep: usize) -> BackupConfig {
        BackupConfig {
            dir: dir.to_string_lossy().to_string(),
            auto_interval_hours: 0,
            keep,
        }
    }

    #[test]
    fn test_backup_name_validation() {
        assert!(is_valid_backup_name("backup_20250301_221500.db"));
        assert!(is_valid_backup_name("auto_backup_20250301_221500.db"));
        assert!(is_valid_backup_name("backup_20250301_221500_2.db"));
        assert!(!is_valid_backup_name("../food_orders.db"));
        assert!(!is_valid_backup_name("backup_20250301_221500.db/../../x"));
        assert!(!is_valid_backup_name("backup_2025.db"));
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_db(&dir.path().join("kiosk.db")).await;
        let svc = BackupService::new(pool, &config(&dir.path().join("backups"), 3), None);

        let first = svc.create_backup().await.unwrap();
        let second = svc.create_backup().await.unwrap();
        assert_ne!(first.name, second.name);
        assert!(first.size_bytes > 0);

        let list = svc.list_backups().await.unwrap();
        assert_eq!(list.len(), 2);

        svc.delete_backup(&first.name).await.unwrap();
        assert_eq!(svc.list_backups().await.unwrap().len(), 1);
        assert!(matches!(
            svc.delete_backup(&first.name).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_backup("../secret.db").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_when_directory_missing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = BackupService::new(test_db().await, &config(&dir.path().join("none"), 3), None);
        assert!(svc.list_backups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stage_restore() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("food_orders.db");
        let svc = BackupService::new(
            file_db(&db_path).await,
            &config(&dir.path().join("backups"), 3),
            Some(db_path.clone()),
        );
        let backup = svc.create_backup().await.unwrap();

        let resp = svc.stage_restore(&backup.name).await.unwrap();
        assert!(resp.restart_required);
        let staged = staged_restore_path(&db_path);
        assert_eq!(
            std::fs::metadata(&staged).unwrap().len(),
            backup.size_bytes
        );
        assert!(svc.stage_restore("backup_20000101_000000.db").await.is_err());
    }

    #[tokio::test]
    async fn test_restore_requires_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_db(&dir.path().join("kiosk.db")).await;
        let svc = BackupService::new(pool, &config(&dir.path().join("backups"), 3), None);
        let backup = svc.create_backup().await.unwrap();
        assert!(matches!(
            svc.stage_restore(&backup.name).await,
            Err(AppError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_backups_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_db(&dir.path().join("kiosk.db")).await;
        let svc = BackupService::new(pool, &config(&dir.path().join("backups"), 2), None);
        svc.create_backup().await.unwrap();
        for _ in 0..4 {
            svc.create_auto_backup().await.unwrap();
        }

        let list = svc.list_backups().await.unwrap();
        let autos = list.iter().filter(|b| b.name.starts_with(AUTO_PREFIX)).count();
        assert_eq!(autos, 2);
        // 手动备份不受影响
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn test_prune_orders_same_second_suffixes_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "auto_backup_20250301_221500.db",
            "auto_backup_20250301_221500_2.db",
            "auto_backup_20250301_221500_9.db",
            "auto_backup_20250301_221500_10.db",
            "auto_backup_20250228_235959_99.db",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let svc = BackupService::new(test_db().await, &config(dir.path(), 2), None);

        assert_eq!(svc.prune_auto_backups().await.unwrap(), 3);
        let mut left: Vec<String> = svc
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "auto_backup_20250301_221500_10.db",
                "auto_backup_20250301_221500_9.db",
            ]
        );
    }

    #[test]
    fn test_creation_key() {
        assert!(
            creation_key("backup_20250301_221500_10.db")
                > creation_key("backup_20250301_221500_9.db")
        );
        assert!(
            creation_key("backup_20250301_221500_1.db")
                > creation_key("backup_20250301_221500.db")
        );
        assert!(
            creation_key("auto_backup_20250302_000000.db")
                > creation_key("auto_backup_20250301_235959_999.db")
        );
    }
}
