use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::{Path, PathBuf};

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections.max(1))
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    log::info!(
        "Database connection pool established (max_connections={})",
        config.max_connections
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// 恢复时暂存的文件：`<db>.restore`
pub fn staged_restore_path(db_path: &Path) -> PathBuf {
    with_suffix(db_path, ".restore")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// 启动时（连接池打开之前）应用暂存的恢复文件。
///
/// 当前数据库先移到 `<db>.pre-restore`，再把 `<db>.restore` 改名为数据库文件。
/// 返回是否执行了恢复。
pub fn apply_pending_restore(db_path: &Path) -> AppResult<bool> {
    let staged = staged_restore_path(db_path);
    if !staged.exists() {
        return Ok(false);
    }

    if db_path.exists() {
        let previous = with_suffix(db_path, ".pre-restore");
        std::fs::rename(db_path, &previous)?;
        log::warn!(
            "Previous database kept at {} before restore",
            previous.display()
        );
    }
    for side in ["-wal", "-shm"] {
        let side_file = with_suffix(db_path, side);
        if side_file.exists() {
            std::fs::remove_file(&side_file)?;
        }
    }

    std::fs::rename(&staged, db_path)?;
    log::warn!("Database restored from staged file {}", staged.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_pending_restore_swaps_files() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("food_orders.db");
        std::fs::write(&db, b"live").unwrap();
        std::fs::write(staged_restore_path(&db), b"snapshot").unwrap();

        assert!(apply_pending_restore(&db).unwrap());
        assert_eq!(std::fs::read(&db).unwrap(), b"snapshot");
        assert_eq!(
            std::fs::read(dir.path().join("food_orders.db.pre-restore")).unwrap(),
            b"live"
        );
        assert!(!staged_restore_path(&db).exists());
    }

    #[test]
    fn test_apply_pending_restore_without_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("food_orders.db");
        std::fs::write(&db, b"live").unwrap();

        assert!(!apply_pending_restore(&db).unwrap());
        assert_eq!(std::fs::read(&db).unwrap(), b"live");
    }
}
