//! Background scheduled tasks for the application.
//!
//! The only recurring job is the automatic database backup. Call `spawn_all`
//! once during startup to launch it.

use crate::config::BackupConfig;
use crate::services::BackupService;

/// Spawn all background tasks.
///
/// Detaches via `tokio::spawn`; does not block. `auto_interval_hours == 0`
/// disables the backup loop.
pub fn spawn_all(backup_service: BackupService, backup: &BackupConfig) {
    if backup.auto_interval_hours == 0 {
        log::info!("Automatic backups disabled");
        return;
    }

    let interval = std::time::Duration::from_secs(backup.auto_interval_hours * 3600);
    log::info!(
        "Automatic backups every {}h, keeping {}",
        backup.auto_interval_hours,
        backup.keep
    );

    tokio::spawn(async move {
        loop {
            // 启动后先等待一个周期
            tokio::time::sleep(interval).await;
            match backup_service.create_auto_backup().await {
                Ok(info) => log::info!("Automatic backup created: {}", info.name),
                Err(e) => log::error!("Automatic backup failed: {e:?}"),
            }
        }
    });
}
