mod common;

use db::models::{
    config::ConfigEntry,
    sync_log::{SyncLog, SyncStatus},
};

#[tokio::test]
async fn config_set_overwrites_per_key() {
    let pool = common::test_pool().await;

    ConfigEntry::set(&pool, "ai_provider", "oneadvanced")
        .await
        .unwrap();
    ConfigEntry::set(&pool, "ai_provider", "gemini").await.unwrap();
    ConfigEntry::set(&pool, "product_name", "Adastra").await.unwrap();

    assert_eq!(
        ConfigEntry::get(&pool, "ai_provider").await.unwrap().as_deref(),
        Some("gemini")
    );
    assert_eq!(ConfigEntry::all(&pool).await.unwrap().len(), 2);
}

#[tokio::test]
async fn selected_releases_default_to_empty() {
    let pool = common::test_pool().await;
    assert!(ConfigEntry::selected_releases(&pool).await.unwrap().is_empty());

    let names = vec!["FY27".to_string(), "Adastra 3.52".to_string()];
    ConfigEntry::set_selected_releases(&pool, &names).await.unwrap();
    assert_eq!(ConfigEntry::selected_releases(&pool).await.unwrap(), names);
}

#[tokio::test]
async fn malformed_selected_releases_are_ignored() {
    let pool = common::test_pool().await;
    ConfigEntry::set(&pool, "selected_releases", "not json")
        .await
        .unwrap();
    assert!(ConfigEntry::selected_releases(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_logs_append_and_list_newest_first() {
    let pool = common::test_pool().await;

    SyncLog::create(&pool, SyncStatus::Success, "Synced 3 features", 3, "admin")
        .await
        .unwrap();
    // Keep the second row strictly newer than the first.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    SyncLog::create(&pool, SyncStatus::Failed, "Sync cancelled by user", 0, "admin")
        .await
        .unwrap();

    let logs = SyncLog::find_recent(&pool, 20).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].sync_status, SyncStatus::Failed);
    assert_eq!(logs[1].initiatives_synced, 3);

    let limited = SyncLog::find_recent(&pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}
