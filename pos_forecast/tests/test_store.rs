mod common;

use common::{june_records, test_config};
use pos_forecast::features::build_training_set;
use pos_forecast::store::{DatasetStore, ModelStore};
use pos_forecast::{SalesForecastModel, UserId};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn trained_on(days: u32, root: &std::path::Path) -> SalesForecastModel {
    let (frame, targets) = build_training_set(&june_records(days)).unwrap();
    let mut model = SalesForecastModel::new(&test_config(root));
    model.train(&frame, &targets).unwrap();
    model
}

#[test]
fn test_dataset_replace_then_replace_loads_the_second() {
    let dir = TempDir::new().unwrap();
    let store = DatasetStore::new(dir.path());
    let user = UserId(1);

    let a = june_records(12);
    let b = june_records(5);
    store.replace(user, &a).unwrap();
    store.replace(user, &b).unwrap();

    assert_eq!(store.load(user).unwrap(), b);
}

#[test]
fn test_model_replace_then_replace_loads_the_second() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());
    let user = UserId(1);

    let a = trained_on(12, dir.path());
    let b = trained_on(20, dir.path());
    store.replace(user, &a, "random_forest").unwrap();
    store.replace(user, &b, "random_forest").unwrap();

    let loaded = store.load(user).unwrap().unwrap();
    assert_eq!(loaded, b);
    assert_eq!(store.metadata(user).unwrap().unwrap().training_sample_count, 20);
}

#[test]
fn test_users_are_isolated() {
    let dir = TempDir::new().unwrap();
    let datasets = DatasetStore::new(dir.path());
    let models = ModelStore::new(dir.path());

    datasets.replace(UserId(1), &june_records(12)).unwrap();
    models
        .replace(UserId(1), &trained_on(12, dir.path()), "random_forest")
        .unwrap();

    assert!(datasets.load(UserId(2)).unwrap().is_empty());
    assert!(!models.has_model(UserId(2)));

    let report = datasets.delete(UserId(2));
    assert!(report.removed.is_empty());
    assert!(datasets.exists(UserId(1)));
}

#[test]
fn test_delete_leaves_nothing_behind() {
    let dir = TempDir::new().unwrap();
    let datasets = DatasetStore::new(dir.path());
    let models = ModelStore::new(dir.path());
    let user = UserId(7);

    datasets.replace(user, &june_records(12)).unwrap();
    models
        .replace(user, &trained_on(12, dir.path()), "random_forest")
        .unwrap();

    let mut report = models.delete(user);
    report.merge(datasets.delete(user));
    assert!(report.is_complete());
    assert_eq!(
        report.removed,
        vec![
            "model metadata",
            "model artifact",
            "model directory",
            "dataset",
            "dataset directory"
        ]
    );

    assert!(datasets.load(user).unwrap().is_empty());
    assert!(!models.has_model(user));
    assert!(models.load(user).unwrap().is_none());
    assert!(!dir.path().join("models").join("7").exists());
}

#[test]
fn test_undeletable_artifact_is_listed_as_failed() {
    let dir = TempDir::new().unwrap();
    let models = ModelStore::new(dir.path());
    let user = UserId(3);

    let metadata = models
        .replace(user, &trained_on(12, dir.path()), "random_forest")
        .unwrap();
    std::fs::remove_file(&metadata.artifact_path).unwrap();
    std::fs::create_dir(&metadata.artifact_path).unwrap();
    std::fs::write(metadata.artifact_path.join("part"), b"x").unwrap();

    let report = models.delete(user);
    assert!(!report.is_complete());
    assert_eq!(report.removed, vec!["model metadata"]);
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed[0].starts_with("model artifact: "));
    assert!(report.failed[1].starts_with("model directory: "));
    assert!(models.metadata(user).unwrap().is_none());

    assert!(matches!(
        report.into_result(),
        Err(pos_forecast::ForecastError::PartialDelete { .. })
    ));
}
