use std::fs;
use std::path::Path;

use clefs::backup;
use clefs::domain::{BorrowerInput, BuildingInput, DomainError, KeyInput};
use clefs::import;
use clefs::models::{borrower, building, key, key_room, loan, room};
use clefs::services::loan_service;
use clefs::{AppState, Store};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Statement};

async fn open_store(dir: &Path) -> Store {
    Store::open_at(dir.join("clefs.db"))
        .await
        .expect("Failed to open store")
}

async fn add_building(store: &Store, name: &str) -> i32 {
    AppState::new(store.conn().unwrap().clone())
        .building_repo
        .create(BuildingInput {
            name: name.to_string(),
        })
        .await
        .expect("Failed to create building")
        .id
}

async fn building_names(store: &Store) -> Vec<String> {
    building::Entity::find()
        .all(store.conn().unwrap())
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect()
}

async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(db.get_database_backend(), sql.to_owned()))
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"));
}

fn count_matching(dir: &Path, needle: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().contains(needle))
        .count()
}

#[tokio::test]
async fn backup_then_restore_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    add_building(&store, "Bâtiment Principal").await;

    backup::create_backup_directory(store.path()).unwrap();
    let saved = backup::default_backup_path(store.path());
    backup::backup_database(store.path(), &saved).unwrap();

    add_building(&store, "Annexe A").await;
    assert_eq!(building_names(&store).await.len(), 2);

    let safety = backup::restore_database(&mut store, &saved)
        .await
        .unwrap()
        .expect("current file should be kept");
    assert!(safety.exists());
    assert_eq!(count_matching(dir.path(), ".before_restore."), 1);

    assert!(store.is_open());
    assert_eq!(building_names(&store).await, vec!["Bâtiment Principal"]);

    store.close().await.unwrap();
    assert_eq!(
        fs::read(dir.path().join("clefs.db")).unwrap(),
        fs::read(&saved).unwrap()
    );
}

#[tokio::test]
async fn restore_from_missing_backup_keeps_store_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;

    let err = backup::restore_database(&mut store, &dir.path().join("absent.db"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert!(store.is_open());
    assert_eq!(count_matching(dir.path(), ".before_restore."), 0);
}

#[tokio::test]
async fn restore_through_an_alias_of_the_database_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    add_building(&store, "Bâtiment Principal").await;
    fs::create_dir(dir.path().join("sub")).unwrap();

    let aliased = dir.path().join("sub").join("..").join("clefs.db");
    let err = backup::restore_database(&mut store, &aliased)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    assert!(store.is_open());
    assert_eq!(building_names(&store).await, vec!["Bâtiment Principal"]);
    assert_eq!(count_matching(dir.path(), ".before_restore."), 0);
}

#[tokio::test]
async fn quick_successive_resets_keep_both_backups() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    add_building(&store, "Annexe A").await;

    let first = backup::reset_database(&mut store).await.unwrap();
    let second = backup::reset_database(&mut store).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(backup::list_backups(store.path()).unwrap().len(), 2);

    // The first backup still holds the building
    let mut old = Store::open_at(&first).await.unwrap();
    assert_eq!(
        building::Entity::find()
            .count(old.conn().unwrap())
            .await
            .unwrap(),
        1
    );
    old.close().await.unwrap();
}

#[tokio::test]
async fn reset_empties_tables_and_keeps_one_backup() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    clefs::seed::seed_demo_data(store.conn().unwrap())
        .await
        .unwrap();
    assert!(backup::list_backups(store.path()).unwrap().is_empty());

    let saved = backup::reset_database(&mut store).await.unwrap();

    let backups = backup::list_backups(store.path()).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].path, saved);
    assert!(backups[0].size > 0);

    let db = store.conn().unwrap();
    assert_eq!(building::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(room::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(key::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(key_room::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(borrower::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(loan::Entity::find().count(db).await.unwrap(), 0);

    // The backup still holds the demo data
    let mut old = Store::open_at(&saved).await.unwrap();
    assert_eq!(
        key::Entity::find().count(old.conn().unwrap()).await.unwrap(),
        10
    );
    old.close().await.unwrap();
}

#[tokio::test]
async fn backups_are_listed_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let backups_dir = backup::create_backup_directory(store.path()).unwrap();
    let first = backups_dir.join("clefs_backup_20240101_080000.db");
    backup::backup_database(store.path(), &first).unwrap();
    fs::write(backups_dir.join("readme.txt"), "not a backup").unwrap();

    let listed = backup::list_backups(store.path()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "clefs_backup_20240101_080000.db");

    let absolute = fs::canonicalize(&first).unwrap();
    backup::delete_backup(&absolute).unwrap();
    assert!(!first.exists());
    assert!(backup::list_backups(store.path()).unwrap().is_empty());
}

#[tokio::test]
async fn delete_backup_refuses_the_database_itself() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    assert!(matches!(
        backup::delete_backup(Path::new("/data/clefs.db")),
        Err(DomainError::Validation(_))
    ));

    let db_path = fs::canonicalize(store.path()).unwrap();
    assert!(matches!(
        backup::delete_backup(&db_path),
        Err(DomainError::Validation(_))
    ));
    assert!(db_path.exists());
}

#[tokio::test]
async fn store_can_be_reopened_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    add_building(&store, "Annexe B").await;

    store.close().await.unwrap();
    assert!(matches!(store.conn(), Err(DomainError::InvalidState(_))));

    store.open().await.unwrap();
    assert_eq!(building_names(&store).await, vec!["Annexe B"]);
}

#[tokio::test]
async fn legacy_database_is_merged_by_id() {
    let dir = tempfile::tempdir().unwrap();

    // Older file: same layout, one loan pointing at a key that no longer exists
    let legacy_path = dir.path().join("legacy").join("ancien.db");
    fs::create_dir_all(legacy_path.parent().unwrap()).unwrap();
    let mut legacy = Store::open_at(&legacy_path).await.unwrap();
    {
        let db = legacy.conn().unwrap();
        exec(db, "PRAGMA foreign_keys = OFF").await;
        exec(db, "INSERT INTO buildings (id, name) VALUES (1, 'Ancien'), (2, 'Annexe')").await;
        exec(db, "INSERT INTO rooms (id, name, type, building_id) VALUES (1, 'Salle 1', 'Bureau', 2)").await;
        exec(db, "INSERT INTO keys (id, number, description, quantity_total, quantity_reserve) VALUES (1, 'K100', 'Vieille clé', 2, 0)").await;
        exec(db, "INSERT INTO key_room_association (key_id, room_id) VALUES (1, 1)").await;
        exec(db, "INSERT INTO borrowers (id, name, email) VALUES (1, 'Jean Dupont', '')").await;
        exec(db, "INSERT INTO loans (id, key_id, borrower_id, loan_date) VALUES (1, 1, 1, '2023-05-01 10:00:00'), (2, 42, 1, '2023-05-02 10:00:00')").await;
    }
    legacy.close().await.unwrap();

    let store = open_store(dir.path()).await;
    add_building(&store, "Existant").await;

    let summary = import::import_legacy_database(&store, &legacy_path)
        .await
        .unwrap();

    assert!(summary.backup_path.exists());
    assert_eq!(summary.buildings.read, 2);
    assert_eq!(summary.buildings.inserted, 1);
    assert_eq!(summary.rooms.inserted, 1);
    assert_eq!(summary.keys.inserted, 1);
    assert_eq!(summary.associations.inserted, 1);
    assert_eq!(summary.borrowers.inserted, 1);
    assert_eq!(summary.loans.read, 2);
    assert_eq!(summary.loans.inserted, 1);

    let mut names = building_names(&store).await;
    names.sort();
    assert_eq!(names, vec!["Annexe", "Existant"]);

    let db = store.conn().unwrap();
    let borrower = borrower::Entity::find_by_id(1).one(db).await.unwrap().unwrap();
    assert_eq!(borrower.email, None);
    assert_eq!(
        loan_service::count_active_loans_for_key(db, 1).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn oldest_schema_with_locations_is_understood() {
    let dir = tempfile::tempdir().unwrap();

    let legacy_path = dir.path().join("old").join("keys.db");
    fs::create_dir_all(legacy_path.parent().unwrap()).unwrap();
    let mut legacy = Store::open_at(&legacy_path).await.unwrap();
    {
        let db = legacy.conn().unwrap();
        exec(db, "DROP TABLE key_room_association").await;
        exec(db, "DROP TABLE rooms").await;
        exec(db, "CREATE TABLE locations (id INTEGER PRIMARY KEY, name TEXT, type TEXT, building_id INTEGER)").await;
        exec(db, "CREATE TABLE key_location_association (key_id INTEGER, location_id INTEGER)").await;
        exec(db, "INSERT INTO buildings (id, name) VALUES (1, 'Bibliothèque')").await;
        exec(db, "INSERT INTO locations (id, name, type, building_id) VALUES (5, 'Archives', 'Stockage', 1)").await;
        exec(db, "INSERT INTO keys (id, number, quantity_total, quantity_reserve) VALUES (3, 'K010', 1, 0)").await;
        exec(db, "INSERT INTO key_location_association (key_id, location_id) VALUES (3, 5)").await;
    }
    legacy.close().await.unwrap();

    let store = open_store(dir.path()).await;
    let summary = import::import_legacy_database(&store, &legacy_path)
        .await
        .unwrap();
    assert_eq!(summary.rooms.inserted, 1);
    assert_eq!(summary.associations.inserted, 1);

    let state = AppState::new(store.conn().unwrap().clone());
    let rooms = state.key_repo.rooms_for_key(3).await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "Archives");
    assert_eq!(rooms[0].r#type.as_deref(), Some("Stockage"));
}

#[tokio::test]
async fn import_of_missing_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let err = import::import_legacy_database(&store, &dir.path().join("absent.db"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert!(backup::list_backups(store.path()).unwrap().is_empty());
}

#[tokio::test]
async fn loans_survive_a_backup_round() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path()).await;
    let state = AppState::new(store.conn().unwrap().clone());
    let key = state
        .key_repo
        .create(
            KeyInput {
                number: "K001".to_string(),
                description: None,
                quantity_total: 3,
                quantity_reserve: 1,
                storage_location: None,
            },
            vec![],
        )
        .await
        .unwrap();
    let jean = state
        .borrower_repo
        .create(BorrowerInput {
            name: "Jean Dupont".to_string(),
            email: None,
        })
        .await
        .unwrap();
    loan_service::create_loan(state.db(), key.id, jean.id)
        .await
        .unwrap();

    let saved = dir.path().join("backups").join("avant.db");
    backup::backup_database(store.path(), &saved).unwrap();
    loan_service::create_loan(state.db(), key.id, jean.id)
        .await
        .unwrap();
    drop(state);

    backup::restore_database(&mut store, &saved).await.unwrap();
    let db = store.conn().unwrap();
    assert_eq!(
        clefs::services::availability::available_count(db, key.id)
            .await
            .unwrap(),
        1
    );
}
