use clefs::db;
use clefs::domain::{BuildingInput, KeyInput, RoomInput};
use clefs::reports::{self, documents, html};
use clefs::seed;
use clefs::services::{availability, loan_service};
use clefs::AppState;
use sea_orm::DatabaseConnection;

async fn seeded_db() -> DatabaseConnection {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    seed::seed_demo_data(&db).await.expect("Failed to seed");
    db
}

#[tokio::test]
async fn demo_data_has_expected_shape() {
    let db = seeded_db().await;
    let state = AppState::new(db.clone());

    assert_eq!(state.building_repo.find_all().await.unwrap().len(), 5);
    assert_eq!(state.room_repo.find_all().await.unwrap().len(), 12);
    assert_eq!(state.borrower_repo.find_all().await.unwrap().len(), 8);

    let keys = availability::keys_with_availability(&db).await.unwrap();
    assert_eq!(keys.len(), 10);
    assert_eq!(keys[0].key.number, "K001");
    assert_eq!(keys[9].key.number, "K010");

    // K001: 3 total, 1 reserve, lent once
    assert_eq!(keys[0].loaned_count, 1);
    assert_eq!(keys[0].available_count, 1);
    // K003: 5 total, 2 reserve, lent twice
    assert_eq!(keys[2].loaned_count, 2);
    assert_eq!(keys[2].available_count, 1);

    assert_eq!(loan_service::count_active_loans(&db).await.unwrap(), 6);

    let passe = keys.iter().find(|k| k.key.number == "K007").unwrap();
    let rooms = state.key_repo.rooms_for_key(passe.key.id).await.unwrap();
    assert_eq!(rooms.len(), 5);
}

#[tokio::test]
async fn seeding_twice_fails_without_partial_rows() {
    let db = seeded_db().await;
    assert!(seed::seed_demo_data(&db).await.is_err());

    let state = AppState::new(db);
    assert_eq!(state.building_repo.find_all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn key_plan_is_sorted_at_every_level() {
    let db = seeded_db().await;
    let plan = reports::key_plan(&db).await.unwrap();

    let buildings: Vec<_> = plan.iter().map(|b| b.building.name.as_str()).collect();
    assert_eq!(
        buildings,
        vec![
            "Annexe A",
            "Annexe B",
            "Bibliothèque",
            "Bâtiment Principal",
            "Laboratoire"
        ]
    );

    let principal = plan
        .iter()
        .find(|b| b.building.name == "Bâtiment Principal")
        .unwrap();
    let rooms: Vec<_> = principal.rooms.iter().map(|r| r.room.name.as_str()).collect();
    assert_eq!(
        rooms,
        vec!["Amphithéâtre A", "Salle 101", "Salle 102", "Salle 201"]
    );

    let salle_201 = &principal.rooms[3];
    let keys: Vec<_> = salle_201.keys.iter().map(|k| k.number.as_str()).collect();
    assert_eq!(keys, vec!["K001", "K007", "K008"]);
}

#[tokio::test]
async fn key_plan_keeps_empty_buildings_and_rooms() {
    let db = db::init_db("sqlite::memory:").await.unwrap();
    let state = AppState::new(db.clone());
    let empty = state
        .building_repo
        .create(BuildingInput {
            name: "Vide".to_string(),
        })
        .await
        .unwrap();
    let other = state
        .building_repo
        .create(BuildingInput {
            name: "Atelier".to_string(),
        })
        .await
        .unwrap();
    state
        .room_repo
        .create(RoomInput {
            name: "Réserve".to_string(),
            room_type: None,
            building_id: other.id,
        })
        .await
        .unwrap();
    state
        .key_repo
        .create(
            KeyInput {
                number: "K900".to_string(),
                description: None,
                quantity_total: 1,
                quantity_reserve: 0,
                storage_location: None,
            },
            vec![],
        )
        .await
        .unwrap();

    let plan = reports::key_plan(&db).await.unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].building.id, other.id);
    assert_eq!(plan[0].rooms.len(), 1);
    assert!(plan[0].rooms[0].keys.is_empty());
    assert_eq!(plan[1].building.id, empty.id);
    assert!(plan[1].rooms.is_empty());

    let page = html::render_key_plan(&plan, "2024-03-01 12:00:00");
    assert!(page.contains("(Aucune salle)"));
    assert!(page.contains("Aucune clé"));
}

#[tokio::test]
async fn borrower_groups_follow_active_loans() {
    let db = seeded_db().await;
    let groups = reports::loans_by_borrower(&db).await.unwrap();

    let names: Vec<_> = groups.iter().map(|g| g.borrower_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Emma Roux",
            "Jean Dupont",
            "Luc Petit",
            "Marie Martin",
            "Pierre Durand",
            "Sophie Bernard"
        ]
    );
    assert!(groups.iter().all(|g| g.loans.len() == 1));

    let page = html::render_borrower_report(&groups, "2024-03-01 12:00:00");
    assert!(page.contains("Total : 6 emprunteurs, 6 clés sorties"));
}

#[tokio::test]
async fn documents_are_saved_under_the_documents_dir() {
    let db = seeded_db().await;
    let dir = tempfile::tempdir().unwrap();
    let documents_dir = dir.path().join("documents");

    let stock = reports::stock_report(&db).await.unwrap();
    let page = html::render_stock_report(&stock, "2024-03-01 12:00:00");
    assert!(page.contains("K010"));
    assert!(page.contains("Clé archives"));

    let name = documents::generate_filename("etat_stock", None, "html");
    let path = documents::save_document(&documents_dir, &name, &page).unwrap();
    assert!(path.starts_with(&documents_dir));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), page);

    let loan = loan_service::list_active_loans(&db).await.unwrap().remove(0);
    let receipt = html::render_loan_receipt(&loan);
    assert!(receipt.contains(&loan.key_number));
    assert!(receipt.contains("Signature de l'emprunteur"));
}
