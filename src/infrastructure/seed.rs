use std::collections::HashMap;

use chrono::{Duration, Local};
use rand::Rng;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::{borrower, building, key, key_room, loan, room};
use crate::services::loan_service::DATE_FORMAT;

const BUILDINGS: [&str; 5] = [
    "Bâtiment Principal",
    "Annexe A",
    "Annexe B",
    "Laboratoire",
    "Bibliothèque",
];

// (name, type, building)
const ROOMS: [(&str, &str, &str); 12] = [
    ("Salle 101", "Bureau", "Bâtiment Principal"),
    ("Salle 102", "Bureau", "Bâtiment Principal"),
    ("Salle 201", "Salle de réunion", "Bâtiment Principal"),
    ("Amphithéâtre A", "Amphithéâtre", "Bâtiment Principal"),
    ("Laboratoire 1", "Laboratoire", "Laboratoire"),
    ("Laboratoire 2", "Laboratoire", "Laboratoire"),
    ("Salle de lecture", "Bibliothèque", "Bibliothèque"),
    ("Archives", "Stockage", "Bibliothèque"),
    ("Bureau A1", "Bureau", "Annexe A"),
    ("Bureau A2", "Bureau", "Annexe A"),
    ("Salle B1", "Salle de cours", "Annexe B"),
    ("Cafétéria", "Restauration", "Annexe B"),
];

struct DemoKey {
    number: &'static str,
    description: &'static str,
    total: i32,
    reserve: i32,
    storage: &'static str,
    rooms: &'static [&'static str],
}

const KEYS: [DemoKey; 10] = [
    DemoKey {
        number: "K001",
        description: "Clé principale du bâtiment",
        total: 3,
        reserve: 1,
        storage: "Bureau d'accueil",
        rooms: &["Salle 101", "Salle 102", "Salle 201"],
    },
    DemoKey {
        number: "K002",
        description: "Clé de l'amphithéâtre",
        total: 2,
        reserve: 0,
        storage: "Bureau d'accueil",
        rooms: &["Amphithéâtre A"],
    },
    DemoKey {
        number: "K003",
        description: "Clé des laboratoires",
        total: 5,
        reserve: 2,
        storage: "Laboratoire 1",
        rooms: &["Laboratoire 1", "Laboratoire 2"],
    },
    DemoKey {
        number: "K004",
        description: "Clé de la bibliothèque",
        total: 4,
        reserve: 1,
        storage: "Bureau d'accueil",
        rooms: &["Salle de lecture", "Archives"],
    },
    DemoKey {
        number: "K005",
        description: "Clé Annexe A",
        total: 2,
        reserve: 0,
        storage: "Bureau A1",
        rooms: &["Bureau A1", "Bureau A2"],
    },
    DemoKey {
        number: "K006",
        description: "Clé Annexe B",
        total: 3,
        reserve: 1,
        storage: "Salle B1",
        rooms: &["Salle B1", "Cafétéria"],
    },
    DemoKey {
        number: "K007",
        description: "Passe-partout",
        total: 1,
        reserve: 0,
        storage: "Direction",
        rooms: &["Salle 101", "Salle 102", "Salle 201", "Bureau A1", "Bureau A2"],
    },
    DemoKey {
        number: "K008",
        description: "Clé salle de réunion",
        total: 2,
        reserve: 0,
        storage: "Bureau d'accueil",
        rooms: &["Salle 201"],
    },
    DemoKey {
        number: "K009",
        description: "Clé cafétéria",
        total: 3,
        reserve: 0,
        storage: "Cafétéria",
        rooms: &["Cafétéria"],
    },
    DemoKey {
        number: "K010",
        description: "Clé archives",
        total: 1,
        reserve: 0,
        storage: "Archives",
        rooms: &["Archives"],
    },
];

const BORROWERS: [(&str, &str); 8] = [
    ("Jean Dupont", "jean.dupont@example.com"),
    ("Marie Martin", "marie.martin@example.com"),
    ("Pierre Durand", "pierre.durand@example.com"),
    ("Sophie Bernard", "sophie.bernard@example.com"),
    ("Luc Petit", "luc.petit@example.com"),
    ("Emma Roux", "emma.roux@example.com"),
    ("Thomas Moreau", "thomas.moreau@example.com"),
    ("Julie Simon", "julie.simon@example.com"),
];

// (key number, borrower index)
const LOANS: [(&str, usize); 6] = [
    ("K001", 0),
    ("K003", 1),
    ("K003", 2),
    ("K004", 3),
    ("K006", 4),
    ("K009", 5),
];

fn lookup(ids: &HashMap<&str, i32>, name: &str) -> Result<i32, DomainError> {
    ids.get(name)
        .copied()
        .ok_or_else(|| DomainError::NotFound(name.to_string()))
}

/// Fill the database with a small demo inventory.
///
/// Runs in one transaction. Fails (and leaves the database untouched) if
/// any demo building or key number already exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    let mut building_ids = HashMap::new();
    for name in BUILDINGS {
        let saved = building::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        building_ids.insert(name, saved.id);
    }

    let mut room_ids = HashMap::new();
    for (name, room_type, building) in ROOMS {
        let saved = room::ActiveModel {
            name: Set(name.to_string()),
            r#type: Set(Some(room_type.to_string())),
            building_id: Set(lookup(&building_ids, building)?),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        room_ids.insert(name, saved.id);
    }

    let mut key_ids = HashMap::new();
    for demo in &KEYS {
        let saved = key::ActiveModel {
            number: Set(demo.number.to_string()),
            description: Set(Some(demo.description.to_string())),
            quantity_total: Set(demo.total),
            quantity_reserve: Set(demo.reserve),
            storage_location: Set(Some(demo.storage.to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for room_name in demo.rooms {
            key_room::ActiveModel {
                key_id: Set(saved.id),
                room_id: Set(lookup(&room_ids, room_name)?),
            }
            .insert(&txn)
            .await?;
        }
        key_ids.insert(demo.number, saved.id);
    }

    let mut borrower_ids = Vec::with_capacity(BORROWERS.len());
    for (name, email) in BORROWERS {
        let saved = borrower::ActiveModel {
            name: Set(name.to_string()),
            email: Set(Some(email.to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        borrower_ids.push(saved.id);
    }

    let now = Local::now();
    let mut rng = rand::thread_rng();
    for (number, borrower) in LOANS {
        let days_ago = rng.gen_range(0..10);
        let loan_date = (now - Duration::days(days_ago)).format(DATE_FORMAT).to_string();

        loan::ActiveModel {
            key_id: Set(lookup(&key_ids, number)?),
            borrower_id: Set(borrower_ids[borrower]),
            loan_date: Set(loan_date),
            return_date: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::info!(
        "Données de démonstration créées: {} bâtiments, {} salles, {} clés, {} emprunteurs, {} emprunts",
        BUILDINGS.len(),
        ROOMS.len(),
        KEYS.len(),
        BORROWERS.len(),
        LOANS.len()
    );
    Ok(())
}
