//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{BorrowerRepository, BuildingRepository, KeyRepository, RoomRepository};
use crate::infrastructure::{
    SeaOrmBorrowerRepository, SeaOrmBuildingRepository, SeaOrmKeyRepository,
    SeaOrmRoomRepository,
};

/// Repositories bound to one open connection.
///
/// Rebuild it after the store is reopened (restore, reset): the old
/// connection is gone.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub building_repo: Arc<dyn BuildingRepository>,
    pub room_repo: Arc<dyn RoomRepository>,
    pub key_repo: Arc<dyn KeyRepository>,
    pub borrower_repo: Arc<dyn BorrowerRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection) -> Self {
        let building_repo = Arc::new(SeaOrmBuildingRepository::new(db.clone()));
        let room_repo = Arc::new(SeaOrmRoomRepository::new(db.clone()));
        let key_repo = Arc::new(SeaOrmKeyRepository::new(db.clone()));
        let borrower_repo = Arc::new(SeaOrmBorrowerRepository::new(db.clone()));

        Self {
            db,
            building_repo,
            room_repo,
            key_repo,
            borrower_repo,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}
