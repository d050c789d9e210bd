//! Repository implementations using SeaORM

pub mod borrower_repository;
pub mod building_repository;
pub mod key_repository;
pub mod room_repository;

pub use borrower_repository::SeaOrmBorrowerRepository;
pub use building_repository::SeaOrmBuildingRepository;
pub use key_repository::SeaOrmKeyRepository;
pub use room_repository::SeaOrmRoomRepository;
