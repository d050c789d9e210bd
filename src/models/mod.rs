pub mod borrower;
pub mod building;
pub mod key;
pub mod key_room;
pub mod loan;
pub mod room;

pub use borrower::Borrower;
pub use building::Building;
pub use key::Key;
pub use loan::LoanWithDetails;
pub use room::Room;
