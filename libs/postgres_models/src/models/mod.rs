pub mod account_alerts;
pub mod account_limits;
pub mod accounts;
pub mod transfers;
pub mod users;

pub use account_alerts::{AccountAlertRow, NewAccountAlertRow};
pub use account_limits::{AccountLimitRow, NewAccountLimitRow};
pub use accounts::AccountRow;
pub use transfers::{EntryRow, NewEntryRow, NewTransferRow, TransferRow};
pub use users::UserRow;
