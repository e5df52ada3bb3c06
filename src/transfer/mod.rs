pub mod machine;
pub mod types;

pub use machine::TransferFlow;
pub use types::{Recipient, RecipientMatch, TransferAttempt, TransferReceipt, TransferStatus};
