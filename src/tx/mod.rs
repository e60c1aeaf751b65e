//! Transaction assembly with fee selection, signing and broadcast

mod assembler;
mod draft;
mod gas;
mod sender;

pub use assembler::TransactionAssembler;
pub use draft::TransactionDraft;
pub use sender::TransactionSender;
