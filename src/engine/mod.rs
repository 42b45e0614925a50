//! Pure computation engines for admission arithmetic and payment
//! verification. Nothing in here touches storage.

pub mod admission;
pub mod signature;

pub use admission::{decide, Decision, ReserveIntent};
pub use signature::{sign, PaymentVerifier, SignatureError, VerifiedPayment};
