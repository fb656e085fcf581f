//! Caller simulator: the automated receptionist side of a call

pub mod knowledge;
pub mod simulator;

pub use knowledge::{find_known_answer, SALON_KNOWLEDGE};
pub use simulator::{AskOutcome, CallSession, ChatMessage, Speaker, DEFERRAL_MESSAGE};
