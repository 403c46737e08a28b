//! Conversational glue around the pricing engine.
//!
//! - `quantity` reads an order quantity out of free text with a fixed rule order
//!   (explicit total, colour split, direct unit, keyword, standalone number).
//! - `turn` merges a sparse delta onto the caller's prior specification and prices it.
//!
//! Intent classification itself happens upstream; this crate only consumes its deltas and
//! never decides prices.

pub mod quantity;
pub mod turn;

pub use quantity::{QuantityExtractor, QuantityReading, QuantityRule};
pub use turn::{ConversationTurnHandler, TurnRequest, TurnResponse};
