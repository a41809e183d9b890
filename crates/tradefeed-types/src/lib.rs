//! Tradefeed Types - Canonical domain types for the synthetic activity engine
//!
//! This crate contains the foundational types shared by every other tradefeed
//! crate:
//!
//! - Identity types (`TraderId`)
//! - Trade events and asset categories
//! - Trader snapshots and level tiers
//! - An injectable `Clock` so time-dependent components can be driven
//!   deterministically in tests
//! - Currency display helpers

pub mod identity;
pub mod trade;
pub mod trader;
pub mod clock;
pub mod money;

pub use identity::*;
pub use trade::*;
pub use trader::*;
pub use clock::*;
pub use money::*;
