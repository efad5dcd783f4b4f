//! # Zero Point - governed shared memory for agent teams
//!
//! Zero Point is the memory substrate agents write claims into and read
//! claims out of. Nothing lands without provenance: every write passes a
//! fixed sequence of governance gates, every access is recorded in a ledger,
//! and claims that go unconfirmed for too long are flagged stale when read.
//!
//! Next to it sits the **Digital Twin**, an advisory simulator that runs a
//! proposed action through outcome prediction, side-effect and reversibility
//! analysis, and a stress battery, then recommends whether to proceed.
//!
//! ## Core Concepts
//!
//! - **Entry**: an append-only claim with provenance, confidence, and review state
//! - **Governance gate**: a pass/fail precondition checked in fixed order before a write
//! - **Staleness**: an entry not re-affirmed within the window, discovered on read
//! - **Stress scenario**: a named probability shift applied to predicted outcomes
//!
//! ## Usage
//!
//! ```rust
//! use zeropoint::{ConfidenceLevel, MemoryKind, SearchQuery, WriteRequest, ZeroPoint};
//!
//! let store = ZeroPoint::in_memory();
//! let outcome = store
//!     .write(
//!         WriteRequest::new("Governance before intelligence", MemoryKind::Pattern)
//!             .tags(["governance"])
//!             .source("Canon v0.3")
//!             .author("RESEARCHER")
//!             .confidence(ConfidenceLevel::High)
//!             .evidence(3),
//!     )
//!     .unwrap();
//! assert!(outcome.is_accepted());
//!
//! let hits = store
//!     .search(&SearchQuery::new().tags(["governance"]), "PLANNER")
//!     .unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Shared types
pub mod confidence;
pub mod config;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod time;

// Store, simulator, and their plumbing
pub mod runtime;
pub mod simulation;
pub mod storage;
pub mod store;

pub use confidence::ConfidenceLevel;
pub use config::{default_store_path, RuntimeConfig, StoreConfig, TwinConfig};
pub use entry::{Entry, EntryId, GovernanceFlags, MemoryKind, Provenance, ReadStats};
pub use error::{RuntimeError, ValidationError, ZeroPointError, ZeroPointResult};
pub use ledger::{AccessLedger, LedgerAction, LedgerEntry};
pub use time::{Clock, ManualClock, SharedClock, SystemClock};

pub use runtime::{GovernanceRequest, GovernanceResponse, GovernanceRuntime, Ticket};
pub use simulation::{
    ActionContext, DigitalTwin, EpisodeRecord, Recommendation, Reversibility, RiskTier, SimulationReport,
    SimulationRequest, SimulationResult, SimulationSummary, StressResult,
};
pub use storage::{EntryBackend, InMemoryBackend, StorageError, StoreDocument};
pub use store::{
    PromotionOutcome, Reaffirmation, ReaffirmOutcome, Rejection, RejectionRule, SearchQuery, StoreStats, WriteOutcome,
    WriteRequest, ZeroPoint,
};

#[cfg(feature = "persistent")]
pub use storage::JsonFileBackend;
