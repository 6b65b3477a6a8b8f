//! # CTF Coordinator
//!
//! Authoritative in-memory state for a capture-the-flag match: players, two teams,
//! flag possession, combat with fused kill/respawn, and a bounded event log,
//! served as a small polled JSON API.
//!
//! ## Entry point
//!
//! [`Match`] is the single aggregate: create with [`Match::new`], then call
//! [`Match::join`], [`Match::obtain_flag`], [`Match::capture_flag`],
//! [`Match::attack`], [`Match::heal`] and friends. [`api::create_router`] wraps one
//! match behind a mutex for HTTP.
//!
//! ## Example
//!
//! ```rust
//! use ctf_coordinator::{Match, MatchError, TeamKey};
//!
//! let mut game = Match::new();
//! let p1 = game.join(7, "10.0.0.1").unwrap().player_id;
//! let p2 = game.join(3, "10.0.0.2").unwrap().player_id;
//! assert_eq!(game.player(&p2).unwrap().team, TeamKey::Red);
//!
//! game.obtain_flag(&p1).unwrap();
//! let out = game.attack(&p2, &p1, Some(100)).unwrap();
//! assert!(out.killed);
//! assert_eq!(out.target.health, 100);
//! assert_eq!(game.flag_holder(), None);
//! assert!(matches!(game.capture_flag(&p1), Err(MatchError::InvalidTransition(_))));
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod requests;
pub mod scenario;
pub mod types;

pub use config::ServerConfig;
pub use engine::{AttackOutcome, CaptureOutcome, JoinOutcome, Match, ObtainOutcome, Roster};
pub use error::MatchError;
pub use events::{Event, EventLog};
pub use identity::{Caller, IdentityConfig};
pub use scenario::{Action, Generator, GeneratorConfig};
pub use types::{Player, PlayerId, Team, TeamKey};
