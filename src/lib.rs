//! # socks-hunter
//!
//! Find public SOCKS5 proxies and check which of them actually work.
//!
//! Candidates come from the FOFA search API (or a plain list). The validator
//! probes all of them concurrently with a real HTTP request routed through
//! each one. A local v2ray instance can then be pointed at the validated
//! proxies one at a time.

pub mod config;
pub mod emitter;
pub mod error;
pub mod process;
pub mod proxy;
pub mod report;
pub mod session;
pub mod source;
pub mod validator;
mod utils;

pub use config::{AppConfig, ValidatedOrder, ValidatorConfig, ValidatorConfigBuilder};
pub use emitter::{ConfigEmitter, InboundConfig, V2rayConfig};
pub use error::{Error, Result};
pub use process::{ProxyProcess, V2rayProcess};
pub use proxy::{Candidate, ValidatedProxy};
pub use report::save_available;
pub use session::{Session, SessionOutcome};
pub use source::{CandidateSource, FofaSource, StaticSource};
pub use utils::parse_candidate_list;
pub use validator::Validator;
