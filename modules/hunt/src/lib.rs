//! Recursive discovery: a hunt seeds targets, targets spawn port probes,
//! HTTP ports spawn path probes, and every task runs on one admission gate.

mod config;
mod context;
mod hunt;
mod path;
mod port;
mod subdomains;
mod target;

pub use config::{load_wordlist, HuntConfig, DEFAULT_WORDLIST};
pub use context::Context;
pub use hunt::Hunt;
pub use port::Port;
pub use subdomains::{SubdomainSource, Subfinder};
pub use target::Target;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering the data if a probe panicked while holding it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
