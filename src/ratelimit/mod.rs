//! Rate limit rules, window parsing and the query interface.

mod policy;
mod rules;
mod window;

pub use policy::PathLimit;
pub use rules::{RateLimitRule, RuleSet};
pub use window::{parse_window_seconds, WindowUnit};
