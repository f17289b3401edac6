// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const REGISTER: &str = "auth.register";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_DESTROYED: &str = "session.destroyed";
pub const FORCED_LOGOUT: &str = "session.forced_logout";
