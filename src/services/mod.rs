pub mod advisory;
pub mod broadcast;
pub mod overlay_server;
pub mod session_log;
pub mod speech;
