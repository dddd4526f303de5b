pub mod ai;
pub mod conversation;
pub mod emergency;
pub mod extract;
pub mod locks;
pub mod replies;
pub mod session_store;
pub mod stage_machine;
