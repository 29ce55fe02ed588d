//! Request/response DTOs exposed through the HTTP surface and documented
//! via `utoipa`.

pub mod queue;
pub mod room;
