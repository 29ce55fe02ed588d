use crate::routes::{health, queue, room};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "roomforge-server",
    description = "Escape-room asset bundle orchestration API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(room::RoomApi::openapi());
    root.merge(queue::QueueApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
