pub mod system_routes;
pub mod tag_routes;
