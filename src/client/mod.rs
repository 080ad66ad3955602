pub mod api_client;
pub mod attendance_store;
pub mod mapping;
