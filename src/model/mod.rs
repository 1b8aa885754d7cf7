pub mod role;
pub mod travel_request;
pub mod user;
