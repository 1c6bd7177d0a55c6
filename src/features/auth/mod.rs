pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod password;
pub mod routes;
pub mod services;
pub mod token;

pub use services::AuthService;
pub use token::JwtTokenManager;
