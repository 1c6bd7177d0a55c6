pub mod auth;
pub mod categories;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod web;
