pub mod constants;
pub mod deletion;
pub mod query;
pub mod slug;
#[cfg(test)]
pub mod test_helpers;
pub mod types;
pub mod validation;
