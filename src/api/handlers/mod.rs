pub mod activation;
pub mod admin;
pub mod epins;
pub mod franchise;
pub mod funds;
pub mod sessions;
pub mod users;
