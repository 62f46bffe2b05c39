pub mod enchant;
pub mod executor;
pub mod links;
pub mod matcher;
pub mod story;
pub mod style;
pub mod transcript;
