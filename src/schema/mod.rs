pub mod enchantment;
pub mod hook;
pub mod output;
pub mod value;
