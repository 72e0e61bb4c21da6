pub mod client;
pub mod parse;
pub mod price;
pub mod reply;
pub mod status;
