pub mod chat;
pub mod extractor;
pub mod messages;
pub mod namer;
pub mod uploads;
