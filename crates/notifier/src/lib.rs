pub mod dispatch;
pub mod gateway;
pub mod records;
pub mod templates;
