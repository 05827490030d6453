pub mod clock;
pub mod normalize;
pub mod phone;
pub mod resolve;
pub mod scheduler;
pub mod signature;
