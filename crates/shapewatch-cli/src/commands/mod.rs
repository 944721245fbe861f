pub mod constraint;
pub mod filter;
pub mod subscriber;
pub mod vocab;
