pub mod replay;
pub mod sim;
