pub mod email;
pub mod teams;
