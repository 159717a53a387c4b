pub mod connect;
pub mod info;
