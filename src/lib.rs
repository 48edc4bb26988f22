pub mod configure;
pub mod console;
pub mod logger;
pub mod transfer;
