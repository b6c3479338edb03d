pub mod deploy;
pub mod logs;
