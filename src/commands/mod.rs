mod config_cmd;
mod keygen;
mod serve;

pub use config_cmd::ConfigCommand;
pub use keygen::KeygenCommand;
pub use serve::ServeCommand;
