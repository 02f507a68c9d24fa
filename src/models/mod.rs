pub mod connection;
pub mod history;
pub mod settings;

pub use connection::*;
pub use history::*;
pub use settings::*;
