pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod sheet;
pub mod sync;
pub mod taxonomy;
pub mod wp;

pub mod util {
    pub mod env;
    #[cfg(test)]
    pub(crate) mod test_server;
}

pub use config::Config;
pub use error::{Result, SyncError};
