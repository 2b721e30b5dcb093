pub mod core {
    pub mod app;
    pub mod bitmap;
    pub mod cache;
    pub mod config;
    pub mod context;
    pub mod flight;
    pub mod pool;
    pub mod refbitmap;
}

pub mod utils {
    pub mod cli;
    pub mod error;
}

pub mod uri {
    pub mod model;
    pub mod schemes;
    pub mod source;
}

pub mod image {
    pub mod loader;
    pub mod shaper;
    pub mod transform;
}

pub mod state {
    pub mod drawable;
    pub mod options;
    pub mod resolver;
}

pub use core::{
    app::Pixcache,
    config::{Configuration, ConfigurationBuilder, ErrorCallback},
    context::{Context, ResId},
};
pub use utils::error::{PixError, PixResult};
