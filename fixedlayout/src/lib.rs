pub mod data;
pub mod error;
pub mod layout;
pub mod options;
pub mod provider;
pub mod view;

pub use error::{ConfigError, ProviderError};
pub use options::ViewOptions;
pub use view::FixedView;
