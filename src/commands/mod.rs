pub mod reconcile;
pub mod remote_url;
pub mod required_apps;
pub mod status;
pub mod switch;
pub mod validate;
pub mod version;

pub use reconcile::*;
pub use remote_url::*;
pub use required_apps::*;
pub use status::*;
pub use switch::*;
pub use validate::*;
pub use version::*;
