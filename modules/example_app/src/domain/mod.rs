pub mod breadcrumbs;
pub mod deeplink;
pub mod entry_state;
pub mod error;
pub mod locale;
pub mod localizer;
pub mod options;
pub mod service;
pub mod session;
pub mod validation;
pub mod visited;

pub use breadcrumbs::*;
pub use deeplink::*;
pub use entry_state::*;
pub use error::*;
pub use locale::*;
pub use localizer::*;
pub use options::*;
pub use service::*;
pub use session::*;
pub use validation::*;
pub use visited::*;
