pub mod context;
pub mod export_key;
pub mod filters;
pub mod generate_key;
pub mod headers;
pub mod keep_secret;
pub mod lock;
pub mod schemes;
pub mod unlock;

pub use context::Context;
pub use export_key::export_key;
pub use filters::{clean, smudge, textconv};
pub use generate_key::{generate_key, GenerateKeyOptions};
pub use headers::headers;
pub use keep_secret::keep_secret;
pub use lock::lock;
pub use schemes::schemes;
pub use unlock::unlock;
