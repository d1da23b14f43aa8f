//! Configuration section definitions.
//!
//! Each module corresponds to a section in `h5p-relay.toml`:
//!
//! | Module    | TOML Section          | Purpose                             |
//! |-----------|-----------------------|-------------------------------------|
//! | `serve`   | `[serve]`             | HTTP server and static assets       |
//! | `storage` | `[storage]`           | Engine settings file and roots      |
//! | `upload`  | `[upload]`            | Body and upload limits, spooling    |
//! | `user`    | `[user]`, `[engine]`  | Request identity, engine defaults   |

mod serve;
mod storage;
mod upload;
mod user;

pub use serve::ServeConfig;
pub use storage::StorageConfig;
pub use upload::UploadConfig;
pub use user::{EngineConfig, UserConfig};
