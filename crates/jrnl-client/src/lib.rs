//! jrnl-client: the encrypted journal protocol over HTTP
//!
//! Objects ([`Journal`], [`Entry`], [`Member`], [`UserInfo`]) carry
//! ciphertext and know how to encrypt, decrypt and verify themselves with a
//! [`jrnl_crypto::CryptoManager`]. Managers move them to and from the server
//! through an [`ApiClient`], which maps every failure onto [`ApiError`].
//!
//! ```text
//! KeyRing ── CryptoManager (per journal uid / "userInfo")
//!                 │
//! Journal / Entry / Member / UserInfo ── to_wire / from_wire
//!                 │
//! *Manager ── ApiClient ── Transport (HttpTransport | test double)
//! ```

pub mod auth;
pub mod client;
pub mod entry;
pub mod error;
pub mod journal;
pub mod member;
pub mod session;
pub mod transport;
pub mod user_info;
pub mod wire;

pub use auth::Authenticator;
pub use client::ApiClient;
pub use entry::{verify_chain, Entry, EntryManager};
pub use error::ApiError;
pub use journal::{Journal, JournalManager};
pub use member::{Member, MemberManager};
pub use session::KeyRing;
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, StatusCode, Transport, TransportError,
};
pub use user_info::{UserInfo, UserInfoManager};
