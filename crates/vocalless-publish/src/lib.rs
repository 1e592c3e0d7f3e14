//! Publishing collaborator.
//!
//! [`Publisher`] is the set of remote operations the pipeline invokes:
//! listing and creating collections (playlists), uploading videos and
//! adding them to a collection. [`YouTubeClient`] implements it against
//! the YouTube Data API v3 using an OAuth2 refresh token.

pub mod config;
pub mod error;
pub mod token_cache;
pub mod traits;
pub mod types;
pub mod youtube;

pub use config::YouTubeConfig;
pub use error::{PublishError, PublishResult};
pub use token_cache::{AccessToken, OAuthRefreshSource, TokenCache, TokenSource};
pub use traits::{Publisher, PublisherFactory};
pub use youtube::{YouTubeClient, YouTubeConnector};
