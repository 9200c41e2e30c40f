// Credential persistence and OAuth grant handling
pub mod credentials;
pub mod token;

// Spotify Web API access and response shaping
pub mod normalize;
pub mod proxy;
pub mod upstream;

// HTTP API
pub mod api;

pub mod config;
pub mod error;
