// Services module - clients for external collaborators

pub mod identity;

pub use identity::{
    IdentityError, IdentityProvider, ProfileChanges, ProviderUser, RestIdentityProvider,
};
