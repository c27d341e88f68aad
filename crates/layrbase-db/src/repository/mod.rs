//! SurrealDB repository implementations.

mod invitation;
mod membership;
mod organization;
mod user;

pub use invitation::SurrealInvitationRepository;
pub use membership::SurrealMembershipRepository;
pub use organization::SurrealOrganizationRepository;
pub use user::SurrealUserRepository;
