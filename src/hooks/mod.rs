//! Resource hooks: one named binding per backend resource.
//!
//! Reads return a [`QueryObserver`](crate::QueryObserver) keyed by a
//! [`Resource`](crate::Resource) descriptor; writes return a
//! [`Mutation`](crate::Mutation) that declares its invalidations.
//!
//! Invalidation follows two tiers: a write that changes anything the
//! collection view shows invalidates `["collection"]`, and a write scoped to
//! one entity also invalidates that entity's own detail keys.

pub mod collection;
pub mod community;
pub mod frag;
pub mod user;
