/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules, so
/// the access layers are applied explicitly per module rather than per route.
/// Both modules sit behind the authentication filter; only the authenticated
/// module additionally carries the access-decision layer.

/// Routes accessible without a token: login, join, email pre-check, health.
pub mod public;

/// Routes that require an established identity, guarded by the voter round.
pub mod authenticated;
