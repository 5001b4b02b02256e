//! Pure role-hierarchy authorization check.

use crate::auth::models::{Credential, Role};

/// Whether `credential` may perform an action requiring `required`.
///
/// True iff the credential's role ranks at least as high as the required
/// role, or the credential carries the unconditional superuser override.
/// Synchronous and side-effect free; no I/O.
#[must_use]
pub fn authorize(credential: &Credential, required: Role) -> bool {
    credential.superuser || credential.role.rank() >= required.rank()
}
