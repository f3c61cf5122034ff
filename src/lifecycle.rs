use crate::error::RegistryError;
use crate::models::ComplaintStatus;

/// How strictly admin status updates are checked.
///
/// `Permissive` lets any status follow any other, which is how the desk has
/// always behaved. `Strict` only allows forward moves plus reopening a
/// resolved complaint for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

pub fn validate_transition(
    from: ComplaintStatus,
    to: ComplaintStatus,
    policy: TransitionPolicy,
) -> Result<(), RegistryError> {
    if policy == TransitionPolicy::Permissive || from == to || strict_allows(from, to) {
        Ok(())
    } else {
        Err(RegistryError::InvalidTransition { from, to })
    }
}

fn strict_allows(from: ComplaintStatus, to: ComplaintStatus) -> bool {
    use ComplaintStatus::*;

    matches!(
        (from, to),
        (Pending, InReview | Resolved | Escalated)
            | (InReview, Resolved | Escalated)
            | (Escalated, InReview | Resolved)
            | (Resolved, InReview)
    )
}
