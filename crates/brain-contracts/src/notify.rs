// notify.rs — The outbound approval notification boundary.
//
// Delivery mechanics (retries, outbound dedupe, channel formatting) belong
// to the collaborator. The engine makes one synchronous call per created
// proposal and records a failure as a reason code — it never retries and
// never lets the failure propagate.

use crate::proposal::ApprovalProposal;

/// Collaborator that tells a human a proposal is waiting for them.
pub trait ApprovalNotifier: Send + Sync {
    /// Deliver an approval notification for the proposal. Returns whether
    /// delivery succeeded.
    fn notify_approval(&self, proposal: &ApprovalProposal) -> bool;
}
