//! The access-approval transaction.
//!
//! To request decryption shares, a viewer shows the key servers a
//! transaction that invokes the on-chain access check with the policy id,
//! their subscription, the target profile, and the clock. By default the
//! transaction is only *built* — kind-only bytes, never executed — which
//! is sufficient for the servers' verification and costs no gas. Actually
//! executing the call is available as an explicit strategy for deployments
//! whose access-check contract demands it.

use std::sync::Arc;

use tracing::debug;

use tuber_core::{ClockId, PolicyId, ProfileId, SubscriptionId};

use crate::error::{ChainError, Result};
use crate::tx::{CallArg, CallTargets, TransactionKind};
use crate::wallet::Wallet;

/// How the approval transaction is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalStrategy {
    /// Build kind-only bytes locally; never submit. The default.
    #[default]
    BuildOnly,
    /// Sign and execute the access check on-chain, then hand the same
    /// kind bytes to the servers. Costs gas; only for deployments that
    /// require an executed check.
    SignAndExecute,
}

/// Builds approval transactions for the decryption flow.
pub struct ApprovalBuilder {
    targets: CallTargets,
    clock_id: ClockId,
    strategy: ApprovalStrategy,
}

impl ApprovalBuilder {
    /// Create a builder with the given strategy.
    pub fn new(targets: CallTargets, clock_id: ClockId, strategy: ApprovalStrategy) -> Self {
        Self {
            targets,
            clock_id,
            strategy,
        }
    }

    /// The configured strategy.
    pub fn strategy(&self) -> ApprovalStrategy {
        self.strategy
    }

    /// Build the approval transaction bytes for a decrypt attempt.
    ///
    /// The argument order here is load-bearing: the key servers re-derive
    /// the policy id from these exact positions.
    pub async fn build(
        &self,
        wallet: &Arc<dyn Wallet>,
        policy_id: PolicyId,
        subscription_id: SubscriptionId,
        profile_id: ProfileId,
    ) -> Result<Vec<u8>> {
        let kind = TransactionKind::new().move_call(
            &self.targets.seal_approve,
            vec![
                CallArg::pure_bytes(policy_id.to_bytes().to_vec()),
                CallArg::Object(subscription_id.object_id()),
                CallArg::Object(profile_id.object_id()),
                CallArg::Object(self.clock_id.object_id()),
            ],
        );
        let bytes = kind.to_bytes()?;

        if self.strategy == ApprovalStrategy::SignAndExecute {
            let digest = wallet.sign_and_execute(kind).await?;
            debug!(%digest, "approval executed on-chain");
        }

        Ok(bytes)
    }
}

/// The parsed argument set of an approval transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCall {
    pub policy_id: PolicyId,
    pub subscription_id: SubscriptionId,
    pub profile_id: ProfileId,
    pub clock_id: ClockId,
}

/// Parse and shape-check approval transaction bytes.
///
/// Key servers run this independently; any deviation from the expected
/// call target or argument layout fails fast here rather than producing
/// garbage downstream.
pub fn parse_approval(bytes: &[u8]) -> Result<ApprovalCall> {
    let kind = TransactionKind::from_bytes(bytes)?;

    let [call] = kind.calls.as_slice() else {
        return Err(ChainError::InvalidApproval(format!(
            "expected exactly one call, got {}",
            kind.calls.len()
        )));
    };
    if !call.target.ends_with("::seal_policy::seal_approve") {
        return Err(ChainError::InvalidApproval(format!(
            "unexpected call target: {}",
            call.target
        )));
    }
    let [policy, subscription, profile, clock] = call.args.as_slice() else {
        return Err(ChainError::InvalidApproval(format!(
            "expected 4 arguments, got {}",
            call.args.len()
        )));
    };

    let policy_id = PolicyId::from_bytes(policy.as_pure_bytes()?)
        .ok_or_else(|| ChainError::InvalidApproval("policy id has wrong length".into()))?;

    Ok(ApprovalCall {
        policy_id,
        subscription_id: SubscriptionId(subscription.as_object()?),
        profile_id: ProfileId(profile.as_object()?),
        clock_id: ClockId(clock.as_object()?),
    })
}
