//! RecordPaymentProofHandler - Takes in a transfer receipt for later review.

use crate::domain::foundation::{EventId, TandaId, UserId};
use crate::domain::ledger::events::ProofReceived;
use crate::domain::ledger::{LedgerEvent, TandaEvent};
use crate::domain::tanda::{ParticipantRole, TandaError, TandaHistory, TandaStatus};

use crate::application::context::LedgerContext;

#[derive(Debug, Clone)]
pub struct RecordPaymentProofCommand {
    pub tanda_id: TandaId,
    pub user_id: UserId,
    pub amount: i64,
    /// Bank reference or receipt id supplied by the payer.
    pub reference: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct RecordPaymentProofResult {
    pub proof_id: EventId,
    pub amount: i64,
}

impl RecordPaymentProofResult {
    pub fn reply(&self) -> String {
        format!(
            "Proof of ${} received. The organizer will review it shortly.",
            self.amount
        )
    }
}

pub struct RecordPaymentProofHandler {
    ctx: LedgerContext,
}

impl RecordPaymentProofHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: RecordPaymentProofCommand,
    ) -> Result<RecordPaymentProofResult, TandaError> {
        let _guard = self.ctx.lock(cmd.tanda_id).await?;
        let events = self.ctx.load_existing(&cmd.tanda_id).await?;
        let history = TandaHistory::new(&events);

        if history.status() == Some(TandaStatus::Closed) {
            return Err(TandaError::AlreadyClosed);
        }
        if history.is_removed(&cmd.user_id) {
            return Err(TandaError::ParticipantReplaced(cmd.user_id));
        }
        let may_pay = history.is_participant(&cmd.user_id)
            || history.role(&cmd.user_id) == Some(ParticipantRole::ReplacementPending);
        if !may_pay {
            return Err(TandaError::NotParticipant(cmd.user_id));
        }

        let expected = history.contribution_amount();
        if cmd.amount != expected {
            return Err(TandaError::WrongAmount {
                expected,
                actual: cmd.amount,
            });
        }

        let mut event = LedgerEvent::new(
            TandaEvent::ProofReceived(ProofReceived {
                method: cmd.method.clone(),
            }),
            self.ctx.now(),
        )
        .for_tanda(cmd.tanda_id)
        .by_user(cmd.user_id.clone())
        .with_amount(cmd.amount);
        if !cmd.reference.trim().is_empty() {
            event = event.with_external_ref(cmd.reference.trim());
        }
        let proof_id = self.ctx.append(event).await?;

        tracing::info!(
            tanda_id = %cmd.tanda_id,
            user_id = %cmd.user_id,
            proof_id = %proof_id,
            amount = cmd.amount,
            "Payment proof received"
        );

        if let Some(organizer) = history.organizer() {
            self.ctx
                .notify(
                    organizer,
                    &format!(
                        "Payment proof from {}...: ${} via {}.\nProof id: {}\n\nReply VALIDATE or REJECT with the proof id.",
                        cmd.user_id.short(10),
                        cmd.amount,
                        cmd.method,
                        proof_id
                    ),
                )
                .await;
        }

        Ok(RecordPaymentProofResult {
            proof_id,
            amount: cmd.amount,
        })
    }
}
