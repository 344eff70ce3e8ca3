use thiserror::Error;

use crate::audit::{AuditEvent, AuditKind, AuditSink};
use crate::domain::order::OrderId;
use crate::flows::states::{ConversationEvent, ConversationState, FlowAction, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ConversationState, event: ConversationEvent },
}

/// The conversation transition table. Pure: the caller owns the session and applies
/// `outcome.to` itself.
pub fn transition(
    current: ConversationState,
    event: ConversationEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationEvent::{
        AddMoreRequested, CancelRequested, CheckoutRequested, ConfirmRequested, DeliveryCaptured,
        DraftMissing, InquiryAssembled, InquiryUnclear, ModifyRequested, OrderFulfilled,
        ProductSelected, QuantityAccepted, QuantityRejected, SearchRequested, StatusRequested,
        Unrecognized,
    };
    use ConversationState::{
        AwaitingConfirmation, AwaitingDeliveryInfo, AwaitingInquiry, AwaitingProductSelection,
        AwaitingQuantity, Completed, Idle, OrderConfirmed,
    };
    use FlowAction::{
        ClearDraft, CloseConversation, FinalizeOrder, PresentFinalSummary, PresentOrderSummary,
        PresentSearchResults, PromptAddMore, PromptAddMoreOrCheckout, PromptModify,
        PromptOnboarding, PromptOrderNumber, PromptQuantity, RepromptChoice, RepromptQuantity,
        RequestDeliveryInfo,
    };

    let (to, actions) = match (current, event) {
        (OrderConfirmed, OrderFulfilled) => (Completed, vec![CloseConversation]),
        (state, InquiryUnclear) if state.accepts_inquiry() => (AwaitingInquiry, vec![PromptOnboarding]),
        (state, StatusRequested) if state.accepts_inquiry() => (state, vec![PromptOrderNumber]),
        (state, InquiryAssembled) if state.accepts_inquiry() => {
            (AwaitingConfirmation, vec![PresentOrderSummary])
        }

        (AwaitingProductSelection, ProductSelected) => (AwaitingQuantity, vec![PromptQuantity]),
        (AwaitingProductSelection, SearchRequested) => {
            (AwaitingProductSelection, vec![PresentSearchResults])
        }

        (AwaitingQuantity, QuantityAccepted) => (AwaitingConfirmation, vec![PromptAddMoreOrCheckout]),
        (AwaitingQuantity, QuantityRejected) => (AwaitingQuantity, vec![RepromptQuantity]),

        (AwaitingConfirmation, ConfirmRequested { has_delivery: false }) => {
            (AwaitingDeliveryInfo, vec![RequestDeliveryInfo])
        }
        (AwaitingConfirmation, ConfirmRequested { has_delivery: true }) => {
            (OrderConfirmed, vec![FinalizeOrder])
        }
        (AwaitingConfirmation, ModifyRequested) => (AwaitingProductSelection, vec![PromptModify]),
        (AwaitingConfirmation, CancelRequested) => (Idle, vec![ClearDraft]),
        (AwaitingConfirmation, AddMoreRequested) => (AwaitingProductSelection, vec![PromptAddMore]),
        (AwaitingConfirmation, CheckoutRequested) => (AwaitingDeliveryInfo, vec![RequestDeliveryInfo]),
        (AwaitingConfirmation, Unrecognized) => (AwaitingConfirmation, vec![RepromptChoice]),
        (AwaitingConfirmation, DraftMissing) => (AwaitingInquiry, vec![PromptOnboarding]),

        (AwaitingDeliveryInfo, DeliveryCaptured) => (AwaitingConfirmation, vec![PresentFinalSummary]),

        _ => return Err(FlowTransitionError::InvalidTransition { state: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

/// [`transition`] plus one audit event describing the result.
pub fn transition_with_audit<S>(
    current: ConversationState,
    event: ConversationEvent,
    sink: &S,
    session_key: &str,
    order_id: Option<&OrderId>,
) -> Result<TransitionOutcome, FlowTransitionError>
where
    S: AuditSink + ?Sized,
{
    let result = transition(current, event);
    let kind = match &result {
        Ok(outcome) => AuditKind::TransitionApplied { from: outcome.from, to: outcome.to, event },
        Err(_) => AuditKind::TransitionRejected { state: current, event },
    };
    sink.emit(AuditEvent::new(session_key, order_id.cloned(), kind));
    result
}
