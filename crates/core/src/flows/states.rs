use serde::{Deserialize, Serialize};

/// Where a buyer is in the order dialogue. A new session starts in `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingInquiry,
    Processing,
    AwaitingProductSelection,
    AwaitingQuantity,
    AwaitingConfirmation,
    AwaitingDeliveryInfo,
    OrderConfirmed,
    Completed,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingInquiry => "awaiting_inquiry",
            Self::Processing => "processing",
            Self::AwaitingProductSelection => "awaiting_product_selection",
            Self::AwaitingQuantity => "awaiting_quantity",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::AwaitingDeliveryInfo => "awaiting_delivery_info",
            Self::OrderConfirmed => "order_confirmed",
            Self::Completed => "completed",
        }
    }

    /// States whose next message is read as a fresh inquiry.
    pub fn accepts_inquiry(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::AwaitingInquiry | Self::Processing | Self::OrderConfirmed | Self::Completed
        )
    }
}

/// A resolved fact about the inbound message, produced after classification and any
/// pipeline work the state calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationEvent {
    InquiryUnclear,
    StatusRequested,
    InquiryAssembled,
    ProductSelected,
    SearchRequested,
    QuantityAccepted,
    QuantityRejected,
    ConfirmRequested { has_delivery: bool },
    ModifyRequested,
    CancelRequested,
    AddMoreRequested,
    CheckoutRequested,
    Unrecognized,
    DraftMissing,
    DeliveryCaptured,
    OrderFulfilled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    PromptOnboarding,
    PromptOrderNumber,
    PresentOrderSummary,
    PromptQuantity,
    PresentSearchResults,
    PromptAddMoreOrCheckout,
    RepromptQuantity,
    RequestDeliveryInfo,
    FinalizeOrder,
    PromptModify,
    ClearDraft,
    PromptAddMore,
    RepromptChoice,
    PresentFinalSummary,
    CloseConversation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationState,
    pub to: ConversationState,
    pub event: ConversationEvent,
    pub actions: Vec<FlowAction>,
}
