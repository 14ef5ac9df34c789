//! Dialogue states and the transition table between them.

use std::fmt;

/// The state a conversation session is in.
///
/// Every state accepts exactly one kind of input. Invalid input keeps the
/// session where it is; the only branch points are [`DialogueState::GetQuantity`]
/// (add another item or continue) and the two order-lookup branches reachable
/// from [`DialogueState::Greeting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogueState {
    /// Menu shown; waiting for a menu choice or a product link.
    Greeting,
    /// Link stored; waiting for a quantity.
    GetLink,
    /// Item stored; waiting for "add another item?" answer.
    GetQuantity,
    /// Waiting for the contact email.
    GetEmail,
    /// Waiting for the delivery address.
    GetAddress,
    /// Waiting for a free-text note.
    GetNote,
    /// Waiting for the phone number, then submitting.
    GetPhone,
    /// Conversation finished; the next event resets to the menu.
    Goodbye,
    /// Waiting for an order code to look up.
    CheckOrder,
    /// Waiting for an order code to cancel.
    CancelOrder,
}

impl DialogueState {
    /// All states, in flow order.
    pub const ALL: [DialogueState; 10] = [
        DialogueState::Greeting,
        DialogueState::GetLink,
        DialogueState::GetQuantity,
        DialogueState::GetEmail,
        DialogueState::GetAddress,
        DialogueState::GetNote,
        DialogueState::GetPhone,
        DialogueState::Goodbye,
        DialogueState::CheckOrder,
        DialogueState::CancelOrder,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Greeting => "greeting",
            DialogueState::GetLink => "get_link",
            DialogueState::GetQuantity => "get_quantity",
            DialogueState::GetEmail => "get_email",
            DialogueState::GetAddress => "get_address",
            DialogueState::GetNote => "get_note",
            DialogueState::GetPhone => "get_phone",
            DialogueState::Goodbye => "goodbye",
            DialogueState::CheckOrder => "check_order",
            DialogueState::CancelOrder => "cancel_order",
        }
    }

    /// Parse the stored representation.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == value)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Resetting to [`DialogueState::Greeting`] is always legal. Staying put
    /// is legal everywhere except [`DialogueState::Goodbye`], which is
    /// transient. [`DialogueState::Goodbye`] itself is only reachable from
    /// the submission and the two lookup branches.
    pub fn permits(&self, next: DialogueState) -> bool {
        use DialogueState::*;

        if next == Greeting {
            return true;
        }
        if next == *self {
            return *self != Goodbye;
        }

        matches!(
            (*self, next),
            (Greeting, GetLink)
                | (Greeting, CheckOrder)
                | (Greeting, CancelOrder)
                | (GetLink, GetQuantity)
                | (GetQuantity, GetEmail)
                | (GetEmail, GetAddress)
                | (GetAddress, GetNote)
                | (GetNote, GetPhone)
                | (GetPhone, Goodbye)
                | (CheckOrder, Goodbye)
                | (CancelOrder, Goodbye)
        )
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
