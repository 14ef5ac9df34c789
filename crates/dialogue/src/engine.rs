//! The dialogue engine.
//!
//! Every inbound event is classified, routed to the handler of the session's
//! current state, and turned into a [`Step`]. The step is then checked
//! against [`DialogueState::permits`] and persisted in one write together
//! with whatever it does to the user's order. Exactly one reply comes out
//! of [`DialogueEngine::handle`], whatever happens along the way.

use chrono::{DateTime, Utc};
use database::{OrderField, Session, SessionUpdate};
use intake_core::validation::{is_email, is_link, is_phone, parse_quantity};
use intake_core::{DialogueState, EventKind, InboundEvent, Postback, Reply};
use order_gateway::{OrderCodeGenerator, OrderGateway, OrderLine, OrderSubmission};
use tracing::{debug, error, info, warn};

use crate::error::{DialogueError, Result};
use crate::locks::SenderLocks;
use crate::prompts;
use crate::store::ConversationStore;

/// An inbound event, classified.
#[derive(Debug, Clone, PartialEq)]
enum Input<'a> {
    /// A button press with a known token.
    Choice(Postback),
    /// A button press with a token we never hand out.
    UnknownChoice(&'a str),
    /// Typed text, trimmed.
    Text(&'a str),
}

impl<'a> Input<'a> {
    fn classify(event: &'a InboundEvent) -> Self {
        match event.kind {
            EventKind::Postback => match Postback::parse(&event.payload) {
                Some(postback) => Input::Choice(postback),
                None => Input::UnknownChoice(event.payload.trim()),
            },
            EventKind::Text => Input::Text(event.payload.trim()),
        }
    }

    /// Yes/No given either as a button or typed.
    fn answer(&self) -> Option<Postback> {
        match self {
            Input::Choice(p @ (Postback::Yes | Postback::No)) => Some(*p),
            Input::Text(text) if text.eq_ignore_ascii_case("yes") => Some(Postback::Yes),
            Input::Text(text) if text.eq_ignore_ascii_case("no") => Some(Postback::No),
            _ => None,
        }
    }
}

/// What a step does to the user's order, persisted with the session update.
#[derive(Debug, Clone, PartialEq)]
enum Effect {
    None,
    AppendItem { link: String, quantity: f64 },
    SetField { field: OrderField, value: String },
    CommitSubmission { order_id: i64 },
}

/// Outcome of one state handler.
#[derive(Debug)]
enum Step {
    /// Move to `next` and apply `effect`.
    Advance {
        next: DialogueState,
        pending_link: Option<String>,
        effect: Effect,
        reply: Reply,
    },
    /// Stay in the current state; only the activity time changes.
    Stay(Reply),
    /// The stored conversation doesn't allow this; reset to the menu.
    Violation(String),
}

impl Step {
    fn advance(next: DialogueState, reply: Reply) -> Self {
        Step::Advance {
            next,
            pending_link: None,
            effect: Effect::None,
            reply,
        }
    }

    fn advance_with(next: DialogueState, effect: Effect, reply: Reply) -> Self {
        Step::Advance {
            next,
            pending_link: None,
            effect,
            reply,
        }
    }
}

/// Drives conversations from inbound events to submitted orders.
///
/// Events from the same sender are handled one at a time; events from
/// different senders run concurrently.
pub struct DialogueEngine<S, G> {
    store: S,
    gateway: G,
    codes: OrderCodeGenerator,
    locks: SenderLocks,
}

impl<S, G> DialogueEngine<S, G>
where
    S: ConversationStore,
    G: OrderGateway,
{
    /// Create an engine with an unsalted order code generator.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            codes: OrderCodeGenerator::default(),
            locks: SenderLocks::new(),
        }
    }

    /// Use a specific order code generator.
    pub fn with_code_generator(mut self, codes: OrderCodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Handle one inbound event and return the reply for it.
    ///
    /// Never fails: persistence and gateway errors are logged and answered
    /// with a generic error reply.
    pub async fn handle(&self, event: &InboundEvent) -> Reply {
        let _guard = self.locks.lock(&event.sender_id).await;

        match self.step(event, Utc::now()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to handle event from {}: {}", event.sender_id, e);
                prompts::generic_error(&event.sender_id)
            }
        }
    }

    async fn step(&self, event: &InboundEvent, now: DateTime<Utc>) -> Result<Reply> {
        let user_id = event.sender_id.as_str();

        self.store
            .touch_user(user_id, event.sender_name.as_deref(), now)
            .await?;

        let input = Input::classify(event);

        let Some(session) = self.store.active_session(user_id).await? else {
            let session = self
                .store
                .open_session(user_id, DialogueState::Greeting, now)
                .await?;
            info!("Opened session {} for {}", session.id, user_id);

            // A first message that already is a link or a menu choice is
            // acted on; anything else gets the menu.
            return match input {
                Input::Text(text) if is_link(text) => {
                    let step = greeting(user_id, &input);
                    self.apply(DialogueState::Greeting, &session, step, now).await
                }
                Input::Choice(Postback::Buy | Postback::Search | Postback::Cancel) => {
                    let step = greeting(user_id, &input);
                    self.apply(DialogueState::Greeting, &session, step, now).await
                }
                _ => Ok(prompts::menu(user_id)),
            };
        };

        let Some(state) = DialogueState::parse(&session.state) else {
            let reason = format!("unknown stored state {:?}", session.state);
            return self.reset(&session, DialogueError::Violation(reason), now).await;
        };

        debug!("{} in {}: {:?}", user_id, state, input);

        let step = self.transition(state, &session, &input, now).await?;
        self.apply(state, &session, step, now).await
    }

    async fn transition(
        &self,
        state: DialogueState,
        session: &Session,
        input: &Input<'_>,
        now: DateTime<Utc>,
    ) -> Result<Step> {
        let user_id = session.user_id.as_str();

        let step = match state {
            DialogueState::Greeting => greeting(user_id, input),
            DialogueState::GetLink => get_link(session, input),
            DialogueState::GetQuantity => get_quantity(user_id, input),
            DialogueState::GetEmail => get_email(user_id, input),
            DialogueState::GetAddress => free_text(
                user_id,
                input,
                OrderField::Address,
                DialogueState::GetNote,
                prompts::ASK_ADDRESS,
                prompts::ASK_NOTE,
            ),
            DialogueState::GetNote => free_text(
                user_id,
                input,
                OrderField::Note,
                DialogueState::GetPhone,
                prompts::ASK_NOTE,
                prompts::ASK_PHONE,
            ),
            DialogueState::GetPhone => self.get_phone(user_id, input, now).await?,
            DialogueState::Goodbye => Step::advance(DialogueState::Greeting, prompts::menu(user_id)),
            DialogueState::CheckOrder => self.check_order(user_id, input).await,
            DialogueState::CancelOrder => self.cancel_order(user_id, input).await,
        };

        Ok(step)
    }

    /// Validate a step against the transition table and persist it.
    async fn apply(
        &self,
        from: DialogueState,
        session: &Session,
        step: Step,
        now: DateTime<Utc>,
    ) -> Result<Reply> {
        let (next, pending_link, effect, reply) = match step {
            Step::Stay(reply) => {
                self.store
                    .save_session(&SessionUpdate::keep(session, now))
                    .await?;
                return Ok(reply);
            }
            Step::Violation(reason) => {
                return self.reset(session, DialogueError::Violation(reason), now).await;
            }
            Step::Advance {
                next,
                pending_link,
                effect,
                reply,
            } => (next, pending_link, effect, reply),
        };

        if !from.permits(next) {
            let reason = format!("illegal transition {} -> {}", from, next);
            return self.reset(session, DialogueError::Violation(reason), now).await;
        }

        let mut update = SessionUpdate::new(session.id, next.as_str(), now);
        update.pending_link = pending_link;

        match effect {
            Effect::None => self.store.save_session(&update).await?,
            Effect::AppendItem { link, quantity } => {
                let item = self
                    .store
                    .append_item(&session.user_id, &link, quantity, &update)
                    .await?;
                info!("Item {} added for {}", item.id, session.user_id);
            }
            Effect::SetField { field, value } => {
                let result = self
                    .store
                    .set_order_field(&session.user_id, field, &value, &update)
                    .await;
                match result {
                    Err(e) if e.is_not_found("Order") => {
                        let reason = format!("no order to set {} on", field.column_name());
                        return self.reset(session, DialogueError::Violation(reason), now).await;
                    }
                    other => other?,
                }
            }
            Effect::CommitSubmission { order_id } => {
                self.store.commit_submission(order_id, &update).await?;
            }
        }

        if from != next {
            debug!("{}: {} -> {}", session.user_id, from, next);
        }

        Ok(reply)
    }

    /// Log a protocol violation and put the session back on the menu.
    ///
    /// The user's order, if any, is left in place.
    async fn reset(
        &self,
        session: &Session,
        violation: DialogueError,
        now: DateTime<Utc>,
    ) -> Result<Reply> {
        warn!(
            "Resetting session {} of {} (state {}): {}",
            session.id, session.user_id, session.state, violation
        );

        let update = SessionUpdate::new(session.id, DialogueState::Greeting.as_str(), now);
        self.store.save_session(&update).await?;

        Ok(prompts::menu(&session.user_id))
    }

    async fn get_phone(
        &self,
        user_id: &str,
        input: &Input<'_>,
        now: DateTime<Utc>,
    ) -> Result<Step> {
        let phone = match input {
            Input::Text(text) if is_phone(text) => *text,
            Input::Text(_) => return Ok(Step::Stay(Reply::text(user_id, prompts::CHECK_PHONE))),
            _ => return Ok(Step::Stay(Reply::text(user_id, prompts::ASK_PHONE))),
        };

        let Some(aggregate) = self.store.order_with_items(user_id).await? else {
            return Ok(Step::Violation("no order to submit".to_string()));
        };
        if aggregate.items.is_empty() {
            return Ok(Step::Violation(format!(
                "order {} has no items",
                aggregate.order.id
            )));
        }

        let order = aggregate.order;
        // A retry after a failed submission keeps the code already handed out
        let order_code = match order.order_code {
            Some(code) => code,
            None => self.codes.generate(),
        };
        self.store
            .stage_submission(order.id, phone, &order_code, now)
            .await?;

        let user = self.store.user(user_id).await?;
        let submission = OrderSubmission {
            name: user.name,
            sender_id: user_id.to_string(),
            phone: phone.to_string(),
            email: order.email.unwrap_or_default(),
            order_code: order_code.clone(),
            order_items: aggregate
                .items
                .into_iter()
                .map(|item| OrderLine {
                    link: item.link,
                    quantity: item.quantity,
                })
                .collect(),
            note: order.note.unwrap_or_default(),
            address: order.address.unwrap_or_default(),
        };

        match self.gateway.submit_order(&submission).await {
            Ok(accepted) => {
                info!("Order {} submitted for {}", accepted, user_id);
                Ok(Step::advance_with(
                    DialogueState::Goodbye,
                    Effect::CommitSubmission { order_id: order.id },
                    prompts::order_confirmed(user_id, &accepted),
                ))
            }
            Err(e) => {
                error!(
                    "Submitting order {} for {} failed (retryable: {}): {}",
                    order_code,
                    user_id,
                    e.is_retryable(),
                    e
                );
                Ok(Step::Stay(prompts::generic_error(user_id)))
            }
        }
    }

    async fn check_order(&self, user_id: &str, input: &Input<'_>) -> Step {
        let code = match input {
            Input::Text(code) if !code.is_empty() => *code,
            _ => return Step::Stay(Reply::text(user_id, prompts::ASK_ORDER_CODE)),
        };

        match self.gateway.query_order(code).await {
            Ok(status) => Step::advance(
                DialogueState::Goodbye,
                prompts::order_status(user_id, code, &status.order_status),
            ),
            Err(e) if e.is_not_found() => {
                debug!("Order {} not found for {}", code, user_id);
                Step::Stay(Reply::text(user_id, prompts::ORDER_NOT_FOUND))
            }
            Err(e) => {
                error!("Looking up order {} for {} failed: {}", code, user_id, e);
                Step::Stay(prompts::generic_error(user_id))
            }
        }
    }

    async fn cancel_order(&self, user_id: &str, input: &Input<'_>) -> Step {
        let code = match input {
            Input::Text(code) if !code.is_empty() => *code,
            _ => return Step::Stay(Reply::text(user_id, prompts::ASK_CANCEL_CODE)),
        };

        match self.gateway.cancel_order(code).await {
            Ok(()) => {
                info!("Order {} cancelled by {}", code, user_id);
                Step::advance(
                    DialogueState::Goodbye,
                    Reply::text(user_id, prompts::ORDER_CANCELLED),
                )
            }
            Err(e) if e.is_not_found() => {
                debug!("Order {} not found for {}", code, user_id);
                Step::Stay(Reply::text(user_id, prompts::ORDER_NOT_FOUND))
            }
            Err(e) => {
                error!("Cancelling order {} for {} failed: {}", code, user_id, e);
                Step::Stay(prompts::generic_error(user_id))
            }
        }
    }
}

fn greeting(user_id: &str, input: &Input<'_>) -> Step {
    match input {
        Input::Choice(Postback::Search) => Step::advance(
            DialogueState::CheckOrder,
            Reply::text(user_id, prompts::ASK_ORDER_CODE),
        ),
        Input::Choice(Postback::Cancel) => Step::advance(
            DialogueState::CancelOrder,
            Reply::text(user_id, prompts::ASK_CANCEL_CODE),
        ),
        Input::Choice(Postback::Buy) => Step::Stay(Reply::text(user_id, prompts::ASK_LINK)),
        Input::Text(text) if is_link(text) => Step::Advance {
            next: DialogueState::GetLink,
            pending_link: Some(text.to_string()),
            effect: Effect::None,
            reply: Reply::text(user_id, prompts::ASK_QUANTITY),
        },
        Input::Text(_) => Step::Stay(prompts::link_not_recognized(user_id)),
        // Stale buttons from an earlier prompt
        Input::Choice(_) | Input::UnknownChoice(_) => Step::Stay(prompts::menu(user_id)),
    }
}

fn get_link(session: &Session, input: &Input<'_>) -> Step {
    let user_id = session.user_id.as_str();

    let quantity = match input {
        Input::Text(text) => parse_quantity(text),
        _ => None,
    };
    let Some(quantity) = quantity else {
        return Step::Stay(Reply::text(user_id, prompts::CHECK_QUANTITY));
    };

    let Some(link) = session.pending_link.clone() else {
        return Step::Violation("quantity without a pending link".to_string());
    };

    Step::advance_with(
        DialogueState::GetQuantity,
        Effect::AppendItem { link, quantity },
        prompts::add_more(user_id),
    )
}

fn get_quantity(user_id: &str, input: &Input<'_>) -> Step {
    match input.answer() {
        Some(Postback::Yes) => Step::advance(
            DialogueState::Greeting,
            Reply::text(user_id, prompts::ASK_NEXT_LINK),
        ),
        Some(_) => Step::advance(
            DialogueState::GetEmail,
            Reply::text(user_id, prompts::ASK_EMAIL),
        ),
        None => Step::Stay(prompts::add_more(user_id)),
    }
}

fn get_email(user_id: &str, input: &Input<'_>) -> Step {
    match input {
        Input::Text(text) if is_email(text) => Step::advance_with(
            DialogueState::GetAddress,
            Effect::SetField {
                field: OrderField::Email,
                value: text.to_string(),
            },
            Reply::text(user_id, prompts::ASK_ADDRESS),
        ),
        Input::Text(_) => Step::Stay(Reply::text(user_id, prompts::INVALID_EMAIL)),
        _ => Step::Stay(Reply::text(user_id, prompts::ASK_EMAIL)),
    }
}

/// Address and note: any typed text is accepted.
fn free_text(
    user_id: &str,
    input: &Input<'_>,
    field: OrderField,
    next: DialogueState,
    question: &str,
    next_question: &str,
) -> Step {
    match input {
        Input::Text(text) => Step::advance_with(
            next,
            Effect::SetField {
                field,
                value: text.to_string(),
            },
            Reply::text(user_id, next_question),
        ),
        _ => Step::Stay(Reply::text(user_id, question)),
    }
}
