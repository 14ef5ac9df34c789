//! End-to-end conversations against an in-memory database and a scripted
//! order service.

use std::sync::Arc;

use chrono::{Duration, Utc};
use database::{order, session, user, Database, SessionUpdate};
use dialogue::{prompts, DialogueEngine, SessionReaper, SqliteStore};
use intake_core::{InboundEvent, Postback, Reply};
use order_gateway::{GatewayError, OrderCodeGenerator, ScriptedGateway};

const LINK: &str = "https://shop.example.com/item/42";
const OTHER_LINK: &str = "shop.example.com/item/7";
const PHONE: &str = "+84901234567";

struct Harness {
    db: Database,
    engine: Arc<DialogueEngine<SqliteStore, ScriptedGateway>>,
    _dir: Option<tempfile::TempDir>,
}

impl Harness {
    async fn new() -> Self {
        Self::connect("sqlite::memory:", None).await
    }

    /// A harness backed by a database file, for tests with parallel writers.
    async fn on_disk() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("intake.db").display());
        Self::connect(&url, Some(dir)).await
    }

    async fn connect(url: &str, dir: Option<tempfile::TempDir>) -> Self {
        let db = Database::connect(url).await.unwrap();
        db.migrate().await.unwrap();

        let engine = DialogueEngine::new(SqliteStore::new(db.clone()), ScriptedGateway::new())
            .with_code_generator(OrderCodeGenerator::new("test").unwrap());

        Self {
            db,
            engine: Arc::new(engine),
            _dir: dir,
        }
    }

    fn gateway(&self) -> &ScriptedGateway {
        self.engine.gateway()
    }

    async fn say(&self, user_id: &str, text: &str) -> Reply {
        self.engine.handle(&InboundEvent::text(user_id, text)).await
    }

    async fn press(&self, user_id: &str, postback: Postback) -> Reply {
        self.engine
            .handle(&InboundEvent::postback(user_id, postback.as_str()))
            .await
    }

    async fn state(&self, user_id: &str) -> String {
        session::get_active_session(self.db.pool(), user_id)
            .await
            .unwrap()
            .expect("active session")
            .state
    }

    async fn force_state(&self, user_id: &str, state: &str) {
        let current = session::get_active_session(self.db.pool(), user_id)
            .await
            .unwrap()
            .expect("active session");
        let update = SessionUpdate::new(current.id, state, Utc::now());
        session::apply_update(self.db.pool(), &update).await.unwrap();
    }

    async fn orders(&self, user_id: &str) -> i64 {
        order::count_orders(self.db.pool(), user_id).await.unwrap()
    }

    async fn items(&self) -> i64 {
        order::count_items(self.db.pool()).await.unwrap()
    }

    /// Walk a user from first contact to the phone question with two items.
    async fn fill_order(&self, user_id: &str) {
        self.say(user_id, LINK).await;
        self.say(user_id, "5").await;
        self.press(user_id, Postback::Yes).await;
        self.say(user_id, OTHER_LINK).await;
        self.say(user_id, "2.5").await;
        self.press(user_id, Postback::No).await;
        self.say(user_id, "Lan@Example.com").await;
        self.say(user_id, "1 Trang Tien, Hanoi").await;
        self.say(user_id, "leave at the door").await;
        assert_eq!(self.state(user_id).await, "get_phone");
    }
}

#[tokio::test]
async fn test_first_contact_shows_menu() {
    let h = Harness::new().await;

    let reply = h
        .engine
        .handle(&InboundEvent::text("100", "hello").with_sender_name("Lan"))
        .await;

    assert_eq!(reply.body(), prompts::MENU);
    assert!(reply.offers(Postback::Buy));
    assert!(reply.offers(Postback::Search));
    assert!(reply.offers(Postback::Cancel));
    assert_eq!(h.state("100").await, "greeting");
    assert_eq!(user::get_user(h.db.pool(), "100").await.unwrap().name, "Lan");
}

#[tokio::test]
async fn test_display_name_is_refreshed() {
    let h = Harness::new().await;

    h.engine
        .handle(&InboundEvent::text("100", "hello").with_sender_name("Lan"))
        .await;
    h.engine.handle(&InboundEvent::text("100", "hello")).await;
    assert_eq!(user::get_user(h.db.pool(), "100").await.unwrap().name, "Lan");

    h.engine
        .handle(&InboundEvent::text("100", "hello").with_sender_name("Lan Nguyen"))
        .await;
    assert_eq!(
        user::get_user(h.db.pool(), "100").await.unwrap().name,
        "Lan Nguyen"
    );
}

#[tokio::test]
async fn test_link_then_quantity_creates_item() {
    let h = Harness::new().await;

    let reply = h.say("100", LINK).await;
    assert_eq!(h.state("100").await, "get_link");
    assert_eq!(reply.body(), prompts::ASK_QUANTITY);

    let reply = h.say("100", "5").await;
    assert_eq!(h.state("100").await, "get_quantity");
    assert!(reply.offers(Postback::Yes));
    assert!(reply.offers(Postback::No));

    let aggregate = order::get_order_with_items(h.db.pool(), "100")
        .await
        .unwrap()
        .expect("order in progress");
    assert_eq!(aggregate.items.len(), 1);
    assert_eq!(aggregate.items[0].link, LINK);
    assert_eq!(aggregate.items[0].quantity, 5.0);

    let session = session::get_active_session(h.db.pool(), "100")
        .await
        .unwrap()
        .unwrap();
    assert!(session.pending_link.is_none());
}

#[tokio::test]
async fn test_menu_buy_asks_for_link() {
    let h = Harness::new().await;
    h.say("100", "hi").await;

    let reply = h.press("100", Postback::Buy).await;
    assert_eq!(reply.body(), prompts::ASK_LINK);
    assert_eq!(h.state("100").await, "greeting");
}

#[tokio::test]
async fn test_unrecognized_link_stays_in_greeting() {
    let h = Harness::new().await;
    h.say("100", "hi").await;

    let reply = h.say("100", "just browsing").await;
    assert_eq!(reply.body(), prompts::LINK_NOT_RECOGNIZED);
    assert!(reply.offers(Postback::Search));
    assert_eq!(h.state("100").await, "greeting");
}

#[tokio::test]
async fn test_invalid_quantity_creates_nothing() {
    let h = Harness::new().await;
    h.say("100", LINK).await;

    for text in ["abc", "-1", "", "NaN"] {
        let reply = h.say("100", text).await;
        assert_eq!(reply.body(), prompts::CHECK_QUANTITY);
    }
    h.press("100", Postback::No).await;

    assert_eq!(h.state("100").await, "get_link");
    assert_eq!(h.orders("100").await, 0);
    assert_eq!(h.items().await, 0);
}

#[tokio::test]
async fn test_add_another_item_loop() {
    let h = Harness::new().await;
    h.say("100", LINK).await;
    h.say("100", "5").await;

    let reply = h.press("100", Postback::Yes).await;
    assert_eq!(reply.body(), prompts::ASK_NEXT_LINK);
    assert_eq!(h.state("100").await, "greeting");

    h.say("100", OTHER_LINK).await;
    h.say("100", "2.5").await;
    assert_eq!(h.items().await, 2);
    assert_eq!(h.orders("100").await, 1);

    // Anything but yes/no repeats the question
    let reply = h.say("100", "maybe").await;
    assert!(reply.offers(Postback::No));
    assert_eq!(h.state("100").await, "get_quantity");

    let reply = h.say("100", "NO").await;
    assert_eq!(reply.body(), prompts::ASK_EMAIL);
    assert_eq!(h.state("100").await, "get_email");
}

#[tokio::test]
async fn test_contact_fields_are_validated() {
    let h = Harness::new().await;
    h.say("100", LINK).await;
    h.say("100", "1").await;
    h.press("100", Postback::No).await;

    let reply = h.say("100", "not-an-email").await;
    assert_eq!(reply.body(), prompts::INVALID_EMAIL);
    assert_eq!(h.state("100").await, "get_email");

    let reply = h.say("100", "lan@example.com").await;
    assert_eq!(reply.body(), prompts::ASK_ADDRESS);
    h.say("100", "1 Trang Tien, Hanoi").await;
    let reply = h.say("100", "none").await;
    assert_eq!(reply.body(), prompts::ASK_PHONE);

    let reply = h.say("100", "123").await;
    assert_eq!(reply.body(), prompts::CHECK_PHONE);
    assert_eq!(h.state("100").await, "get_phone");

    let pending = order::get_order(h.db.pool(), "100").await.unwrap().unwrap();
    assert_eq!(pending.email.as_deref(), Some("lan@example.com"));
    assert_eq!(pending.address.as_deref(), Some("1 Trang Tien, Hanoi"));
    assert_eq!(pending.note.as_deref(), Some("none"));
    assert!(pending.phone.is_none());
}

#[tokio::test]
async fn test_submission_failure_keeps_order() {
    let h = Harness::new().await;
    h.fill_order("100").await;
    h.gateway().fail_next_submit(500);

    let reply = h.say("100", PHONE).await;

    assert_eq!(reply.body(), prompts::GENERIC_ERROR);
    assert_eq!(h.state("100").await, "get_phone");
    assert_eq!(h.orders("100").await, 1);
    assert_eq!(h.items().await, 2);
    assert!(h.gateway().submissions().is_empty());
}

#[tokio::test]
async fn test_submission_success_clears_order() {
    let h = Harness::new().await;
    h.engine
        .handle(&InboundEvent::text("100", "hi").with_sender_name("Lan"))
        .await;
    h.fill_order("100").await;

    let reply = h.say("100", PHONE).await;

    assert_eq!(h.state("100").await, "goodbye");
    assert_eq!(h.orders("100").await, 0);
    assert_eq!(h.items().await, 0);

    let submissions = h.gateway().submissions();
    assert_eq!(submissions.len(), 1);
    let submitted = &submissions[0];
    assert!(reply.body().contains(&submitted.order_code));
    assert_eq!(submitted.name, "Lan");
    assert_eq!(submitted.sender_id, "100");
    assert_eq!(submitted.phone, PHONE);
    assert_eq!(submitted.email, "Lan@Example.com");
    assert_eq!(submitted.address, "1 Trang Tien, Hanoi");
    assert_eq!(submitted.note, "leave at the door");
    assert_eq!(submitted.order_items.len(), 2);
    assert_eq!(submitted.order_items[0].link, LINK);
    assert_eq!(submitted.order_items[1].quantity, 2.5);

    let codes = OrderCodeGenerator::new("test").unwrap();
    assert!(codes.decode(&submitted.order_code).is_some());
}

#[tokio::test]
async fn test_retry_after_failure_submits_once() {
    let h = Harness::new().await;
    h.fill_order("100").await;
    h.gateway().fail_next_submit(503);

    h.say("100", PHONE).await;
    let staged = order::get_order(h.db.pool(), "100")
        .await
        .unwrap()
        .unwrap()
        .order_code
        .expect("code staged before submission");

    let reply = h.say("100", PHONE).await;
    assert!(reply.body().contains(&staged));

    // Resending after success only brings back the menu
    let reply = h.say("100", PHONE).await;
    assert_eq!(reply.body(), prompts::MENU);

    let submissions = h.gateway().submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].order_code, staged);
    assert_eq!(h.orders("100").await, 0);
}

#[tokio::test]
async fn test_goodbye_returns_to_menu() {
    let h = Harness::new().await;
    h.fill_order("100").await;
    h.say("100", PHONE).await;
    assert_eq!(h.state("100").await, "goodbye");

    let reply = h.say("100", "thanks").await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.state("100").await, "greeting");
}

#[tokio::test]
async fn test_check_order() {
    let h = Harness::new().await;
    h.gateway().add_order("abc123", "shipped");

    let reply = h.press("100", Postback::Search).await;
    assert_eq!(reply.body(), prompts::ASK_ORDER_CODE);
    assert_eq!(h.state("100").await, "check_order");

    let reply = h.say("100", "zzz999").await;
    assert_eq!(reply.body(), prompts::ORDER_NOT_FOUND);
    assert_eq!(h.state("100").await, "check_order");

    h.gateway().fail_next_query(GatewayError::Timeout);
    let reply = h.say("100", "abc123").await;
    assert_eq!(reply.body(), prompts::GENERIC_ERROR);
    assert_eq!(h.state("100").await, "check_order");

    let reply = h.say("100", "abc123").await;
    assert!(reply.body().contains("shipped"));
    assert_eq!(h.state("100").await, "goodbye");
}

#[tokio::test]
async fn test_cancel_order() {
    let h = Harness::new().await;
    h.gateway().add_order("abc123", "pending");
    h.say("100", "hi").await;

    h.press("100", Postback::Cancel).await;
    assert_eq!(h.state("100").await, "cancel_order");

    let reply = h.say("100", "zzz999").await;
    assert_eq!(reply.body(), prompts::ORDER_NOT_FOUND);
    assert_eq!(h.state("100").await, "cancel_order");

    h.gateway().fail_next_cancel(GatewayError::Timeout);
    let reply = h.say("100", "abc123").await;
    assert_eq!(reply.body(), prompts::GENERIC_ERROR);
    assert_eq!(h.state("100").await, "cancel_order");
    assert!(h.gateway().has_order("abc123"));

    let reply = h.say("100", "abc123").await;
    assert_eq!(reply.body(), prompts::ORDER_CANCELLED);
    assert_eq!(h.state("100").await, "goodbye");
    assert!(!h.gateway().has_order("abc123"));
}

#[tokio::test]
async fn test_unknown_stored_state_resets_to_menu() {
    let h = Harness::new().await;
    h.say("100", LINK).await;
    h.say("100", "5").await;
    h.force_state("100", "warp_drive").await;

    let reply = h.say("100", "hello").await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.state("100").await, "greeting");
    // The order in progress is not touched
    assert_eq!(h.items().await, 1);
}

#[tokio::test]
async fn test_field_without_order_resets_to_menu() {
    let h = Harness::new().await;
    h.say("100", "hi").await;
    h.force_state("100", "get_address").await;

    let reply = h.say("100", "1 Trang Tien, Hanoi").await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.state("100").await, "greeting");
    assert_eq!(h.orders("100").await, 0);
}

#[tokio::test]
async fn test_phone_without_order_resets_to_menu() {
    let h = Harness::new().await;
    h.say("100", "hi").await;
    h.force_state("100", "get_phone").await;

    let reply = h.say("100", PHONE).await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.state("100").await, "greeting");
    assert!(h.gateway().submissions().is_empty());
}

#[tokio::test]
async fn test_reaped_session_starts_over() {
    let h = Harness::new().await;
    h.say("100", LINK).await;
    h.say("100", "5").await;

    let reaper = SessionReaper::new(SqliteStore::new(h.db.clone()));
    assert_eq!(reaper.sweep().await.unwrap(), 0);
    assert_eq!(
        reaper.sweep_at(Utc::now() + Duration::hours(25)).await.unwrap(),
        1
    );
    assert!(session::get_active_session(h.db.pool(), "100")
        .await
        .unwrap()
        .is_none());

    let reply = h.say("100", "hello").await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.state("100").await, "greeting");
    assert_eq!(session::count_active_sessions(h.db.pool(), "100").await.unwrap(), 1);
}

#[tokio::test]
async fn test_reaped_purchase_is_not_resubmitted() {
    let h = Harness::new().await;
    h.say("100", LINK).await;
    h.say("100", "5").await;
    h.press("100", Postback::No).await;
    h.say("100", "old@example.com").await;

    let reaper = SessionReaper::new(SqliteStore::new(h.db.clone()));
    reaper.sweep_at(Utc::now() + Duration::hours(25)).await.unwrap();

    let reply = h.say("100", "hello").await;
    assert_eq!(reply.body(), prompts::MENU);
    assert_eq!(h.orders("100").await, 0);
    assert_eq!(h.items().await, 0);

    h.say("100", OTHER_LINK).await;
    h.say("100", "1").await;
    h.press("100", Postback::No).await;
    h.say("100", "lan@example.com").await;
    h.say("100", "1 Trang Tien, Hanoi").await;
    h.say("100", "none").await;
    h.say("100", PHONE).await;

    let submissions = h.gateway().submissions();
    assert_eq!(submissions.len(), 1);
    let submitted = &submissions[0];
    assert_eq!(submitted.order_items.len(), 1);
    assert_eq!(submitted.order_items[0].link, OTHER_LINK);
    assert_eq!(submitted.order_items[0].quantity, 1.0);
    assert_eq!(submitted.email, "lan@example.com");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_events_from_one_user_are_serialized() {
    let h = Harness::on_disk().await;
    h.say("100", LINK).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move {
            engine.handle(&InboundEvent::text("100", "5")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Only the first "5" is a quantity; the rest land in GET_QUANTITY
    assert_eq!(h.items().await, 1);
    assert_eq!(h.state("100").await, "get_quantity");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_users_do_not_interfere() {
    let h = Harness::on_disk().await;

    let mut handles = Vec::new();
    for n in 0..4 {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move {
            let user_id = format!("user-{}", n);
            engine.handle(&InboundEvent::text(&user_id, LINK)).await;
            engine.handle(&InboundEvent::text(&user_id, "3")).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.items().await, 4);
    for n in 0..4 {
        assert_eq!(h.state(&format!("user-{}", n)).await, "get_quantity");
    }
}
