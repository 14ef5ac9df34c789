//! Reply texts.

use intake_core::{Button, Postback, Reply};

pub const MENU: &str = "Hi! What would you like to do?";
pub const ASK_LINK: &str = "Please paste the link of the product you want to buy.";
pub const ASK_NEXT_LINK: &str = "Please paste the link of the next product.";
pub const LINK_NOT_RECOGNIZED: &str =
    "Sorry, that doesn't look like a product link. Paste a link or pick an option below.";
pub const ASK_QUANTITY: &str = "How many would you like?";
pub const CHECK_QUANTITY: &str = "Please check the quantity. It should be a number, like 2 or 1.5.";
pub const ADD_MORE: &str = "Item added to your order. Would you like to add another item?";
pub const ASK_EMAIL: &str = "What is your email address?";
pub const INVALID_EMAIL: &str = "That is not a valid email address. Please try again.";
pub const ASK_ADDRESS: &str = "What is the delivery address?";
pub const ASK_NOTE: &str = "Any note for this order? (size, colour, delivery time...)";
pub const ASK_PHONE: &str = "Finally, what is your phone number?";
pub const CHECK_PHONE: &str = "Please check the phone number. It should have 9 to 15 digits.";
pub const ASK_ORDER_CODE: &str = "Please enter your order code.";
pub const ASK_CANCEL_CODE: &str = "Please enter the code of the order you want to cancel.";
pub const ORDER_NOT_FOUND: &str =
    "We couldn't find an order with that code. Please check it and try again.";
pub const ORDER_CANCELLED: &str = "Your order has been cancelled.";
pub const GENERIC_ERROR: &str = "Sorry, something went wrong. Please try again in a moment.";

fn menu_buttons() -> Vec<Button> {
    vec![
        Button::new("Buy", Postback::Buy),
        Button::new("Search order", Postback::Search),
        Button::new("Cancel order", Postback::Cancel),
    ]
}

/// The three-option action menu.
pub fn menu(recipient: &str) -> Reply {
    Reply::prompt(recipient, MENU, menu_buttons())
}

/// The menu, introduced by "link not recognized".
pub fn link_not_recognized(recipient: &str) -> Reply {
    Reply::prompt(recipient, LINK_NOT_RECOGNIZED, menu_buttons())
}

/// The "add another item?" prompt.
pub fn add_more(recipient: &str) -> Reply {
    Reply::prompt(
        recipient,
        ADD_MORE,
        vec![Button::new("Yes", Postback::Yes), Button::new("No", Postback::No)],
    )
}

pub fn order_confirmed(recipient: &str, order_code: &str) -> Reply {
    Reply::text(
        recipient,
        format!(
            "Thank you! Your order has been placed. Your order code is {}.",
            order_code
        ),
    )
}

pub fn order_status(recipient: &str, order_code: &str, status: &str) -> Reply {
    Reply::text(recipient, format!("Order {}: {}", order_code, status))
}

pub fn generic_error(recipient: &str) -> Reply {
    Reply::text(recipient, GENERIC_ERROR)
}
