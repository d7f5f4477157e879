//! Pure text handling for gpg and ykman output. No I/O happens here.

mod card_status;
mod key_list_format;
mod key_listing;
mod token_inventory;

pub use card_status::{parse_card_status, parse_slot_line};
pub use key_list_format::render_key_list;
pub use key_listing::{parse_capabilities, parse_key_list, parse_record_line};
pub use token_inventory::openpgp_support;
