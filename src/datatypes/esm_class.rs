// ABOUTME: Bit masks for the esm_class octet of submit_sm and deliver_sm
// ABOUTME: Covers the messaging mode, the message type and the UDHI feature bit

/// Bits 1-0: messaging mode
pub const MODE_MASK: u8 = 0b0000_0011;
pub const MODE_DEFAULT: u8 = 0b0000_0000;
pub const MODE_DATAGRAM: u8 = 0b0000_0001;
pub const MODE_FORWARD: u8 = 0b0000_0010;
pub const MODE_STORE_AND_FORWARD: u8 = 0b0000_0011;

/// Bits 5-2: message type
pub const TYPE_MASK: u8 = 0b0011_1100;
pub const TYPE_DELIVERY_RECEIPT: u8 = 0b0000_0100;

/// Bit 6: short_message starts with a User Data Header
pub const UDHI: u8 = 0b0100_0000;

/// Bit 7: reply path
pub const REPLY_PATH: u8 = 0b1000_0000;

pub fn has_udhi(esm_class: u8) -> bool {
    esm_class & UDHI != 0
}

/// A deliver_sm carrying an SMSC delivery receipt rather than a mobile originated message
pub fn is_delivery_receipt(esm_class: u8) -> bool {
    esm_class & TYPE_MASK == TYPE_DELIVERY_RECEIPT
}
