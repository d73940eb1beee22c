//! Peripheral identifier helpers.

use btleplug::platform::PeripheralId;

/// Address reported when the platform hides the real one (macOS).
const UNSET_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they wrap the
/// MAC address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_id_wrapper(&format!("{:?}", id))
}

/// Create an identifier string from an address and peripheral ID.
///
/// Falls back to the peripheral ID when the address is unset.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_unset_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

fn is_unset_address(address: &str) -> bool {
    address == UNSET_ADDRESS
}

fn strip_id_wrapper(debug: &str) -> String {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}
