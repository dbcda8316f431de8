//! SKU generation for items created without one.
//!
//! Format: two uppercase letters from the item name followed by a random
//! number in `1000..=9999` (`"Hammer"` → `HA4821`). Names with fewer than two
//! letters or digits are padded with `X`.
//!
//! Generated SKUs are not checked for uniqueness; the SKU is a human label and
//! items are keyed by their store id.

use rand::Rng;

const PREFIX_LEN: usize = 2;
const PAD: char = 'X';

/// Generates a SKU from `name` using the thread-local RNG.
pub fn generate_sku(name: &str) -> String {
    generate_sku_with(name, &mut rand::thread_rng())
}

/// Generates a SKU from `name` using the given RNG.
pub fn generate_sku_with<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(1000..=9999);
    format!("{}{}", sku_prefix(name), suffix)
}

fn sku_prefix(name: &str) -> String {
    let mut prefix: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .take(PREFIX_LEN)
        .collect();

    while prefix.chars().count() < PREFIX_LEN {
        prefix.push(PAD);
    }
    prefix
}
