//! Prints a fresh base64 store key for `bank`

use ledger_core::StoreKey;

fn main() {
    println!("{}", StoreKey::generate().to_base64());
}
