//! Balance projection
//!
//! A balance is a pure fold over the committed log: zero, plus every signed
//! amount belonging to the customer, in log order. O(n) per call.

use crate::ledger::customer_entries;
use crate::types::{CustomerId, Entry};
use rust_decimal::Decimal;

/// Current balance of `customer_id`
pub fn balance(entries: &[Entry], customer_id: &CustomerId) -> Decimal {
    customer_entries(entries, customer_id)
        .filter(|e| !e.value.is_register())
        .fold(Decimal::ZERO, |acc, e| acc + e.value.signed_amount())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Digest, Operation, Signature};

    fn entry(value: Operation) -> Entry {
        Entry {
            value,
            hash: Digest::GENESIS,
            signature: Signature::from_bytes([0u8; 64]),
        }
    }

    #[test]
    fn test_balance_is_signed_sum() {
        let alice = CustomerId::from_bytes([1u8; 32]);
        let entries = vec![
            entry(Operation::Register { customer_id: alice }),
            entry(Operation::Deposit {
                customer_id: alice,
                amount: Decimal::new(10050, 2),
            }),
            entry(Operation::withdraw(alice, Decimal::new(50, 0))),
        ];

        assert_eq!(balance(&entries, &alice), Decimal::new(5050, 2));
    }

    #[test]
    fn test_other_customers_ignored() {
        let alice = CustomerId::from_bytes([1u8; 32]);
        let bob = CustomerId::from_bytes([2u8; 32]);
        let entries = vec![
            entry(Operation::Register { customer_id: alice }),
            entry(Operation::Register { customer_id: bob }),
            entry(Operation::Deposit {
                customer_id: bob,
                amount: Decimal::new(70, 0),
            }),
            entry(Operation::Deposit {
                customer_id: alice,
                amount: Decimal::new(30, 0),
            }),
        ];

        assert_eq!(balance(&entries, &alice), Decimal::new(30, 0));
        assert_eq!(balance(&entries, &bob), Decimal::new(70, 0));
    }

    #[test]
    fn test_unknown_customer_is_zero() {
        let carol = CustomerId::from_bytes([3u8; 32]);
        assert_eq!(balance(&[], &carol), Decimal::ZERO);
    }
}
