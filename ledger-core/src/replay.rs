//! Replay guard for signed requests
//!
//! Every non-registration request embeds the hash of the customer's most
//! recent ledger entry (`lastHash`) and is signed over its canonical bytes
//! including that token. Once a mutation commits, the customer's last hash
//! moves on and an earlier signed request can never verify again.
//!
//! Stale tokens and bad signatures produce the same [`Error::Authentication`].

use crate::ledger::{customer_entries, customer_exists};
use crate::protocol::Request;
use crate::types::{CustomerId, Digest, Entry};
use crate::{Error, Result, ValidationError};

/// Hash of the customer's most recent entry, if any
pub fn expected_last_hash(entries: &[Entry], customer_id: &CustomerId) -> Option<Digest> {
    customer_entries(entries, customer_id).last().map(|e| e.hash)
}

/// Check a signed request against the committed entries.
///
/// Returns the authenticated customer id.
pub fn authenticate(entries: &[Entry], request: &Request) -> Result<CustomerId> {
    let customer_id = *request
        .message
        .customer_id()
        .ok_or(ValidationError::UnknownCommand)?;

    if !customer_exists(entries, &customer_id) {
        return Err(ValidationError::UnknownCustomer.into());
    }

    let expected = expected_last_hash(entries, &customer_id);
    if request.message.last_hash() != expected.as_ref() {
        return Err(Error::Authentication);
    }

    let signature = request.signature.as_ref().ok_or(Error::Authentication)?;
    if !signature.verify(&request.message.signing_bytes(), customer_id.as_bytes()) {
        return Err(Error::Authentication);
    }

    Ok(customer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::make_entry;
    use crate::crypto::KeyPair;
    use crate::protocol::Message;
    use crate::types::Operation;
    use rust_decimal::Decimal;

    struct World {
        authority: KeyPair,
        customer: KeyPair,
        entries: Vec<Entry>,
    }

    impl World {
        fn new() -> Self {
            let authority = KeyPair::generate();
            let customer = KeyPair::generate();
            let entries = vec![make_entry(
                &Digest::GENESIS,
                Operation::Register {
                    customer_id: customer.customer_id(),
                },
                &authority,
            )];
            Self {
                authority,
                customer,
                entries,
            }
        }

        fn push(&mut self, value: Operation) {
            let tail = self.entries.last().map(|e| e.hash).unwrap_or(Digest::GENESIS);
            let entry = make_entry(&tail, value, &self.authority);
            self.entries.push(entry);
        }

        fn deposit_request(&self, last_hash: Option<Digest>) -> Request {
            Request::signed(
                Message::Deposit {
                    customer_id: self.customer.customer_id(),
                    amount: Decimal::new(10, 0),
                    last_hash,
                },
                &self.customer,
            )
        }
    }

    #[test]
    fn test_fresh_request_accepted() {
        let world = World::new();
        let token = expected_last_hash(&world.entries, &world.customer.customer_id());
        assert_eq!(token, Some(world.entries[0].hash));

        let request = world.deposit_request(token);
        assert_eq!(
            authenticate(&world.entries, &request).unwrap(),
            world.customer.customer_id()
        );
    }

    #[test]
    fn test_replayed_request_rejected_after_commit() {
        let mut world = World::new();
        let token = Some(world.entries[0].hash);
        let request = world.deposit_request(token);
        assert!(authenticate(&world.entries, &request).is_ok());

        world.push(Operation::Deposit {
            customer_id: world.customer.customer_id(),
            amount: Decimal::new(10, 0),
        });

        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_other_customers_do_not_move_token() {
        let mut world = World::new();
        let other = KeyPair::generate();
        world.push(Operation::Register {
            customer_id: other.customer_id(),
        });

        let request = world.deposit_request(Some(world.entries[0].hash));
        assert!(authenticate(&world.entries, &request).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let world = World::new();
        let request = world.deposit_request(None);
        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let world = World::new();
        let impostor = KeyPair::generate();
        let request = Request::signed(
            Message::Deposit {
                customer_id: world.customer.customer_id(),
                amount: Decimal::new(10, 0),
                last_hash: Some(world.entries[0].hash),
            },
            &impostor,
        );

        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_altered_amount_rejected() {
        let world = World::new();
        let mut request = world.deposit_request(Some(world.entries[0].hash));
        if let Message::Deposit { amount, .. } = &mut request.message {
            *amount = Decimal::new(10_000, 0);
        }

        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_unsigned_request_rejected() {
        let world = World::new();
        let mut request = world.deposit_request(Some(world.entries[0].hash));
        request.signature = None;

        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_unregistered_customer_rejected() {
        let world = World::new();
        let stranger = KeyPair::generate();
        let request = Request::signed(
            Message::Balance {
                customer_id: stranger.customer_id(),
                last_hash: None,
            },
            &stranger,
        );

        assert!(matches!(
            authenticate(&world.entries, &request),
            Err(Error::Validation(ValidationError::UnknownCustomer))
        ));
    }
}
