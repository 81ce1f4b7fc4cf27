//! Signing requests on behalf of a customer

use crate::{Result, TellerError};
use ledger_core::{CustomerId, CustomerSecret, Digest, KeyPair, Message, Request};
use rust_decimal::Decimal;

/// Customer identity held by the teller for the duration of one command
#[derive(Debug)]
pub struct CustomerSigner {
    keypair: KeyPair,
}

impl CustomerSigner {
    /// Build from the secret returned at registration
    pub fn from_secret(secret: &CustomerSecret) -> Result<Self> {
        Ok(Self {
            keypair: secret.to_keypair()?,
        })
    }

    /// Build from the secret, checking it belongs to `customer_id`
    pub fn for_customer(customer_id: &CustomerId, secret: &CustomerSecret) -> Result<Self> {
        let signer = Self::from_secret(secret)?;
        if signer.customer_id() != *customer_id {
            return Err(TellerError::SecretMismatch(*customer_id));
        }
        Ok(signer)
    }

    /// Customer id (public key)
    pub fn customer_id(&self) -> CustomerId {
        self.keypair.customer_id()
    }

    /// Signed balance query
    pub fn balance(&self, last_hash: Option<Digest>) -> Request {
        self.sign(Message::Balance {
            customer_id: self.customer_id(),
            last_hash,
        })
    }

    /// Signed deposit
    pub fn deposit(&self, amount: Decimal, last_hash: Option<Digest>) -> Request {
        self.sign(Message::Deposit {
            customer_id: self.customer_id(),
            amount,
            last_hash,
        })
    }

    /// Signed withdrawal of a positive magnitude
    pub fn withdraw(&self, amount: Decimal, last_hash: Option<Digest>) -> Request {
        self.sign(Message::Withdraw {
            customer_id: self.customer_id(),
            amount,
            last_hash,
        })
    }

    fn sign(&self, message: Message) -> Request {
        Request::signed(message, &self.keypair)
    }
}
