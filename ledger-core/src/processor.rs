//! Command processor
//!
//! Maps one decoded request to either a ledger mutation or a rejection.
//!
//! | Command  | Precondition                       | Effect                   |
//! |----------|------------------------------------|--------------------------|
//! | register | none                               | new identity, `Register` |
//! | balance  | authenticated                      | none                     |
//! | deposit  | authenticated, amount > 0          | `Deposit`                |
//! | withdraw | authenticated, 0 < amount ≤ balance | `Withdraw` (negative)    |
//! | unknown  | -                                  | none                     |
//!
//! Rejections are returned as errors and never touch the ledger.

use crate::crypto::{CustomerSecret, KeyPair};
use crate::ledger::Ledger;
use crate::metrics::Metrics;
use crate::projection::balance;
use crate::protocol::{Message, Request, Response};
use crate::replay::authenticate;
use crate::types::{Entry, Operation};
use crate::{Result, ValidationError};
use rust_decimal::Decimal;
use std::time::Instant;

/// Single-writer command processor owning the ledger
#[derive(Debug)]
pub struct CommandProcessor {
    ledger: Ledger,
    metrics: Metrics,
}

impl CommandProcessor {
    /// Create processor over an opened ledger
    pub fn new(ledger: Ledger, metrics: Metrics) -> Self {
        metrics.set_ledger_entries(ledger.len());
        Self { ledger, metrics }
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Execute one request
    pub fn execute(&mut self, request: Request) -> Result<Response> {
        let result = match &request.message {
            Message::Register => self.register(),
            Message::Balance { .. } => query_balance(self.ledger.entries(), &request),
            Message::Deposit { amount, .. } => self.deposit(&request, *amount),
            Message::Withdraw { amount, .. } => self.withdraw(&request, *amount),
            Message::Unknown => Err(ValidationError::UnknownCommand.into()),
        };

        observe(&self.metrics, request.message.cmd(), &result);
        result
    }

    fn register(&mut self) -> Result<Response> {
        let identity = KeyPair::generate();
        let customer_id = identity.customer_id();

        let hash = self.append(Operation::Register { customer_id })?;
        tracing::info!(customer_id = %customer_id, hash = %hash, "Customer registered");

        Ok(Response::Register {
            customer_id,
            customer_secret: CustomerSecret::new(identity.secret_base64()),
            hash,
        })
    }

    fn deposit(&mut self, request: &Request, amount: Decimal) -> Result<Response> {
        let customer_id = authenticate(self.ledger.entries(), request)?;

        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount.into());
        }
        balance(self.ledger.entries(), &customer_id)
            .checked_add(amount)
            .ok_or(ValidationError::InvalidAmount)?;

        let hash = self.append(Operation::Deposit {
            customer_id,
            amount,
        })?;

        Ok(Response::Balance {
            balance: balance(self.ledger.entries(), &customer_id),
            customer_id: Some(customer_id),
            hash: Some(hash),
        })
    }

    fn withdraw(&mut self, request: &Request, amount: Decimal) -> Result<Response> {
        let customer_id = authenticate(self.ledger.entries(), request)?;

        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount.into());
        }
        if balance(self.ledger.entries(), &customer_id) < amount {
            return Err(ValidationError::InsufficientFunds.into());
        }

        let hash = self.append(Operation::withdraw(customer_id, amount))?;

        Ok(Response::Balance {
            balance: balance(self.ledger.entries(), &customer_id),
            customer_id: Some(customer_id),
            hash: Some(hash),
        })
    }

    fn append(&mut self, operation: Operation) -> Result<crate::types::Digest> {
        let started = Instant::now();
        let hash = self.ledger.append(operation)?;
        self.metrics
            .record_append(started.elapsed().as_secs_f64(), self.ledger.len());
        Ok(hash)
    }
}

/// Answer a balance query from a committed snapshot
pub fn query_balance(entries: &[Entry], request: &Request) -> Result<Response> {
    let customer_id = authenticate(entries, request)?;

    Ok(Response::Balance {
        balance: balance(entries, &customer_id),
        customer_id: None,
        hash: None,
    })
}

/// Record the outcome of a request in metrics and logs
pub(crate) fn observe(metrics: &Metrics, cmd: &str, result: &Result<Response>) {
    metrics.record_request(cmd);

    if let Err(e) = result {
        metrics.record_rejection(e.reason());
        if e.is_rejection() {
            tracing::warn!(cmd, reason = e.reason(), "Request rejected");
        } else {
            tracing::error!(cmd, error = %e, "Request failed");
        }
    }
}
