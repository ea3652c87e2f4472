//! Transaction scopes and savepoints.
//!
//! [`Session::transaction`] begins a transaction, hands the body a
//! [`Transaction`] (which dereferences to the session, so every executor
//! operation is available on it) and commits when the body succeeds. Any
//! failure, including a failed commit, rolls back and comes back as
//! [`Error::Transaction`] with the original cause. A rollback failure is
//! recorded next to the cause and never replaces it.
//!
//! Savepoints are ordered: rolling back to one discards everything after it,
//! including later savepoints. None of the savepoint operations end the
//! transaction.

use std::ops::{Deref, DerefMut};

use dbmap_core::{Driver, Error, IsolationLevel, Result, Savepoint};

use crate::Session;

/// An open transaction on a session.
pub struct Transaction<'s, D: Driver> {
    session: &'s mut Session<D>,
    isolation: Option<IsolationLevel>,
    savepoints: u32,
}

impl<D: Driver> Transaction<'_, D> {
    /// Isolation the transaction was begun with, if one was requested.
    pub fn isolation(&self) -> Option<IsolationLevel> {
        self.isolation
    }

    /// Set a new savepoint.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn mark(&mut self) -> Result<Savepoint> {
        self.savepoints += 1;
        let savepoint = Savepoint::new(format!("dbmap_sp_{}", self.savepoints));
        self.session
            .driver
            .savepoint(&savepoint)
            .map_err(|e| Error::driver(format!("SAVEPOINT {}", savepoint.name()), Vec::new(), e))?;
        tracing::debug!(savepoint = savepoint.name(), "Savepoint set");
        Ok(savepoint)
    }

    /// Discard everything done after `savepoint`.
    #[tracing::instrument(level = "debug", skip(self), fields(savepoint = savepoint.name()))]
    pub fn rollback_to(&mut self, savepoint: &Savepoint) -> Result<()> {
        self.session.driver.rollback_to(savepoint).map_err(|e| {
            Error::driver(
                format!("ROLLBACK TO SAVEPOINT {}", savepoint.name()),
                Vec::new(),
                e,
            )
        })?;
        tracing::debug!("Rolled back to savepoint");
        Ok(())
    }

    /// Discard everything done in this transaction and keep it open.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback_all(&mut self) -> Result<()> {
        let driver = &mut self.session.driver;
        driver
            .rollback()
            .map_err(|e| Error::driver("ROLLBACK", Vec::new(), e))?;
        driver
            .begin(self.isolation)
            .map_err(|e| Error::driver("BEGIN", Vec::new(), e))?;
        self.savepoints = 0;
        tracing::debug!("Rolled back transaction, still open");
        Ok(())
    }
}

impl<D: Driver> Deref for Transaction<'_, D> {
    type Target = Session<D>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<D: Driver> DerefMut for Transaction<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<D: Driver> Session<D> {
    /// Run `body` in a transaction with the configured isolation.
    pub fn transaction<R, F>(&mut self, body: F) -> Result<R>
    where
        F: FnOnce(&mut Transaction<'_, D>) -> Result<R>,
    {
        let isolation = self.config.isolation;
        self.run_transaction(isolation, body)
    }

    /// Run `body` in a transaction with `isolation`.
    pub fn transaction_with<R, F>(&mut self, isolation: IsolationLevel, body: F) -> Result<R>
    where
        F: FnOnce(&mut Transaction<'_, D>) -> Result<R>,
    {
        self.run_transaction(Some(isolation), body)
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    fn run_transaction<R, F>(&mut self, isolation: Option<IsolationLevel>, body: F) -> Result<R>
    where
        F: FnOnce(&mut Transaction<'_, D>) -> Result<R>,
    {
        if self.in_transaction {
            return Err(Error::Unsupported {
                dialect: self.db.dialect().name(),
                operation: "nested transactions",
            });
        }
        self.driver
            .begin(isolation)
            .map_err(|e| Error::driver("BEGIN", Vec::new(), e))?;
        self.in_transaction = true;
        tracing::info!(isolation = ?isolation, "Transaction started");

        let mut tx = Transaction {
            session: self,
            isolation,
            savepoints: 0,
        };
        let outcome = match body(&mut tx) {
            Ok(value) => self
                .driver
                .commit()
                .map(|()| value)
                .map_err(|e| Error::driver("COMMIT", Vec::new(), e)),
            Err(err) => Err(err),
        };
        self.in_transaction = false;

        match outcome {
            Ok(value) => {
                tracing::info!("Transaction committed");
                Ok(value)
            }
            Err(cause) => {
                let rollback_failure = match self.driver.rollback() {
                    Ok(()) => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "Rollback failed");
                        Some(err.to_string())
                    }
                };
                tracing::info!(error = %cause, "Transaction rolled back");
                Err(Error::Transaction {
                    source: Box::new(cause),
                    rollback_failure,
                })
            }
        }
    }
}
