//! Stored procedures.

use std::any::Any;

use dbmap_core::{Driver, Result};

use crate::Session;

impl<D: Driver> Session<D> {
    /// Create procedure `P` with `body` as its statements.
    #[tracing::instrument(level = "debug", skip(self, body), fields(procedure = std::any::type_name::<P>()))]
    pub fn create_procedure<P: Any>(&mut self, body: &str) -> Result<u64> {
        let db = self.db.clone();
        let procedure = db.mapper().procedure::<P>()?;
        let query = db.dialect().create_procedure(procedure, body)?;
        self.run_update(&query)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(procedure = std::any::type_name::<P>()))]
    pub fn drop_procedure<P: Any>(&mut self) -> Result<u64> {
        let db = self.db.clone();
        let procedure = db.mapper().procedure::<P>()?;
        let query = db.dialect().drop_procedure(procedure)?;
        self.run_update(&query)
    }

    /// Call `P` with the values in `args` and decode its result set as `OUT`.
    #[tracing::instrument(level = "debug", skip(self, args), fields(procedure = std::any::type_name::<P>()))]
    pub fn call<P: Any, OUT: Any>(&mut self, args: &P) -> Result<Vec<OUT>> {
        let db = self.db.clone();
        let procedure = db.mapper().procedure::<P>()?;
        let query = db.dialect().call_procedure(procedure, args)?;
        let rows = self.run_query(&query)?;
        rows.iter().map(|row| db.mapper().decode::<OUT>(row)).collect()
    }

    /// Call `P` for its side effects only.
    #[tracing::instrument(level = "debug", skip(self, args), fields(procedure = std::any::type_name::<P>()))]
    pub fn call_void<P: Any>(&mut self, args: &P) -> Result<()> {
        let db = self.db.clone();
        let procedure = db.mapper().procedure::<P>()?;
        let query = db.dialect().call_procedure(procedure, args)?;
        self.run_update(&query).map(|_| ())
    }
}
