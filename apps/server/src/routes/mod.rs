//! HTTP handlers. Each one translates a request into a ledger call and the
//! result back into JSON; no business rules live here.

pub mod health;
pub mod history;
pub mod items;
pub mod loans;
pub mod ws;
