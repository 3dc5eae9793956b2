// Route handlers, one module per endpoint family.

pub mod approval;
pub mod assets;
pub mod authorization;
pub mod callback;
pub mod discovery;
pub mod health;
pub mod templates;
pub mod token;
