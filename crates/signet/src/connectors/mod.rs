// Built-in connectors.
//
// `local` authenticates against bcrypt hashes in storage; the mock
// connectors stand in for remote upstreams in tests and demos. Real
// upstream connectors (LDAP, SAML, OIDC, ...) live outside this crate and
// plug in through the same capability traits.

pub mod local;
pub mod mock;
