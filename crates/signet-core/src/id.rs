// Entity id generation.
//
// Ids travel through browsers (auth request ids, codes) so they must be
// unguessable: 32 characters over the nanoid URL alphabet is ~190 bits of
// entropy.

/// Length of every generated entity id.
pub const ID_LENGTH: usize = 32;

/// Generate an unpredictable, URL-safe entity id.
pub fn new_id() -> String {
    nanoid::nanoid!(ID_LENGTH)
}

/// Generate a refresh-token secret. Same alphabet, longer to keep the
/// rotating half of the opaque value independent of the id half.
pub fn new_secret() -> String {
    nanoid::nanoid!(48)
}
