mod bet;
mod codec;
mod constants;
mod decryption;
mod handle;
mod round;

pub use bet::*;
pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use decryption::*;
pub use handle::*;
pub use round::*;
